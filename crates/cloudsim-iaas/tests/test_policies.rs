use cloudsim_core::simulation::Simulation;

use cloudsim_iaas::core::cloudlet::{Cloudlet, CloudletStatus};
use cloudsim_iaas::core::cloudlet_scheduler::cloudlet_scheduler_resolver;
use cloudsim_iaas::core::cloudlet_schedulers::space_shared::SpaceSharedCloudletScheduler;
use cloudsim_iaas::core::characteristics::DatacenterCharacteristics;
use cloudsim_iaas::core::common::{Allocation, Resource, VmKey};
use cloudsim_iaas::core::config::sim_config::SimulationConfig;
use cloudsim_iaas::core::error::SimulationError;
use cloudsim_iaas::core::host::Host;
use cloudsim_iaas::core::provisioner::{Pe, PeStatus};
use cloudsim_iaas::core::utilization_model::{utilization_model_resolver, StochasticUtilizationModel, UtilizationModel};
use cloudsim_iaas::core::vm::Vm;
use cloudsim_iaas::core::vm_allocation_policies::best_fit::BestFit;
use cloudsim_iaas::core::vm_allocation_policies::first_fit::FirstFit;
use cloudsim_iaas::core::vm_allocation_policies::worst_fit::WorstFit;
use cloudsim_iaas::core::vm_allocation_policy::{vm_allocation_policy_resolver, VmAllocationPolicy};
use cloudsim_iaas::core::vm_scheduler::TimeSharedVmScheduler;
use cloudsim_iaas::simulation::CloudSimulation;

fn make_host(id: u32, pe_mips: f64, ram: u64) -> Host {
    Host::new(
        id,
        ram,
        10000,
        1000000,
        Box::new(TimeSharedVmScheduler::new(vec![Pe::new(0, pe_mips)])),
    )
}

fn make_alloc(vm_id: u32, mips: f64, ram: u64) -> Allocation {
    Allocation {
        vm: VmKey::new(0, vm_id),
        mips,
        pes: 1,
        ram,
        bw: 1000,
        size: 10000,
    }
}

/// Hosts with 2000, 1000 and 3000 MIPS.
fn make_hosts() -> Vec<Host> {
    vec![
        make_host(0, 2000., 2048),
        make_host(1, 1000., 2048),
        make_host(2, 3000., 2048),
    ]
}

#[test]
// First fit selects the first host accepting the VM.
fn test_first_fit() {
    let mut hosts = make_hosts();
    let mut policy = FirstFit::new();
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(0, 500., 512), &mut hosts), Ok(0));
    assert_eq!(policy.get_host(VmKey::new(0, 0)), Some(0));
    // host 0 has 1500 MIPS left, host 1 can't fit 1600 MIPS
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(1, 1600., 512), &mut hosts), Ok(2));
}

#[test]
// First fit goes on to the next host when a host rejects the VM.
fn test_first_fit_skips_rejecting_host() {
    let mut hosts = vec![make_host(0, 2000., 256), make_host(1, 1000., 2048)];
    let mut policy = FirstFit::new();
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(0, 500., 512), &mut hosts), Ok(1));
    assert_eq!(
        hosts[0].is_suitable_for_vm(&make_alloc(0, 500., 512)),
        Err(SimulationError::InsufficientCapacity {
            host_id: 0,
            vm: VmKey::new(0, 0),
            resource: Resource::Ram,
        })
    );
}

#[test]
// Best fit selects the suitable host with the least available MIPS.
fn test_best_fit() {
    let mut hosts = make_hosts();
    let mut policy = BestFit::new();
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(0, 500., 512), &mut hosts), Ok(1));
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(1, 500., 512), &mut hosts), Ok(1));
    // host 1 is full now
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(2, 500., 512), &mut hosts), Ok(0));
}

#[test]
// Worst fit selects the suitable host with the most available MIPS.
fn test_worst_fit() {
    let mut hosts = make_hosts();
    let mut policy = WorstFit::new();
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(0, 1500., 512), &mut hosts), Ok(2));
    // host 0 now has 2000 MIPS left against 1500 on host 2
    assert_eq!(policy.allocate_host_for_vm(&make_alloc(1, 500., 512), &mut hosts), Ok(0));
}

#[test]
fn test_no_suitable_host() {
    let mut hosts = make_hosts();
    let mut policy = FirstFit::new();
    assert_eq!(
        policy.allocate_host_for_vm(&make_alloc(0, 4000., 512), &mut hosts),
        Err(SimulationError::NoSuitableHost { vm: VmKey::new(0, 0) })
    );
    assert!(hosts.iter().all(|host| host.vms().is_empty()));
}

#[test]
// Releasing a VM twice has no effect the second time.
fn test_deallocation_is_idempotent() {
    let mut hosts = make_hosts();
    let mut policy = FirstFit::new();
    let vm = VmKey::new(0, 0);
    policy.allocate_host_for_vm(&make_alloc(0, 500., 512), &mut hosts).unwrap();
    assert_eq!(hosts[0].pes()[0].status(), PeStatus::Busy);
    assert_eq!(policy.deallocate_host_for_vm(vm, &mut hosts), Some(0));
    assert_eq!(policy.deallocate_host_for_vm(vm, &mut hosts), None);
    assert!(!hosts[0].deallocate_vm(vm));
    assert_eq!(hosts[0].ram().allocated(), 0);
    assert_eq!(hosts[0].available_mips(), 2000.);
    assert_eq!(hosts[0].pes()[0].status(), PeStatus::Free);
}

#[test]
fn test_host_ram_bw_storage_reserved() {
    let mut host = make_host(0, 2000., 1024);
    host.allocate_vm(&make_alloc(0, 500., 512)).unwrap();
    // repeated placement of a resident VM changes nothing
    host.allocate_vm(&make_alloc(0, 500., 512)).unwrap();
    assert_eq!(host.ram().allocated(), 512);
    assert_eq!(host.bw().allocated(), 1000);
    assert_eq!(host.storage().allocated(), 10000);
    host.allocate_vm(&make_alloc(1, 500., 512)).unwrap();
    assert!(host.allocate_vm(&make_alloc(2, 100., 1)).is_err());
    assert_eq!(host.vms().len(), 2);
    assert_eq!(host.available_mips(), 1000.);
}

#[test]
fn test_policy_resolver() {
    assert!(vm_allocation_policy_resolver("FirstFit").is_ok());
    assert!(vm_allocation_policy_resolver("BestFit").is_ok());
    assert!(vm_allocation_policy_resolver("WorstFit").is_ok());
    assert!(vm_allocation_policy_resolver("Unknown").is_err());
    assert!(cloudlet_scheduler_resolver("SpaceShared").is_ok());
    assert!(cloudlet_scheduler_resolver("RoundRobin").is_err());
}

#[test]
// Space-shared VM runs its cloudlets one after another.
fn test_space_shared_vm() {
    let mut cloud_sim = CloudSimulation::new(Simulation::new(), SimulationConfig::default());
    let dc = cloud_sim.add_datacenter(
        "dc",
        vec![make_host(0, 1000., 2048)],
        Box::new(FirstFit::new()),
        DatacenterCharacteristics::default(),
    );
    let broker = cloud_sim.add_broker("broker", dc);
    let vm = Vm::new(0, 1000., 1, 512, 1000, 10000, "Xen", Box::new(SpaceSharedCloudletScheduler::new()));
    cloud_sim.broker(broker).borrow_mut().submit_vm_list(vec![vm]);
    cloud_sim.broker(broker).borrow_mut().submit_cloudlet_list(vec![
        Cloudlet::new(0, 40000., 1, 300, 300),
        Cloudlet::new(1, 40000., 1, 300, 300),
        Cloudlet::new(2, 1000., 2, 300, 300),
    ]);

    assert_eq!(cloud_sim.run(), Ok(()));

    let mut cloudlets = cloud_sim.broker(broker).borrow().get_cloudlet_received_list().to_vec();
    cloudlets.sort_by_key(|c| c.id);
    assert_eq!(cloudlets[0].finish_time(), Some(40.));
    assert_eq!(cloudlets[1].start_time(), Some(40.));
    assert_eq!(cloudlets[1].finish_time(), Some(80.));
    assert_eq!(cloudlets[2].status(), CloudletStatus::Failed);
}

#[test]
fn test_utilization_models() {
    let model = StochasticUtilizationModel::new(42);
    for step in 0..100 {
        let time = step as f64 * 0.7;
        let value = model.utilization(time, time);
        assert!((0. ..=1.).contains(&value));
        assert_eq!(value, model.utilization(time, 0.));
    }

    let constant = utilization_model_resolver("Constant[utilization=0.25]").unwrap();
    assert_eq!(constant.utilization(10., 10.), 0.25);
    let full = utilization_model_resolver("Full").unwrap();
    assert_eq!(full.utilization(10., 10.), 1.);
    assert!(utilization_model_resolver("Stochastic[seed=7]").is_ok());
    assert!(utilization_model_resolver("Stochastic").is_err());
    assert!(utilization_model_resolver("Sine").is_err());
}
