//! Cloud simulation facade.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use cloudsim_core::component::Id;
use cloudsim_core::context::SimulationContext;
use cloudsim_core::simulation::Simulation;

use crate::core::broker::Broker;
use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::config::sim_config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::error::SimulationError;
use crate::core::events::broker::BrokerStart;
use crate::core::host::Host;
use crate::core::provisioner::Pe;
use crate::core::vm_allocation_policy::{vm_allocation_policy_resolver, VmAllocationPolicy};
use crate::core::vm_scheduler::{TimeSharedVmScheduler, VmScheduler};
use crate::custom_component::CustomComponent;

/// Entry point of the library: creates datacenters and brokers and runs the simulation.
pub struct CloudSimulation {
    datacenters: BTreeMap<Id, Rc<RefCell<Datacenter>>>,
    brokers: BTreeMap<Id, Rc<RefCell<Broker>>>,
    components: HashMap<Id, Rc<RefCell<dyn CustomComponent>>>,
    started: bool,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    pub fn new(mut sim: Simulation, sim_config: SimulationConfig) -> Self {
        let ctx = sim.create_context("simulation");
        Self {
            datacenters: BTreeMap::new(),
            brokers: BTreeMap::new(),
            components: HashMap::new(),
            started: false,
            sim,
            ctx,
            sim_config: rc!(sim_config),
        }
    }

    pub fn add_datacenter(
        &mut self,
        name: &str,
        hosts: Vec<Host>,
        allocation_policy: Box<dyn VmAllocationPolicy>,
        characteristics: DatacenterCharacteristics,
    ) -> Id {
        let datacenter = rc!(refcell!(Datacenter::new(
            hosts,
            allocation_policy,
            characteristics,
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.datacenters.insert(id, datacenter);
        id
    }

    /// Adds datacenter with hosts and allocation policy described in simulation config.
    pub fn add_datacenter_from_config(&mut self, name: &str) -> Result<Id, SimulationError> {
        let hosts = self.hosts_from_config();
        if hosts.is_empty() {
            return Err(SimulationError::Config("no hosts are configured".to_string()));
        }
        let allocation_policy = vm_allocation_policy_resolver(&self.sim_config.allocation_policy)?;
        Ok(self.add_datacenter(name, hosts, allocation_policy, DatacenterCharacteristics::default()))
    }

    /// Builds hosts described in simulation config using time-shared VM schedulers.
    pub fn hosts_from_config(&self) -> Vec<Host> {
        let mut hosts = Vec::new();
        for host_config in &self.sim_config.hosts {
            for _ in 0..host_config.count.unwrap_or(1) {
                let host_id = hosts.len() as u32;
                let pes = (0..host_config.pes)
                    .map(|pe_id| Pe::new(pe_id, host_config.mips))
                    .collect();
                hosts.push(Host::new(
                    host_id,
                    host_config.ram,
                    host_config.bw,
                    host_config.storage,
                    self.vm_scheduler(pes),
                ));
            }
        }
        hosts
    }

    /// Creates time-shared VM scheduler which follows the oversubscription setting of simulation config.
    pub fn vm_scheduler(&self, pes: Vec<Pe>) -> Box<dyn VmScheduler> {
        if self.sim_config.allow_vm_oversubscription {
            Box::new(TimeSharedVmScheduler::with_oversubscription(pes))
        } else {
            Box::new(TimeSharedVmScheduler::new(pes))
        }
    }

    pub fn add_broker(&mut self, name: &str, datacenter_id: Id) -> Id {
        let broker = rc!(refcell!(Broker::new(
            datacenter_id,
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        if self.started {
            self.ctx.emit_now(BrokerStart {}, id);
        }
        id
    }

    pub fn build_custom_component<Component: 'static + CustomComponent>(
        &mut self,
        name: &str,
    ) -> Rc<RefCell<Component>> {
        let component = rc!(refcell!(Component::new(self.sim.create_context(name))));
        let id = self.sim.add_handler(name, component.clone());
        self.components.insert(id, component.clone());
        component
    }

    /// Starts all brokers. Called by [`run`](Self::run), may be used directly for step-by-step execution.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        for id in self.brokers.keys() {
            self.ctx.emit_now(BrokerStart {}, *id);
        }
    }

    /// Processes events until the event queue is empty.
    ///
    /// Fails with [`SimulationError::NoProgress`] if too many consecutive events are processed without
    /// progress, or if the queue is exhausted while some cloudlets are still not returned.
    /// Progress means a VM or cloudlet outcome at some broker or a clock advance while some datacenter
    /// runs cloudlets at a non-zero rate.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.start();
        let limit = self.sim_config.no_progress_event_limit;
        let mut last_progress = self.progress();
        let mut processed: u64 = 0;
        let mut without_progress: u64 = 0;
        while self.sim.step() {
            processed += 1;
            let progress = self.progress();
            if progress != last_progress {
                last_progress = progress;
                without_progress = 0;
            } else {
                without_progress += 1;
                if limit > 0 && without_progress >= limit {
                    return Err(SimulationError::NoProgress {
                        time: self.sim.time(),
                        events: processed,
                        reason: format!("{} events processed without any progress", without_progress),
                    });
                }
            }
        }
        let in_flight: usize = self.brokers.values().map(|b| b.borrow().cloudlets_in_flight()).sum();
        if in_flight > 0 {
            return Err(SimulationError::NoProgress {
                time: self.sim.time(),
                events: processed,
                reason: format!("event queue is empty while {} cloudlets are not returned", in_flight),
            });
        }
        Ok(())
    }

    fn progress(&self) -> u64 {
        let outcomes: u64 = self.brokers.values().map(|b| b.borrow().progress() as u64).sum();
        let work: u64 = self.datacenters.values().map(|dc| dc.borrow().progress()).sum();
        outcomes + work
    }

    pub fn datacenter(&self, id: Id) -> Rc<RefCell<Datacenter>> {
        self.datacenters[&id].clone()
    }

    pub fn broker(&self, id: Id) -> Rc<RefCell<Broker>> {
        self.brokers[&id].clone()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn step(&mut self) -> bool {
        self.sim.step()
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }
}
