//! VM allocation policies.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, VmKey};
use crate::core::config::options::parse_config_value;
use crate::core::error::SimulationError;
use crate::core::host::Host;
use crate::core::vm_allocation_policies::best_fit::BestFit;
use crate::core::vm_allocation_policies::first_fit::FirstFit;
use crate::core::vm_allocation_policies::worst_fit::WorstFit;

/// Trait for implementation of VM allocation policies.
///
/// The policy selects a host for each VM creation request of a datacenter and remembers the placement,
/// so that the VM can be released later. Hosts are tried in the order defined by the policy,
/// and a host rejecting the VM does not stop the search.
pub trait VmAllocationPolicy {
    /// Places the VM on some host and returns its id.
    fn allocate_host_for_vm(&mut self, alloc: &Allocation, hosts: &mut [Host]) -> Result<u32, SimulationError>;

    /// Releases the VM from its host, returns the host id or `None` if the VM is not placed.
    fn deallocate_host_for_vm(&mut self, vm: VmKey, hosts: &mut [Host]) -> Option<u32>;

    fn get_host(&self, vm: VmKey) -> Option<u32>;
}

/// Placement records shared by policy implementations.
#[derive(Default)]
pub struct PlacementTable {
    vm_hosts: BTreeMap<VmKey, u32>,
}

impl PlacementTable {
    /// Tries hosts in the given order and records the first successful placement.
    pub fn place<I>(&mut self, alloc: &Allocation, hosts: &mut [Host], order: I) -> Result<u32, SimulationError>
    where
        I: IntoIterator<Item = usize>,
    {
        if let Some(host_id) = self.vm_hosts.get(&alloc.vm) {
            return Ok(*host_id);
        }
        for idx in order {
            let host = &mut hosts[idx];
            if host.allocate_vm(alloc).is_ok() {
                self.vm_hosts.insert(alloc.vm, host.id());
                return Ok(host.id());
            }
        }
        Err(SimulationError::NoSuitableHost { vm: alloc.vm })
    }

    pub fn release(&mut self, vm: VmKey, hosts: &mut [Host]) -> Option<u32> {
        let host_id = self.vm_hosts.remove(&vm)?;
        if let Some(host) = hosts.iter_mut().find(|host| host.id() == host_id) {
            host.deallocate_vm(vm);
        }
        Some(host_id)
    }

    pub fn get(&self, vm: VmKey) -> Option<u32> {
        self.vm_hosts.get(&vm).copied()
    }
}

/// Returns indices of hosts able to place the VM, sorted by the key and then by host position.
pub(crate) fn suitable_hosts_by<F>(alloc: &Allocation, hosts: &[Host], key: F) -> Vec<usize>
where
    F: Fn(&Host) -> f64,
{
    let mut candidates = hosts
        .iter()
        .enumerate()
        .filter(|(_, host)| host.is_suitable_for_vm(alloc).is_ok())
        .map(|(idx, host)| (key(host), idx))
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    candidates.into_iter().map(|(_, idx)| idx).collect()
}

/// Creates allocation policy from a config string: `FirstFit`, `BestFit` or `WorstFit`.
pub fn vm_allocation_policy_resolver(config_str: &str) -> Result<Box<dyn VmAllocationPolicy>, SimulationError> {
    let (policy_name, _) = parse_config_value(config_str);
    match policy_name.as_str() {
        "FirstFit" | "Simple" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        _ => Err(SimulationError::Config(format!(
            "unknown VM allocation policy: {}",
            config_str
        ))),
    }
}
