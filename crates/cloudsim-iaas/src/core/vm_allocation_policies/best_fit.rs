use crate::core::common::{Allocation, VmKey};
use crate::core::error::SimulationError;
use crate::core::host::Host;
use crate::core::vm_allocation_policy::{suitable_hosts_by, PlacementTable, VmAllocationPolicy};

/// BestFit policy, which places VM on the suitable host with the least available MIPS.
#[derive(Default)]
pub struct BestFit {
    placements: PlacementTable,
}

impl BestFit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VmAllocationPolicy for BestFit {
    fn allocate_host_for_vm(&mut self, alloc: &Allocation, hosts: &mut [Host]) -> Result<u32, SimulationError> {
        let order = suitable_hosts_by(alloc, hosts, |host| host.available_mips());
        self.placements.place(alloc, hosts, order)
    }

    fn deallocate_host_for_vm(&mut self, vm: VmKey, hosts: &mut [Host]) -> Option<u32> {
        self.placements.release(vm, hosts)
    }

    fn get_host(&self, vm: VmKey) -> Option<u32> {
        self.placements.get(vm)
    }
}
