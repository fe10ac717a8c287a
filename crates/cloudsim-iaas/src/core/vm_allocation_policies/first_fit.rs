use crate::core::common::{Allocation, VmKey};
use crate::core::error::SimulationError;
use crate::core::host::Host;
use crate::core::vm_allocation_policy::{PlacementTable, VmAllocationPolicy};

/// FirstFit policy, which places VM on the first host accepting it.
#[derive(Default)]
pub struct FirstFit {
    placements: PlacementTable,
}

impl FirstFit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VmAllocationPolicy for FirstFit {
    fn allocate_host_for_vm(&mut self, alloc: &Allocation, hosts: &mut [Host]) -> Result<u32, SimulationError> {
        let order = 0..hosts.len();
        self.placements.place(alloc, hosts, order)
    }

    fn deallocate_host_for_vm(&mut self, vm: VmKey, hosts: &mut [Host]) -> Option<u32> {
        self.placements.release(vm, hosts)
    }

    fn get_host(&self, vm: VmKey) -> Option<u32> {
        self.placements.get(vm)
    }
}
