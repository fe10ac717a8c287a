//! Physical host.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::common::{Allocation, Resource, VmKey};
use crate::core::error::SimulationError;
use crate::core::provisioner::{Pe, ResourceProvisioner};
use crate::core::vm_scheduler::VmScheduler;

/// Physical machine with a fixed set of PEs, memory, bandwidth and storage.
///
/// Resources are reserved for a VM only through [`allocate_vm`](Host::allocate_vm) and released only through
/// [`deallocate_vm`](Host::deallocate_vm), so the reserved amounts never exceed host capacities.
pub struct Host {
    id: u32,
    vm_scheduler: Box<dyn VmScheduler>,
    ram: ResourceProvisioner,
    bw: ResourceProvisioner,
    storage: ResourceProvisioner,
    vms: BTreeSet<VmKey>,
}

impl Host {
    pub fn new(id: u32, ram: u64, bw: u64, storage: u64, vm_scheduler: Box<dyn VmScheduler>) -> Self {
        Self {
            id,
            vm_scheduler,
            ram: ResourceProvisioner::new(ram),
            bw: ResourceProvisioner::new(bw),
            storage: ResourceProvisioner::new(storage),
            vms: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn pes(&self) -> &[Pe] {
        self.vm_scheduler.pes()
    }

    pub fn total_mips(&self) -> f64 {
        self.pes().iter().map(|pe| pe.mips()).sum()
    }

    /// MIPS not requested by resident VMs.
    pub fn available_mips(&self) -> f64 {
        self.pes().iter().map(|pe| pe.provisioner().available_mips()).sum()
    }

    /// MIPS actually handed out to resident VMs.
    pub fn allocated_mips(&self) -> f64 {
        self.vm_shares().values().flatten().sum()
    }

    pub fn ram(&self) -> &ResourceProvisioner {
        &self.ram
    }

    pub fn bw(&self) -> &ResourceProvisioner {
        &self.bw
    }

    pub fn storage(&self) -> &ResourceProvisioner {
        &self.storage
    }

    pub fn vms(&self) -> &BTreeSet<VmKey> {
        &self.vms
    }

    pub fn is_suitable_for_vm(&self, alloc: &Allocation) -> Result<(), SimulationError> {
        self.check_resources(alloc)
            .and_then(|_| self.vm_scheduler.is_suitable(alloc))
            .map_err(|resource| self.insufficient(alloc, resource))
    }

    /// Places the VM on this host reserving all requested resources.
    /// On failure nothing is reserved. Placing an already resident VM does nothing.
    pub fn allocate_vm(&mut self, alloc: &Allocation) -> Result<(), SimulationError> {
        if self.vms.contains(&alloc.vm) {
            return Ok(());
        }
        self.check_resources(alloc)
            .and_then(|_| self.vm_scheduler.allocate_pes_for_vm(alloc))
            .map_err(|resource| self.insufficient(alloc, resource))?;
        self.ram.allocate(alloc.vm, alloc.ram);
        self.bw.allocate(alloc.vm, alloc.bw);
        self.storage.allocate(alloc.vm, alloc.size);
        self.vms.insert(alloc.vm);
        Ok(())
    }

    /// Releases all resources of the VM. Returns false if the VM was not resident.
    pub fn deallocate_vm(&mut self, vm: VmKey) -> bool {
        if !self.vms.remove(&vm) {
            return false;
        }
        self.vm_scheduler.deallocate_pes_for_vm(vm);
        self.ram.deallocate(vm);
        self.bw.deallocate(vm);
        self.storage.deallocate(vm);
        true
    }

    /// Returns current MIPS share of each virtual PE for every resident VM.
    pub fn vm_shares(&self) -> BTreeMap<VmKey, Vec<f64>> {
        self.vm_scheduler.vm_shares()
    }

    fn check_resources(&self, alloc: &Allocation) -> Result<(), Resource> {
        if !self.ram.is_suitable(alloc.vm, alloc.ram) {
            Err(Resource::Ram)
        } else if !self.bw.is_suitable(alloc.vm, alloc.bw) {
            Err(Resource::Bw)
        } else if !self.storage.is_suitable(alloc.vm, alloc.size) {
            Err(Resource::Storage)
        } else {
            Ok(())
        }
    }

    fn insufficient(&self, alloc: &Allocation, resource: Resource) -> SimulationError {
        SimulationError::InsufficientCapacity {
            host_id: self.id,
            vm: alloc.vm,
            resource,
        }
    }
}
