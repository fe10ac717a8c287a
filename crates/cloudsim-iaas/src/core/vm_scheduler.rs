//! Division of host PEs among resident VMs.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, Resource, VmKey};
use crate::core::provisioner::Pe;

/// Trait for implementation of VM schedulers.
///
/// A VM scheduler owns the physical PEs of a host, maps virtual PEs of resident VMs onto them
/// and computes the MIPS share each virtual PE currently receives.
pub trait VmScheduler {
    fn pes(&self) -> &[Pe];

    /// Checks whether virtual PEs of the VM can be mapped, returns the exhausted resource otherwise.
    fn is_suitable(&self, alloc: &Allocation) -> Result<(), Resource>;

    /// Maps virtual PEs of the VM onto physical PEs. Leaves the state unchanged on failure.
    fn allocate_pes_for_vm(&mut self, alloc: &Allocation) -> Result<(), Resource>;

    /// Removes virtual PEs of the VM, returns false if the VM had none.
    fn deallocate_pes_for_vm(&mut self, vm: VmKey) -> bool;

    /// Returns current MIPS share of each virtual PE for every resident VM.
    fn vm_shares(&self) -> BTreeMap<VmKey, Vec<f64>>;
}

/// Time-shared VM scheduler: every physical PE is shared among the virtual PEs mapped onto it
/// using max-min fairness.
///
/// Without oversubscription a virtual PE is mapped only onto a PE with enough unrequested MIPS,
/// so each VM receives exactly the requested MIPS. With oversubscription a virtual PE is mapped onto
/// the least requested PE and contending VMs receive proportionally reduced shares.
#[derive(Clone, Debug)]
pub struct TimeSharedVmScheduler {
    pes: Vec<Pe>,
    allow_oversubscription: bool,
}

impl TimeSharedVmScheduler {
    pub fn new(pes: Vec<Pe>) -> Self {
        Self {
            pes,
            allow_oversubscription: false,
        }
    }

    pub fn with_oversubscription(pes: Vec<Pe>) -> Self {
        Self {
            pes,
            allow_oversubscription: true,
        }
    }

    /// Selects a physical PE for each virtual PE of the VM without modifying the state.
    fn plan_mapping(&self, alloc: &Allocation) -> Result<Vec<usize>, Resource> {
        if alloc.pes as usize > self.pes.len() || alloc.pes == 0 {
            return Err(Resource::Pes);
        }
        if self.pes.iter().all(|pe| pe.mips() < alloc.mips) {
            return Err(Resource::Mips);
        }
        let mut planned = self
            .pes
            .iter()
            .map(|pe| pe.provisioner().requested_mips())
            .collect::<Vec<_>>();
        let mut used = vec![false; self.pes.len()];
        let mut mapping = Vec::with_capacity(alloc.pes as usize);
        for _ in 0..alloc.pes {
            let candidate = if self.allow_oversubscription {
                // least requested PE, preferring PEs without vPEs of this VM
                (0..self.pes.len())
                    .filter(|&idx| self.pes[idx].mips() >= alloc.mips)
                    .min_by(|&a, &b| {
                        used[a]
                            .cmp(&used[b])
                            .then((planned[a] / self.pes[a].mips()).total_cmp(&(planned[b] / self.pes[b].mips())))
                            .then(a.cmp(&b))
                    })
            } else {
                let fits = |idx: &usize| self.pes[*idx].mips() - planned[*idx] >= alloc.mips - cloudsim_core::EPSILON;
                (0..self.pes.len())
                    .filter(|idx| !used[*idx])
                    .find(fits)
                    .or_else(|| (0..self.pes.len()).find(fits))
            };
            let idx = candidate.ok_or(Resource::Mips)?;
            planned[idx] += alloc.mips;
            used[idx] = true;
            mapping.push(idx);
        }
        Ok(mapping)
    }
}

impl VmScheduler for TimeSharedVmScheduler {
    fn pes(&self) -> &[Pe] {
        &self.pes
    }

    fn is_suitable(&self, alloc: &Allocation) -> Result<(), Resource> {
        self.plan_mapping(alloc).map(|_| ())
    }

    fn allocate_pes_for_vm(&mut self, alloc: &Allocation) -> Result<(), Resource> {
        let mapping = self.plan_mapping(alloc)?;
        for idx in mapping {
            self.pes[idx].provisioner_mut().add_vpe(alloc.vm, alloc.mips);
        }
        Ok(())
    }

    fn deallocate_pes_for_vm(&mut self, vm: VmKey) -> bool {
        let mut removed = 0;
        for pe in self.pes.iter_mut() {
            removed += pe.provisioner_mut().remove_vm(vm);
        }
        removed > 0
    }

    fn vm_shares(&self) -> BTreeMap<VmKey, Vec<f64>> {
        let mut result: BTreeMap<VmKey, Vec<f64>> = BTreeMap::new();
        for pe in &self.pes {
            for (vm, shares) in pe.provisioner().shares() {
                result.entry(vm).or_default().extend(shares);
            }
        }
        result
    }
}
