//! Accounting of host resources reserved by resident VMs.

use std::collections::BTreeMap;

use serde::Serialize;

use cloudsim_core::EPSILON;

use crate::core::common::VmKey;

/// Tracks reservations of a scalar host resource (memory, bandwidth or storage) by resident VMs.
#[derive(Serialize, Clone, Debug)]
pub struct ResourceProvisioner {
    capacity: u64,
    allocated: u64,
    allocations: BTreeMap<VmKey, u64>,
}

impl ResourceProvisioner {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            allocated: 0,
            allocations: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn available(&self) -> u64 {
        self.capacity - self.allocated
    }

    pub fn allocated_for(&self, vm: VmKey) -> u64 {
        self.allocations.get(&vm).copied().unwrap_or(0)
    }

    /// Checks whether `amount` can be reserved for the VM, taking its current reservation into account.
    pub fn is_suitable(&self, vm: VmKey, amount: u64) -> bool {
        amount <= self.available() + self.allocated_for(vm)
    }

    /// Reserves `amount` for the VM replacing its previous reservation.
    /// Leaves the state unchanged and returns false if capacity is insufficient.
    pub fn allocate(&mut self, vm: VmKey, amount: u64) -> bool {
        if !self.is_suitable(vm, amount) {
            return false;
        }
        self.deallocate(vm);
        self.allocated += amount;
        self.allocations.insert(vm, amount);
        true
    }

    /// Releases the VM reservation and returns the released amount (zero if VM had none).
    pub fn deallocate(&mut self, vm: VmKey) -> u64 {
        let amount = self.allocations.remove(&vm).unwrap_or(0);
        self.allocated -= amount;
        amount
    }
}

/// Status of a physical processing element.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeStatus {
    Free,
    Busy,
}

/// Tracks virtual PEs of resident VMs mapped onto a single physical PE.
#[derive(Serialize, Clone, Debug)]
pub struct PeProvisioner {
    mips: f64,
    vpes: BTreeMap<VmKey, Vec<f64>>,
}

impl PeProvisioner {
    pub fn new(mips: f64) -> Self {
        Self {
            mips,
            vpes: BTreeMap::new(),
        }
    }

    pub fn mips(&self) -> f64 {
        self.mips
    }

    /// Sum of MIPS requested by all virtual PEs mapped onto this PE, may exceed capacity if oversubscribed.
    pub fn requested_mips(&self) -> f64 {
        self.vpes.values().flatten().sum()
    }

    pub fn available_mips(&self) -> f64 {
        (self.mips - self.requested_mips()).max(0.)
    }

    pub fn can_fit(&self, mips: f64) -> bool {
        mips <= self.available_mips() + EPSILON
    }

    pub fn vpe_count(&self) -> usize {
        self.vpes.values().map(|v| v.len()).sum()
    }

    pub fn hosts_vm(&self, vm: VmKey) -> bool {
        self.vpes.contains_key(&vm)
    }

    pub fn add_vpe(&mut self, vm: VmKey, mips: f64) {
        self.vpes.entry(vm).or_default().push(mips);
    }

    /// Removes all virtual PEs of the VM, returns the number of removed virtual PEs.
    pub fn remove_vm(&mut self, vm: VmKey) -> usize {
        self.vpes.remove(&vm).map(|v| v.len()).unwrap_or(0)
    }

    /// Divides PE capacity among mapped virtual PEs using max-min fairness:
    /// each virtual PE gets at most its request, and capacity left by small requests
    /// is shared equally among the larger ones.
    pub fn shares(&self) -> BTreeMap<VmKey, Vec<f64>> {
        let mut demands = self
            .vpes
            .iter()
            .flat_map(|(vm, requests)| requests.iter().enumerate().map(move |(idx, mips)| (*mips, *vm, idx)))
            .collect::<Vec<_>>();
        demands.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut result = self
            .vpes
            .iter()
            .map(|(vm, requests)| (*vm, vec![0.; requests.len()]))
            .collect::<BTreeMap<_, _>>();
        let mut remaining = self.mips;
        let mut left = demands.len();
        for (mips, vm, idx) in demands {
            let share = mips.min(remaining / left as f64);
            if let Some(shares) = result.get_mut(&vm) {
                shares[idx] = share;
            }
            remaining -= share;
            left -= 1;
        }
        result
    }
}

/// Physical processing element of a host.
#[derive(Serialize, Clone, Debug)]
pub struct Pe {
    pub id: u32,
    provisioner: PeProvisioner,
}

impl Pe {
    pub fn new(id: u32, mips: f64) -> Self {
        Self {
            id,
            provisioner: PeProvisioner::new(mips),
        }
    }

    pub fn mips(&self) -> f64 {
        self.provisioner.mips()
    }

    pub fn status(&self) -> PeStatus {
        if self.provisioner.vpe_count() > 0 {
            PeStatus::Busy
        } else {
            PeStatus::Free
        }
    }

    pub fn provisioner(&self) -> &PeProvisioner {
        &self.provisioner
    }

    pub fn provisioner_mut(&mut self) -> &mut PeProvisioner {
        &mut self.provisioner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(id: u32) -> VmKey {
        VmKey::new(0, id)
    }

    #[test]
    fn test_resource_provisioner() {
        let mut ram = ResourceProvisioner::new(2048);
        assert!(ram.allocate(vm(0), 512));
        assert!(ram.allocate(vm(1), 1536));
        assert!(!ram.allocate(vm(2), 1));
        assert_eq!(ram.available(), 0);
        // replacing own reservation accounts for the released amount
        assert!(ram.allocate(vm(0), 256));
        assert_eq!(ram.allocated(), 1792);
        assert_eq!(ram.deallocate(vm(1)), 1536);
        assert_eq!(ram.deallocate(vm(1)), 0);
        assert_eq!(ram.allocated(), 256);
    }

    #[test]
    fn test_shares_within_capacity() {
        let mut pe = PeProvisioner::new(1000.);
        pe.add_vpe(vm(0), 300.);
        pe.add_vpe(vm(1), 500.);
        let shares = pe.shares();
        assert_eq!(shares[&vm(0)], vec![300.]);
        assert_eq!(shares[&vm(1)], vec![500.]);
        assert_eq!(pe.available_mips(), 200.);
    }

    #[test]
    fn test_shares_oversubscribed() {
        let mut pe = PeProvisioner::new(1000.);
        pe.add_vpe(vm(0), 200.);
        pe.add_vpe(vm(1), 1000.);
        pe.add_vpe(vm(2), 1000.);
        let shares = pe.shares();
        assert_eq!(shares[&vm(0)], vec![200.]);
        assert_eq!(shares[&vm(1)], vec![400.]);
        assert_eq!(shares[&vm(2)], vec![400.]);
        assert_eq!(pe.available_mips(), 0.);
        assert_eq!(pe.remove_vm(vm(1)), 1);
        assert_eq!(pe.shares()[&vm(2)], vec![800.]);
    }
}
