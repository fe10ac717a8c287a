use std::fmt::{Display, Formatter};

use serde::Serialize;

use cloudsim_core::component::Id;

/// Identifies a VM inside a datacenter.
///
/// VM ids are chosen by brokers, so they are unique only among the VMs of a single broker.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VmKey {
    pub owner: Id,
    pub vm_id: u32,
}

impl VmKey {
    pub fn new(owner: Id, vm_id: u32) -> Self {
        Self { owner, vm_id }
    }
}

impl Display for VmKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "vm #{} of broker {}", self.vm_id, self.owner)
    }
}

/// Resources requested by a VM, as seen by hosts and allocation policies.
#[derive(Serialize, Clone, Debug)]
pub struct Allocation {
    pub vm: VmKey,
    /// Requested MIPS per virtual PE.
    pub mips: f64,
    pub pes: u32,
    pub ram: u64,
    pub bw: u64,
    pub size: u64,
}

impl Allocation {
    pub fn total_mips(&self) -> f64 {
        self.mips * self.pes as f64
    }
}

/// Host resource kinds which can be exhausted by a VM request.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Pes,
    Mips,
    Ram,
    Bw,
    Storage,
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            Resource::Pes => "pes",
            Resource::Mips => "mips",
            Resource::Ram => "ram",
            Resource::Bw => "bw",
            Resource::Storage => "storage",
        };
        write!(f, "{}", name)
    }
}
