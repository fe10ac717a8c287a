//! Simulation errors and cloudlet failure reasons.

use serde::Serialize;
use thiserror::Error;

use crate::core::common::{Resource, VmKey};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Host lacks some resource to place the VM.
    #[error("host #{host_id} can't place {vm}: not enough {resource}")]
    InsufficientCapacity { host_id: u32, vm: VmKey, resource: Resource },
    /// Allocation policy found no host able to place the VM.
    #[error("no suitable host for {vm}")]
    NoSuitableHost { vm: VmKey },
    #[error("{vm} is not found")]
    VmNotFound { vm: VmKey },
    /// Simulation stopped without completing the submitted work.
    #[error("no progress at time {time:.3} after {events} events: {reason}")]
    NoProgress { time: f64, events: u64, reason: String },
    #[error("invalid config: {0}")]
    Config(String),
}

/// Reason of cloudlet failure reported back to its broker.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub enum FailReason {
    /// Cloudlet was submitted to a VM which does not exist in the datacenter.
    VmNotFound { vm_id: Option<u32> },
    /// VM was destroyed while the cloudlet was resident on it.
    VmDestroyed { vm_id: u32 },
    /// Cloudlet requires more PEs than its VM has.
    NotEnoughPes { requested: u32, available: u32 },
}
