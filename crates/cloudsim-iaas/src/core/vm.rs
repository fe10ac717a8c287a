//! Virtual machine.

use serde::Serialize;

use cloudsim_core::component::Id;

use crate::core::cloudlet_scheduler::CloudletScheduler;
use crate::core::common::{Allocation, VmKey};

/// Virtual machine requested by a broker and hosted by a datacenter.
///
/// The VM receives a MIPS share from its host and passes it to its cloudlet scheduler.
#[derive(Serialize, Clone)]
pub struct Vm {
    pub id: u32,
    /// Broker which owns the VM, set on submission to the broker.
    pub owner: Id,
    /// Requested MIPS per virtual PE.
    pub mips: f64,
    pub pes: u32,
    pub ram: u64,
    pub bw: u64,
    /// Image size, reserved on host storage.
    pub size: u64,
    pub vmm: String,
    host_id: Option<u32>,
    mips_share: Vec<f64>,
    #[serde(skip_serializing)]
    cloudlet_scheduler: Box<dyn CloudletScheduler>,
}

impl Vm {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        mips: f64,
        pes: u32,
        ram: u64,
        bw: u64,
        size: u64,
        vmm: &str,
        cloudlet_scheduler: Box<dyn CloudletScheduler>,
    ) -> Self {
        Self {
            id,
            owner: 0,
            mips,
            pes,
            ram,
            bw,
            size,
            vmm: vmm.to_string(),
            host_id: None,
            mips_share: Vec::new(),
            cloudlet_scheduler,
        }
    }

    pub fn key(&self) -> VmKey {
        VmKey::new(self.owner, self.id)
    }

    pub fn allocation(&self) -> Allocation {
        Allocation {
            vm: self.key(),
            mips: self.mips,
            pes: self.pes,
            ram: self.ram,
            bw: self.bw,
            size: self.size,
        }
    }

    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    pub(crate) fn set_host_id(&mut self, host_id: Option<u32>) {
        self.host_id = host_id;
    }

    /// MIPS share of each virtual PE as given by the host.
    pub fn mips_share(&self) -> &[f64] {
        &self.mips_share
    }

    pub(crate) fn set_mips_share(&mut self, mips_share: Vec<f64>) {
        self.mips_share = mips_share;
    }

    pub fn total_requested_mips(&self) -> f64 {
        self.mips * self.pes as f64
    }

    pub fn current_allocated_mips(&self) -> f64 {
        self.mips_share.iter().sum()
    }

    pub fn cloudlet_scheduler(&self) -> &dyn CloudletScheduler {
        self.cloudlet_scheduler.as_ref()
    }

    pub fn cloudlet_scheduler_mut(&mut self) -> &mut dyn CloudletScheduler {
        self.cloudlet_scheduler.as_mut()
    }

    /// Advances resident cloudlets up to `time` and applies the current MIPS share.
    /// Returns the estimated completion time of the next cloudlet.
    pub(crate) fn update_processing(&mut self, time: f64) -> Option<f64> {
        self.cloudlet_scheduler.update_processing(time, &self.mips_share)
    }

    /// Whether some running cloudlet may change its rate without any event, which happens
    /// when its CPU utilization depends on time.
    pub fn has_variable_load(&self) -> bool {
        self.current_allocated_mips() > 0. && self.cloudlet_scheduler.has_variable_load()
    }
}
