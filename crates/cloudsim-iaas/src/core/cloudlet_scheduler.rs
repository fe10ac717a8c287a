//! Division of VM processing capacity among resident cloudlets.

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_schedulers::space_shared::SpaceSharedCloudletScheduler;
use crate::core::cloudlet_schedulers::time_shared::TimeSharedCloudletScheduler;
use crate::core::config::options::parse_config_value;
use crate::core::error::{FailReason, SimulationError};

/// Trait for implementation of cloudlet schedulers.
///
/// The scheduler keeps the processing rate of each running cloudlet computed at the last update.
/// Each update first accounts the work done since the previous update with these rates,
/// then completes finished cloudlets and recomputes the rates for the new MIPS share.
pub trait CloudletScheduler: DynClone {
    /// Accepts a cloudlet, it becomes `Queued` and is considered at the next update.
    fn submit(&mut self, cloudlet: Cloudlet, time: f64);

    /// Updates cloudlets processing at `time` given the MIPS share of each VM PE.
    /// Returns the estimated completion time of the next cloudlet or `None` if nothing progresses.
    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64>;

    /// Removes and returns cloudlets which reached a terminal status.
    fn take_finished(&mut self) -> Vec<Cloudlet>;

    /// Cancels the cloudlet, it is returned via [`take_finished`](CloudletScheduler::take_finished).
    fn cancel(&mut self, cloudlet_id: u32, time: f64) -> bool;

    /// Pauses the cloudlet until explicit resume.
    fn pause(&mut self, cloudlet_id: u32) -> bool;

    fn resume(&mut self, cloudlet_id: u32) -> bool;

    /// Fails all resident cloudlets, they are returned via [`take_finished`](CloudletScheduler::take_finished).
    fn fail_all(&mut self, time: f64, reason: FailReason);

    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus>;

    /// Number of resident cloudlets which did not reach a terminal status.
    fn cloudlet_count(&self) -> usize;

    /// Returns `true` if a running cloudlet has non-constant CPU utilization, so its rate
    /// computed at the last update may become stale.
    fn has_variable_load(&self) -> bool;

    fn is_idle(&self) -> bool {
        self.cloudlet_count() == 0
    }
}

clone_trait_object!(CloudletScheduler);

/// Cloudlet resident on a VM together with its current processing rate in MIPS.
#[derive(Clone)]
pub(crate) struct ResidentCloudlet {
    pub cloudlet: Cloudlet,
    pub rate: f64,
}

impl ResidentCloudlet {
    pub fn new(cloudlet: Cloudlet) -> Self {
        Self { cloudlet, rate: 0. }
    }

    pub fn advance(&mut self, elapsed: f64) {
        if elapsed > 0. && self.rate > 0. {
            self.cloudlet.advance(self.rate * elapsed);
        }
    }

    /// Sets the rate from the MIPS available to each cloudlet PE scaled by CPU utilization.
    pub fn set_rate(&mut self, time: f64, mips_per_pe: f64) {
        let time_from_start = self.cloudlet.start_time().map(|start| time - start).unwrap_or(0.);
        let utilization = self.cloudlet.cpu_model.utilization(time, time_from_start).clamp(0., 1.);
        self.rate = mips_per_pe * self.cloudlet.pes as f64 * utilization;
    }

    pub fn has_variable_rate(&self) -> bool {
        !self.cloudlet.cpu_model.is_constant()
    }

    pub fn finish_time(&self, time: f64) -> Option<f64> {
        if self.rate > 0. {
            Some(time + self.cloudlet.remaining_length() / self.rate)
        } else {
            None
        }
    }
}

/// Moves finished cloudlets from `cloudlets` to `finished`, preserving order of the remaining ones.
pub(crate) fn complete_finished(cloudlets: &mut Vec<ResidentCloudlet>, finished: &mut Vec<Cloudlet>, time: f64) {
    let mut idx = 0;
    while idx < cloudlets.len() {
        if cloudlets[idx].cloudlet.is_finished() {
            let mut rc = cloudlets.remove(idx);
            if rc.cloudlet.status() != CloudletStatus::InExec {
                rc.cloudlet.start(time);
            }
            rc.cloudlet.complete(time);
            finished.push(rc.cloudlet);
        } else {
            idx += 1;
        }
    }
}

pub(crate) fn earliest(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Creates a cloudlet scheduler from a config string: `TimeShared` or `SpaceShared`.
pub fn cloudlet_scheduler_resolver(config_str: &str) -> Result<Box<dyn CloudletScheduler>, SimulationError> {
    let (name, _) = parse_config_value(config_str);
    match name.as_str() {
        "TimeShared" => Ok(Box::new(TimeSharedCloudletScheduler::new())),
        "SpaceShared" => Ok(Box::new(SpaceSharedCloudletScheduler::new())),
        _ => Err(SimulationError::Config(format!("unknown cloudlet scheduler: {}", config_str))),
    }
}
