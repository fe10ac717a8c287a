//! Cloudlet, a unit of work executed on a VM.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use cloudsim_core::component::Id;

use crate::core::error::FailReason;
use crate::core::utilization_model::{FullUtilizationModel, UtilizationModel};

/// Status of a cloudlet through its lifecycle.
///
/// Normal path is `Created -> Queued -> InExec -> Success`. `Paused` is entered when the VM gives no
/// processing capacity to the cloudlet or on explicit pause. `Failed` and `Canceled` are reachable from
/// any non-terminal status.
///
/// A cloudlet still waiting for capacity may also be paused (`Queued -> Paused`). A resumed cloudlet
/// goes back to `Queued` when the space-shared scheduler has no free PEs for it (`Paused -> Queued`).
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudletStatus {
    Created,
    Queued,
    InExec,
    Paused,
    Success,
    Failed,
    Canceled,
}

impl CloudletStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Canceled)
    }

    fn can_change_to(&self, next: CloudletStatus) -> bool {
        use CloudletStatus::*;
        match (self, next) {
            (from, to) if *from == to => !from.is_terminal(),
            (from, _) if from.is_terminal() => false,
            (_, Failed | Canceled) => true,
            (Created, Queued) => true,
            (Queued, InExec | Paused) => true,
            (InExec, Paused | Success) => true,
            (Paused, InExec | Queued) => true,
            _ => false,
        }
    }
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Queued => "QUEUED",
            Self::InExec => "INEXEC",
            Self::Paused => "PAUSED",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        };
        write!(f, "{}", name)
    }
}

/// Unit of work with a fixed length in millions of instructions.
#[derive(Serialize, Clone)]
pub struct Cloudlet {
    pub id: u32,
    /// Broker which owns the cloudlet.
    pub owner: Id,
    /// Total length in millions of instructions, processed by all used PEs together.
    pub length: f64,
    pub pes: u32,
    pub file_size: u64,
    pub output_size: u64,
    #[serde(skip_serializing)]
    pub cpu_model: Box<dyn UtilizationModel>,
    #[serde(skip_serializing)]
    pub ram_model: Box<dyn UtilizationModel>,
    #[serde(skip_serializing)]
    pub bw_model: Box<dyn UtilizationModel>,
    vm_id: Option<u32>,
    datacenter_id: Option<Id>,
    status: CloudletStatus,
    executed: f64,
    submission_time: Option<f64>,
    start_time: Option<f64>,
    finish_time: Option<f64>,
    fail_reason: Option<FailReason>,
    processing_cost: f64,
}

impl Cloudlet {
    pub fn new(id: u32, length: f64, pes: u32, file_size: u64, output_size: u64) -> Self {
        Self {
            id,
            owner: 0,
            length,
            pes,
            file_size,
            output_size,
            cpu_model: Box::new(FullUtilizationModel::new()),
            ram_model: Box::new(FullUtilizationModel::new()),
            bw_model: Box::new(FullUtilizationModel::new()),
            vm_id: None,
            datacenter_id: None,
            status: CloudletStatus::Created,
            executed: 0.,
            submission_time: None,
            start_time: None,
            finish_time: None,
            fail_reason: None,
            processing_cost: 0.,
        }
    }

    pub fn with_utilization_models(
        mut self,
        cpu_model: Box<dyn UtilizationModel>,
        ram_model: Box<dyn UtilizationModel>,
        bw_model: Box<dyn UtilizationModel>,
    ) -> Self {
        self.cpu_model = cpu_model;
        self.ram_model = ram_model;
        self.bw_model = bw_model;
        self
    }

    pub fn with_vm(mut self, vm_id: u32) -> Self {
        self.vm_id = Some(vm_id);
        self
    }

    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    pub fn set_vm(&mut self, vm_id: u32) {
        self.vm_id = Some(vm_id);
    }

    pub fn datacenter_id(&self) -> Option<Id> {
        self.datacenter_id
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    pub fn executed_length(&self) -> f64 {
        self.executed
    }

    pub fn remaining_length(&self) -> f64 {
        (self.length - self.executed).max(0.)
    }

    pub fn submission_time(&self) -> Option<f64> {
        self.submission_time
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Time between the first start and the finish of execution.
    pub fn execution_time(&self) -> Option<f64> {
        Some(self.finish_time? - self.start_time?)
    }

    pub fn fail_reason(&self) -> Option<&FailReason> {
        self.fail_reason.as_ref()
    }

    pub fn processing_cost(&self) -> f64 {
        self.processing_cost
    }

    /// Returns the summary of cloudlet outcome.
    pub fn report(&self) -> CloudletReport {
        CloudletReport {
            id: self.id,
            status: self.status,
            datacenter_id: self.datacenter_id,
            vm_id: self.vm_id,
            execution_time: self.execution_time(),
            start_time: self.start_time,
            finish_time: self.finish_time,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.remaining_length() <= 1e-9 * self.length.max(1.)
    }

    pub(crate) fn set_status(&mut self, status: CloudletStatus) {
        debug_assert!(
            self.status.can_change_to(status),
            "invalid cloudlet status change {} -> {}",
            self.status,
            status
        );
        self.status = status;
    }

    pub(crate) fn set_datacenter(&mut self, datacenter_id: Id, time: f64) {
        self.datacenter_id = Some(datacenter_id);
        self.submission_time = Some(time);
    }

    pub(crate) fn start(&mut self, time: f64) {
        self.set_status(CloudletStatus::InExec);
        if self.start_time.is_none() {
            self.start_time = Some(time);
        }
    }

    pub(crate) fn advance(&mut self, length: f64) {
        self.executed = (self.executed + length).min(self.length);
    }

    pub(crate) fn complete(&mut self, time: f64) {
        self.executed = self.length;
        self.set_status(CloudletStatus::Success);
        self.finish_time = Some(time);
    }

    pub(crate) fn fail(&mut self, time: f64, reason: FailReason) {
        self.set_status(CloudletStatus::Failed);
        self.fail_reason = Some(reason);
        self.finish_time = Some(time);
    }

    pub(crate) fn cancel(&mut self, time: f64) {
        self.set_status(CloudletStatus::Canceled);
        self.finish_time = Some(time);
    }

    pub(crate) fn set_processing_cost(&mut self, cost: f64) {
        self.processing_cost = cost;
    }
}

/// Outcome of a cloudlet as reported to users.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CloudletReport {
    pub id: u32,
    pub status: CloudletStatus,
    pub datacenter_id: Option<Id>,
    pub vm_id: Option<u32>,
    pub execution_time: Option<f64>,
    pub start_time: Option<f64>,
    pub finish_time: Option<f64>,
}

impl Display for CloudletReport {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let fmt_opt = |value: Option<f64>| value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:>6} {:>9} {:>4} {:>4} {:>8} {:>8} {:>8}",
            self.id,
            self.status.to_string(),
            self.datacenter_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            self.vm_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            fmt_opt(self.execution_time),
            fmt_opt(self.start_time),
            fmt_opt(self.finish_time),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use CloudletStatus::*;
        assert!(Created.can_change_to(Queued));
        assert!(Created.can_change_to(Failed));
        assert!(!Created.can_change_to(InExec));
        assert!(Queued.can_change_to(InExec));
        assert!(InExec.can_change_to(Paused));
        assert!(Paused.can_change_to(InExec));
        assert!(InExec.can_change_to(Success));
        assert!(!Queued.can_change_to(Success));
        assert!(!Success.can_change_to(Failed));
        assert!(!Canceled.can_change_to(Canceled));
        // pause while waiting for capacity and resume into the waiting queue
        assert!(Queued.can_change_to(Paused));
        assert!(Paused.can_change_to(Queued));
        assert!(!Paused.can_change_to(Success));
        assert!(!Created.can_change_to(Paused));
    }

    #[test]
    fn test_progress() {
        let mut cloudlet = Cloudlet::new(0, 1000., 1, 300, 300);
        cloudlet.set_status(CloudletStatus::Queued);
        cloudlet.start(1.);
        cloudlet.advance(400.);
        assert_eq!(cloudlet.remaining_length(), 600.);
        cloudlet.advance(600. - 1e-8);
        assert!(cloudlet.is_finished());
        cloudlet.complete(2.);
        assert_eq!(cloudlet.executed_length(), 1000.);
        assert_eq!(cloudlet.execution_time(), Some(1.));
        assert_eq!(cloudlet.report().status, CloudletStatus::Success);
    }
}
