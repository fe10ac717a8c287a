use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{complete_finished, earliest, CloudletScheduler, ResidentCloudlet};
use crate::core::error::FailReason;

/// Time-shared cloudlet scheduler: all resident cloudlets run concurrently and share VM capacity equally per PE.
#[derive(Clone, Default)]
pub struct TimeSharedCloudletScheduler {
    exec: Vec<ResidentCloudlet>,
    paused: Vec<Cloudlet>,
    finished: Vec<Cloudlet>,
    last_update: f64,
}

impl TimeSharedCloudletScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CloudletScheduler for TimeSharedCloudletScheduler {
    fn submit(&mut self, mut cloudlet: Cloudlet, _time: f64) {
        cloudlet.set_status(CloudletStatus::Queued);
        self.exec.push(ResidentCloudlet::new(cloudlet));
    }

    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        let elapsed = time - self.last_update;
        for rc in self.exec.iter_mut() {
            rc.advance(elapsed);
        }
        complete_finished(&mut self.exec, &mut self.finished, time);
        self.last_update = time;

        let total_mips: f64 = mips_share.iter().sum();
        let cpus = mips_share.iter().filter(|mips| **mips > 0.).count() as u32;
        let pes_in_use: u32 = self.exec.iter().map(|rc| rc.cloudlet.pes).sum();
        let mips_per_pe = if total_mips > 0. {
            total_mips / pes_in_use.max(cpus).max(1) as f64
        } else {
            0.
        };

        let mut next_finish = None;
        for rc in self.exec.iter_mut() {
            if mips_per_pe > 0. {
                if rc.cloudlet.status() != CloudletStatus::InExec {
                    rc.cloudlet.start(time);
                }
                rc.set_rate(time, mips_per_pe);
            } else {
                rc.rate = 0.;
                if rc.cloudlet.status() == CloudletStatus::InExec {
                    rc.cloudlet.set_status(CloudletStatus::Paused);
                }
            }
            next_finish = earliest(next_finish, rc.finish_time(time));
        }
        next_finish
    }

    fn take_finished(&mut self) -> Vec<Cloudlet> {
        std::mem::take(&mut self.finished)
    }

    fn cancel(&mut self, cloudlet_id: u32, time: f64) -> bool {
        let cloudlet = if let Some(idx) = self.exec.iter().position(|rc| rc.cloudlet.id == cloudlet_id) {
            self.exec.remove(idx).cloudlet
        } else if let Some(idx) = self.paused.iter().position(|c| c.id == cloudlet_id) {
            self.paused.remove(idx)
        } else {
            return false;
        };
        let mut cloudlet = cloudlet;
        cloudlet.cancel(time);
        self.finished.push(cloudlet);
        true
    }

    fn pause(&mut self, cloudlet_id: u32) -> bool {
        match self.exec.iter().position(|rc| rc.cloudlet.id == cloudlet_id) {
            Some(idx) => {
                let mut cloudlet = self.exec.remove(idx).cloudlet;
                cloudlet.set_status(CloudletStatus::Paused);
                self.paused.push(cloudlet);
                true
            }
            None => false,
        }
    }

    fn resume(&mut self, cloudlet_id: u32) -> bool {
        match self.paused.iter().position(|c| c.id == cloudlet_id) {
            Some(idx) => {
                // status changes to INEXEC at the next update if the VM has capacity
                let cloudlet = self.paused.remove(idx);
                self.exec.push(ResidentCloudlet::new(cloudlet));
                true
            }
            None => false,
        }
    }

    fn fail_all(&mut self, time: f64, reason: FailReason) {
        let resident = self
            .exec
            .drain(..)
            .map(|rc| rc.cloudlet)
            .chain(self.paused.drain(..))
            .collect::<Vec<_>>();
        for mut cloudlet in resident {
            cloudlet.fail(time, reason.clone());
            self.finished.push(cloudlet);
        }
    }

    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.exec
            .iter()
            .map(|rc| &rc.cloudlet)
            .chain(self.paused.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.status())
    }

    fn cloudlet_count(&self) -> usize {
        self.exec.len() + self.paused.len()
    }

    fn has_variable_load(&self) -> bool {
        self.exec.iter().any(|rc| rc.has_variable_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utilization_model::{ConstantUtilizationModel, FullUtilizationModel, StochasticUtilizationModel};

    fn cloudlet(id: u32, length: f64) -> Cloudlet {
        Cloudlet::new(id, length, 1, 300, 300)
    }

    #[test]
    fn test_single_cloudlet() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(cloudlet(0, 40000.), 0.);
        assert_eq!(scheduler.update_processing(0., &[1000.]), Some(40.));
        assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::InExec));
        assert_eq!(scheduler.update_processing(40., &[1000.]), None);
        let finished = scheduler.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status(), CloudletStatus::Success);
        assert_eq!(finished[0].execution_time(), Some(40.));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_equal_sharing() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(cloudlet(0, 40000.), 0.);
        scheduler.submit(cloudlet(1, 40000.), 0.);
        assert_eq!(scheduler.update_processing(0., &[1000.]), Some(80.));
        assert_eq!(scheduler.update_processing(80., &[1000.]), None);
        assert_eq!(scheduler.take_finished().len(), 2);
    }

    #[test]
    fn test_rate_change_keeps_done_work() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(cloudlet(0, 40000.), 0.);
        scheduler.update_processing(0., &[1000.]);
        // 10000 MI done by time 10, the rest runs at 500 MIPS
        assert_eq!(scheduler.update_processing(10., &[500.]), Some(70.));
    }

    #[test]
    fn test_zero_share_pauses() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(cloudlet(0, 1000.), 0.);
        assert_eq!(scheduler.update_processing(0., &[0.]), None);
        assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::Queued));
        assert_eq!(scheduler.update_processing(1., &[1000.]), Some(2.));
        assert_eq!(scheduler.update_processing(1.5, &[0.]), None);
        assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::Paused));
        assert_eq!(scheduler.update_processing(3., &[1000.]), Some(3.5));
        assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::InExec));
    }

    #[test]
    fn test_pause_resume_cancel() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(cloudlet(0, 1000.), 0.);
        scheduler.submit(cloudlet(1, 1000.), 0.);
        scheduler.update_processing(0., &[1000.]);
        scheduler.update_processing(1., &[1000.]);
        assert!(scheduler.pause(0));
        assert!(!scheduler.pause(0));
        assert_eq!(scheduler.update_processing(1., &[1000.]), Some(1.5));
        assert!(scheduler.resume(0));
        assert!(scheduler.cancel(1, 1.25));
        assert!(!scheduler.cancel(1, 1.25));
        let finished = scheduler.take_finished();
        assert_eq!(finished[0].status(), CloudletStatus::Canceled);
        // cloudlet 0 has 500 MI left
        assert_eq!(scheduler.update_processing(1.25, &[1000.]), Some(1.75));
    }

    #[test]
    fn test_utilization_scales_rate() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        let c = cloudlet(0, 1000.).with_utilization_models(
            Box::new(ConstantUtilizationModel::new(0.5)),
            Box::new(FullUtilizationModel::new()),
            Box::new(FullUtilizationModel::new()),
        );
        scheduler.submit(c, 0.);
        assert_eq!(scheduler.update_processing(0., &[1000.]), Some(2.));
    }

    #[test]
    fn test_length_is_shared_by_cloudlet_pes() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(Cloudlet::new(0, 2000., 2, 300, 300), 0.);
        // 2000 MI in total over two PEs of 1000 MIPS
        assert_eq!(scheduler.update_processing(0., &[1000., 1000.]), Some(1.));
    }

    #[test]
    fn test_variable_load() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(cloudlet(0, 1000.), 0.);
        scheduler.update_processing(0., &[1000.]);
        assert!(!scheduler.has_variable_load());
        let c = cloudlet(1, 1000.).with_utilization_models(
            Box::new(StochasticUtilizationModel::new(7)),
            Box::new(FullUtilizationModel::new()),
            Box::new(FullUtilizationModel::new()),
        );
        scheduler.submit(c, 0.);
        assert!(scheduler.has_variable_load());
        assert!(scheduler.pause(1));
        assert!(!scheduler.has_variable_load());
    }

    #[test]
    fn test_fail_all() {
        let mut scheduler = TimeSharedCloudletScheduler::new();
        scheduler.submit(cloudlet(0, 1000.), 0.);
        scheduler.submit(cloudlet(1, 1000.), 0.);
        scheduler.update_processing(0., &[1000.]);
        scheduler.pause(1);
        scheduler.fail_all(0.5, FailReason::VmDestroyed { vm_id: 0 });
        let finished = scheduler.take_finished();
        assert_eq!(finished.len(), 2);
        assert!(finished.iter().all(|c| c.status() == CloudletStatus::Failed));
        assert_eq!(finished[0].fail_reason(), Some(&FailReason::VmDestroyed { vm_id: 0 }));
        assert!(scheduler.is_idle());
    }
}
