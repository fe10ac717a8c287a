use std::collections::VecDeque;

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{complete_finished, earliest, CloudletScheduler, ResidentCloudlet};
use crate::core::error::FailReason;

/// Space-shared cloudlet scheduler: each running cloudlet exclusively uses its PEs,
/// cloudlets which do not fit into free PEs wait in FIFO order.
#[derive(Clone, Default)]
pub struct SpaceSharedCloudletScheduler {
    exec: Vec<ResidentCloudlet>,
    waiting: VecDeque<Cloudlet>,
    paused: Vec<Cloudlet>,
    finished: Vec<Cloudlet>,
    last_update: f64,
}

impl SpaceSharedCloudletScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_waiting(&mut self, vm_pes: u32) {
        let mut free_pes = vm_pes.saturating_sub(self.exec.iter().map(|rc| rc.cloudlet.pes).sum());
        let mut still_waiting = VecDeque::with_capacity(self.waiting.len());
        while let Some(cloudlet) = self.waiting.pop_front() {
            if cloudlet.pes <= free_pes {
                free_pes -= cloudlet.pes;
                self.exec.push(ResidentCloudlet::new(cloudlet));
            } else {
                still_waiting.push_back(cloudlet);
            }
        }
        self.waiting = still_waiting;
    }

    fn remove(&mut self, cloudlet_id: u32) -> Option<Cloudlet> {
        if let Some(idx) = self.exec.iter().position(|rc| rc.cloudlet.id == cloudlet_id) {
            Some(self.exec.remove(idx).cloudlet)
        } else if let Some(idx) = self.waiting.iter().position(|c| c.id == cloudlet_id) {
            self.waiting.remove(idx)
        } else {
            None
        }
    }
}

impl CloudletScheduler for SpaceSharedCloudletScheduler {
    fn submit(&mut self, mut cloudlet: Cloudlet, _time: f64) {
        cloudlet.set_status(CloudletStatus::Queued);
        self.waiting.push_back(cloudlet);
    }

    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        let elapsed = time - self.last_update;
        for rc in self.exec.iter_mut() {
            rc.advance(elapsed);
        }
        complete_finished(&mut self.exec, &mut self.finished, time);
        self.last_update = time;

        let vm_pes = mips_share.len() as u32;
        if vm_pes > 0 {
            let (unfit, fit): (Vec<_>, Vec<_>) = self.waiting.drain(..).partition(|c| c.pes > vm_pes);
            self.waiting = fit.into();
            for mut cloudlet in unfit {
                let requested = cloudlet.pes;
                cloudlet.fail(
                    time,
                    FailReason::NotEnoughPes {
                        requested,
                        available: vm_pes,
                    },
                );
                self.finished.push(cloudlet);
            }
        }
        self.start_waiting(vm_pes);

        let cpus = mips_share.iter().filter(|mips| **mips > 0.).count();
        let mips_per_pe = if cpus > 0 {
            mips_share.iter().sum::<f64>() / cpus as f64
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
        let cloudlet = match self.remove(cloudlet_id) {
            Some(cloudlet) => Some(cloudlet),
            None => self
                .paused
                .iter()
                .position(|c| c.id == cloudlet_id)
                .map(|idx| self.paused.remove(idx)),
        };
        match cloudlet {
            Some(mut cloudlet) => {
                cloudlet.cancel(time);
                self.finished.push(cloudlet);
                true
            }
            None => false,
        }
    }

    fn pause(&mut self, cloudlet_id: u32) -> bool {
        match self.remove(cloudlet_id) {
            Some(mut cloudlet) => {
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
                let mut cloudlet = self.paused.remove(idx);
                cloudlet.set_status(CloudletStatus::Queued);
                self.waiting.push_back(cloudlet);
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
            .chain(self.waiting.drain(..))
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
            .chain(self.waiting.iter())
            .chain(self.paused.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.status())
    }

    fn cloudlet_count(&self) -> usize {
        self.exec.len() + self.waiting.len() + self.paused.len()
    }

    fn has_variable_load(&self) -> bool {
        self.exec.iter().any(|rc| rc.has_variable_rate())
    }
}
