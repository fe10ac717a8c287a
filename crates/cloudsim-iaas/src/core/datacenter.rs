//! Datacenter component.

use std::collections::BTreeMap;
use std::rc::Rc;

use cloudsim_core::cast;
use cloudsim_core::component::Id;
use cloudsim_core::context::SimulationContext;
use cloudsim_core::event::{Event, EventId};
use cloudsim_core::handler::EventHandler;
use cloudsim_core::{log_debug, log_info, log_trace, log_warn};

use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::cloudlet::Cloudlet;
use crate::core::cloudlet_scheduler::earliest;
use crate::core::common::VmKey;
use crate::core::config::sim_config::SimulationConfig;
use crate::core::error::FailReason;
use crate::core::events::cloudlet::{CloudletCancel, CloudletPause, CloudletResume, CloudletReturn, CloudletSubmit};
use crate::core::events::datacenter::DatacenterTick;
use crate::core::events::vm::{VmCreateAck, VmCreateRequest, VmDestroyRequest, VmDestroyed};
use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Datacenter owns hosts and VMs placed on them and processes requests of brokers.
///
/// Each request is handled in three steps: cloudlets processing is advanced to the current time,
/// the request is applied, and then processing is updated again with the new host shares.
/// The datacenter wakes itself up at the earliest estimated cloudlet completion, and periodically
/// while cloudlets with time-dependent CPU utilization are running.
pub struct Datacenter {
    pub id: Id,
    characteristics: DatacenterCharacteristics,
    hosts: Vec<Host>,
    allocation_policy: Box<dyn VmAllocationPolicy>,
    vms: BTreeMap<VmKey, Vm>,
    next_tick: Option<(f64, EventId)>,
    last_update: f64,
    running: bool,
    work_updates: u64,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        hosts: Vec<Host>,
        allocation_policy: Box<dyn VmAllocationPolicy>,
        characteristics: DatacenterCharacteristics,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            characteristics,
            hosts,
            allocation_policy,
            vms: BTreeMap::new(),
            next_tick: None,
            last_update: 0.,
            running: false,
            work_updates: 0,
            ctx,
            sim_config,
        }
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn vm(&self, owner: Id, vm_id: u32) -> Option<&Vm> {
        self.vms.get(&VmKey::new(owner, vm_id))
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    /// Number of processing updates which advanced the clock while some cloudlet was running.
    pub fn progress(&self) -> u64 {
        self.work_updates
    }

    pub fn host_of(&self, owner: Id, vm_id: u32) -> Option<u32> {
        self.allocation_policy.get_host(VmKey::new(owner, vm_id))
    }

    fn on_vm_create_request(&mut self, mut vm: Vm, owner: Id) {
        vm.owner = owner;
        let key = vm.key();
        let host_id = if self.vms.contains_key(&key) {
            log_warn!(self.ctx, "{} already exists", key);
            None
        } else {
            self.update_cloudlet_processing();
            match self.allocation_policy.allocate_host_for_vm(&vm.allocation(), &mut self.hosts) {
                Ok(host_id) => {
                    log_debug!(self.ctx, "{} allocated on host #{}", key, host_id);
                    vm.set_host_id(Some(host_id));
                    self.vms.insert(key, vm);
                    self.update_cloudlet_processing();
                    Some(host_id)
                }
                Err(e) => {
                    log_warn!(self.ctx, "{}", e);
                    None
                }
            }
        };
        self.ctx.emit(
            VmCreateAck {
                vm_id: key.vm_id,
                host_id,
            },
            owner,
            self.sim_config.message_delay,
        );
    }

    fn on_vm_destroy_request(&mut self, key: VmKey) {
        if !self.vms.contains_key(&key) {
            log_warn!(self.ctx, "can't destroy {}: not found", key);
            return;
        }
        self.update_cloudlet_processing();
        if let Some(mut vm) = self.vms.remove(&key) {
            let now = self.ctx.time();
            vm.cloudlet_scheduler_mut()
                .fail_all(now, FailReason::VmDestroyed { vm_id: key.vm_id });
            for cloudlet in vm.cloudlet_scheduler_mut().take_finished() {
                self.return_cloudlet(cloudlet);
            }
            self.allocation_policy.deallocate_host_for_vm(key, &mut self.hosts);
            log_debug!(self.ctx, "{} destroyed", key);
        }
        self.ctx
            .emit(VmDestroyed { vm_id: key.vm_id }, key.owner, self.sim_config.message_delay);
        self.update_cloudlet_processing();
    }

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet) {
        let now = self.ctx.time();
        cloudlet.set_datacenter(self.id, now);
        let key = cloudlet.vm_id().map(|vm_id| VmKey::new(cloudlet.owner, vm_id));
        match key.filter(|key| self.vms.contains_key(key)) {
            Some(key) => {
                log_debug!(self.ctx, "cloudlet #{} submitted to {}", cloudlet.id, key);
                self.update_cloudlet_processing();
                if let Some(vm) = self.vms.get_mut(&key) {
                    vm.cloudlet_scheduler_mut().submit(cloudlet, now);
                }
                self.update_cloudlet_processing();
            }
            None => {
                log_warn!(
                    self.ctx,
                    "cloudlet #{} of broker {} is submitted to missing vm {:?}",
                    cloudlet.id,
                    cloudlet.owner,
                    cloudlet.vm_id()
                );
                cloudlet.fail(now, FailReason::VmNotFound { vm_id: cloudlet.vm_id() });
                self.return_cloudlet(cloudlet);
            }
        }
    }

    /// Applies a user action to the cloudlet resident on the given VM.
    fn on_cloudlet_action<F>(&mut self, key: VmKey, cloudlet_id: u32, action: &str, f: F)
    where
        F: FnOnce(&mut Vm, f64) -> bool,
    {
        if !self.vms.contains_key(&key) {
            log_warn!(self.ctx, "can't {} cloudlet #{}: {} not found", action, cloudlet_id, key);
            return;
        }
        self.update_cloudlet_processing();
        let now = self.ctx.time();
        let applied = self.vms.get_mut(&key).map(|vm| f(vm, now)).unwrap_or(false);
        if applied {
            log_debug!(self.ctx, "{} cloudlet #{} on {}", action, cloudlet_id, key);
        } else {
            log_warn!(self.ctx, "can't {} cloudlet #{} on {}", action, cloudlet_id, key);
        }
        self.update_cloudlet_processing();
    }

    fn on_tick(&mut self) {
        self.next_tick = None;
        self.update_cloudlet_processing();
    }

    /// Advances all VMs to the current time, returns finished cloudlets and schedules the next tick.
    fn update_cloudlet_processing(&mut self) {
        let now = self.ctx.time();
        if self.running && now > self.last_update {
            self.work_updates += 1;
        }
        self.last_update = now;

        for host in &self.hosts {
            for (key, share) in host.vm_shares() {
                if let Some(vm) = self.vms.get_mut(&key) {
                    vm.set_mips_share(share);
                }
            }
        }

        let mut next_finish = None;
        let mut finished = Vec::new();
        let mut busy = false;
        let mut variable_load = false;
        for vm in self.vms.values_mut() {
            next_finish = earliest(next_finish, vm.update_processing(now));
            finished.extend(vm.cloudlet_scheduler_mut().take_finished());
            busy |= !vm.cloudlet_scheduler().is_idle();
            variable_load |= vm.has_variable_load();
        }
        self.running = next_finish.is_some();
        for cloudlet in finished {
            self.return_cloudlet(cloudlet);
        }

        if busy && self.sim_config.scheduling_interval > 0. {
            next_finish = earliest(next_finish, Some(now + self.sim_config.scheduling_interval));
        }
        if variable_load {
            // rates were sampled at `now` and go stale as utilization changes
            next_finish = earliest(next_finish, Some(now + self.sim_config.reevaluation_interval()));
        }
        self.schedule_tick(next_finish);
    }

    fn schedule_tick(&mut self, next_finish: Option<f64>) {
        let now = self.ctx.time();
        let next_time = next_finish.map(|time| time.max(now + self.sim_config.min_time_between_events));
        match (self.next_tick, next_time) {
            (Some((scheduled, _)), Some(time)) if scheduled == time => {}
            (scheduled, time) => {
                if let Some((_, event_id)) = scheduled {
                    self.ctx.cancel_event(event_id);
                }
                self.next_tick = time.map(|time| {
                    log_trace!(self.ctx, "next processing update at {:.3}", time);
                    (time, self.ctx.emit_self(DatacenterTick {}, time - now))
                });
            }
        }
    }

    fn return_cloudlet(&mut self, mut cloudlet: Cloudlet) {
        let cpu_time = cloudlet.execution_time().unwrap_or(0.);
        let cost = self
            .characteristics
            .processing_cost(cpu_time, cloudlet.file_size + cloudlet.output_size);
        cloudlet.set_processing_cost(cost);
        log_info!(
            self.ctx,
            "cloudlet #{} of broker {} finished with status {}",
            cloudlet.id,
            cloudlet.owner,
            cloudlet.status()
        );
        let owner = cloudlet.owner;
        self.ctx
            .emit(CloudletReturn { cloudlet }, owner, self.sim_config.message_delay);
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            VmCreateRequest { vm } => {
                self.on_vm_create_request(vm, src);
            }
            VmDestroyRequest { vm_id } => {
                self.on_vm_destroy_request(VmKey::new(src, vm_id));
            }
            CloudletSubmit { cloudlet } => {
                self.on_cloudlet_submit(cloudlet);
            }
            CloudletCancel { cloudlet_id, vm_id } => {
                self.on_cloudlet_action(VmKey::new(src, vm_id), cloudlet_id, "cancel", |vm, now| {
                    vm.cloudlet_scheduler_mut().cancel(cloudlet_id, now)
                });
            }
            CloudletPause { cloudlet_id, vm_id } => {
                self.on_cloudlet_action(VmKey::new(src, vm_id), cloudlet_id, "pause", |vm, _| {
                    vm.cloudlet_scheduler_mut().pause(cloudlet_id)
                });
            }
            CloudletResume { cloudlet_id, vm_id } => {
                self.on_cloudlet_action(VmKey::new(src, vm_id), cloudlet_id, "resume", |vm, _| {
                    vm.cloudlet_scheduler_mut().resume(cloudlet_id)
                });
            }
            DatacenterTick {} => {
                self.on_tick();
            }
        })
    }
}
