//! Broker acting on behalf of a cloud user.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::Serialize;

use cloudsim_core::cast;
use cloudsim_core::component::Id;
use cloudsim_core::context::SimulationContext;
use cloudsim_core::event::Event;
use cloudsim_core::handler::EventHandler;
use cloudsim_core::{log_debug, log_error, log_info, log_warn};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::sim_config::SimulationConfig;
use crate::core::events::broker::BrokerStart;
use crate::core::events::cloudlet::{CloudletCancel, CloudletPause, CloudletResume, CloudletReturn, CloudletSubmit};
use crate::core::events::vm::{VmCreateAck, VmCreateRequest, VmDestroyRequest, VmDestroyed};
use crate::core::vm::Vm;

/// User action scheduled on the broker for a later time.
#[derive(Serialize, Clone, Debug)]
pub enum BrokerCommand {
    CancelCloudlet(u32),
    PauseCloudlet(u32),
    ResumeCloudlet(u32),
    DestroyVm(u32),
}

#[derive(Serialize, Clone)]
pub struct BrokerCommandEvent {
    pub command: BrokerCommand,
}

/// Broker requests creation of submitted VMs in its datacenter, submits cloudlets once all VM requests
/// are answered and collects returned cloudlets. When all cloudlets are returned the broker destroys its VMs.
///
/// Cloudlets bound to a VM which failed to be created, and unbound cloudlets when no VM is created,
/// are kept in the waiting list with `Queued` status until a suitable VM appears.
pub struct Broker {
    pub id: Id,
    datacenter_id: Id,
    started: bool,

    vm_list: Vec<Vm>,
    pending_vm_acks: usize,
    vms_created: Vec<u32>,
    vms_failed: BTreeSet<u32>,
    vm_acks_received: usize,
    next_vm_idx: usize,

    cloudlet_list: Vec<Cloudlet>,
    cloudlet_waiting_list: Vec<Cloudlet>,
    cloudlets_in_flight: BTreeMap<u32, u32>,
    cloudlet_received_list: Vec<Cloudlet>,

    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Broker {
    pub fn new(datacenter_id: Id, ctx: SimulationContext, sim_config: Rc<SimulationConfig>) -> Self {
        Self {
            id: ctx.id(),
            datacenter_id,
            started: false,
            vm_list: Vec::new(),
            pending_vm_acks: 0,
            vms_created: Vec::new(),
            vms_failed: BTreeSet::new(),
            vm_acks_received: 0,
            next_vm_idx: 0,
            cloudlet_list: Vec::new(),
            cloudlet_waiting_list: Vec::new(),
            cloudlets_in_flight: BTreeMap::new(),
            cloudlet_received_list: Vec::new(),
            ctx,
            sim_config,
        }
    }

    pub fn datacenter_id(&self) -> Id {
        self.datacenter_id
    }

    /// Adds VMs to be created. After the broker is started the creation is requested immediately.
    pub fn submit_vm_list(&mut self, vms: Vec<Vm>) {
        for mut vm in vms {
            vm.owner = self.id;
            self.vm_list.push(vm);
        }
        if self.started {
            self.request_vms();
        }
    }

    /// Adds cloudlets to be executed. After VM creation is complete they are submitted immediately.
    pub fn submit_cloudlet_list(&mut self, cloudlets: Vec<Cloudlet>) {
        for mut cloudlet in cloudlets {
            cloudlet.owner = self.id;
            self.cloudlet_list.push(cloudlet);
        }
        if self.started && self.pending_vm_acks == 0 {
            self.submit_cloudlets();
        }
    }

    /// Binds a not yet submitted cloudlet to the VM. A waiting cloudlet is submitted again.
    pub fn bind_cloudlet_to_vm(&mut self, cloudlet_id: u32, vm_id: u32) -> bool {
        if let Some(cloudlet) = self.cloudlet_list.iter_mut().find(|c| c.id == cloudlet_id) {
            cloudlet.set_vm(vm_id);
            return true;
        }
        if let Some(idx) = self.cloudlet_waiting_list.iter().position(|c| c.id == cloudlet_id) {
            let mut cloudlet = self.cloudlet_waiting_list.remove(idx);
            cloudlet.set_vm(vm_id);
            self.cloudlet_list.push(cloudlet);
            if self.started && self.pending_vm_acks == 0 {
                self.submit_cloudlets();
            }
            return true;
        }
        false
    }

    pub fn cancel_cloudlet(&mut self, cloudlet_id: u32, delay: f64) {
        self.schedule(BrokerCommand::CancelCloudlet(cloudlet_id), delay);
    }

    pub fn pause_cloudlet(&mut self, cloudlet_id: u32, delay: f64) {
        self.schedule(BrokerCommand::PauseCloudlet(cloudlet_id), delay);
    }

    pub fn resume_cloudlet(&mut self, cloudlet_id: u32, delay: f64) {
        self.schedule(BrokerCommand::ResumeCloudlet(cloudlet_id), delay);
    }

    pub fn destroy_vm(&mut self, vm_id: u32, delay: f64) {
        self.schedule(BrokerCommand::DestroyVm(vm_id), delay);
    }

    /// Returned cloudlets in order of arrival.
    pub fn get_cloudlet_received_list(&self) -> &[Cloudlet] {
        &self.cloudlet_received_list
    }

    pub fn get_cloudlet_waiting_list(&self) -> &[Cloudlet] {
        &self.cloudlet_waiting_list
    }

    /// Ids of created VMs which the broker has not released yet.
    pub fn get_vms_created_list(&self) -> &[u32] {
        &self.vms_created
    }

    pub fn get_vms_failed(&self) -> &BTreeSet<u32> {
        &self.vms_failed
    }

    /// Number of cloudlets submitted to the datacenter and not returned yet.
    pub fn cloudlets_in_flight(&self) -> usize {
        self.cloudlets_in_flight.len()
    }

    /// Counter of observed outcomes, grows whenever VM creation is answered or a cloudlet is returned.
    pub fn progress(&self) -> usize {
        self.vm_acks_received + self.cloudlet_received_list.len()
    }

    /// Whether all submitted work is resolved: VM requests are answered and no cloudlet is in flight.
    pub fn is_idle(&self) -> bool {
        self.pending_vm_acks == 0 && self.cloudlets_in_flight.is_empty() && self.cloudlet_list.is_empty()
    }

    fn schedule(&mut self, command: BrokerCommand, delay: f64) {
        self.ctx.emit_self(BrokerCommandEvent { command }, delay);
    }

    fn on_start(&mut self) {
        if self.started {
            return;
        }
        log_info!(self.ctx, "started");
        self.started = true;
        self.request_vms();
        if self.pending_vm_acks == 0 {
            self.submit_cloudlets();
        }
    }

    fn request_vms(&mut self) {
        for vm in std::mem::take(&mut self.vm_list) {
            log_debug!(self.ctx, "requesting creation of vm #{}", vm.id);
            self.pending_vm_acks += 1;
            self.ctx
                .emit(VmCreateRequest { vm }, self.datacenter_id, self.sim_config.message_delay);
        }
    }

    fn on_vm_create_ack(&mut self, vm_id: u32, host_id: Option<u32>) {
        self.pending_vm_acks = self.pending_vm_acks.saturating_sub(1);
        self.vm_acks_received += 1;
        match host_id {
            Some(host_id) => {
                log_info!(self.ctx, "vm #{} created on host #{}", vm_id, host_id);
                self.vms_failed.remove(&vm_id);
                if !self.vms_created.contains(&vm_id) {
                    self.vms_created.push(vm_id);
                }
            }
            None => {
                log_warn!(self.ctx, "creation of vm #{} failed", vm_id);
                if !self.vms_created.contains(&vm_id) {
                    self.vms_failed.insert(vm_id);
                }
            }
        }
        if self.pending_vm_acks == 0 {
            let waiting = std::mem::take(&mut self.cloudlet_waiting_list);
            self.cloudlet_list.extend(waiting);
            self.submit_cloudlets();
        }
    }

    fn submit_cloudlets(&mut self) {
        for mut cloudlet in std::mem::take(&mut self.cloudlet_list) {
            let vm_id = match cloudlet.vm_id() {
                Some(vm_id) if self.vms_failed.contains(&vm_id) => None,
                Some(vm_id) => Some(vm_id),
                None if self.vms_created.is_empty() => None,
                None => {
                    let vm_id = self.vms_created[self.next_vm_idx % self.vms_created.len()];
                    self.next_vm_idx += 1;
                    cloudlet.set_vm(vm_id);
                    Some(vm_id)
                }
            };
            match vm_id {
                Some(vm_id) => {
                    log_debug!(self.ctx, "submitting cloudlet #{} to vm #{}", cloudlet.id, vm_id);
                    self.cloudlets_in_flight.insert(cloudlet.id, vm_id);
                    self.ctx
                        .emit(CloudletSubmit { cloudlet }, self.datacenter_id, self.sim_config.message_delay);
                }
                None => {
                    log_warn!(
                        self.ctx,
                        "cloudlet #{} postponed: no available vm to run it on",
                        cloudlet.id
                    );
                    cloudlet.set_status(CloudletStatus::Queued);
                    self.cloudlet_waiting_list.push(cloudlet);
                }
            }
        }
    }

    fn on_cloudlet_return(&mut self, cloudlet: Cloudlet) {
        if self.cloudlets_in_flight.remove(&cloudlet.id).is_none() {
            log_error!(self.ctx, "unexpected return of cloudlet #{}", cloudlet.id);
            return;
        }
        log_info!(
            self.ctx,
            "cloudlet #{} returned with status {}",
            cloudlet.id,
            cloudlet.status()
        );
        self.cloudlet_received_list.push(cloudlet);
        self.destroy_vms_if_done();
    }

    fn destroy_vms_if_done(&mut self) {
        if !self.is_idle() || !self.cloudlet_waiting_list.is_empty() {
            return;
        }
        for vm_id in std::mem::take(&mut self.vms_created) {
            log_debug!(self.ctx, "destroying vm #{}", vm_id);
            self.ctx
                .emit(VmDestroyRequest { vm_id }, self.datacenter_id, self.sim_config.message_delay);
        }
    }

    fn on_vm_destroyed(&mut self, vm_id: u32) {
        log_debug!(self.ctx, "vm #{} destroyed", vm_id);
        self.vms_created.retain(|id| *id != vm_id);
    }

    fn on_command(&mut self, command: BrokerCommand) {
        match command {
            BrokerCommand::CancelCloudlet(cloudlet_id) => {
                if let Some(vm_id) = self.cloudlets_in_flight.get(&cloudlet_id) {
                    let vm_id = *vm_id;
                    self.ctx.emit(
                        CloudletCancel { cloudlet_id, vm_id },
                        self.datacenter_id,
                        self.sim_config.message_delay,
                    );
                } else if let Some(mut cloudlet) = self.take_unsubmitted(cloudlet_id) {
                    cloudlet.cancel(self.ctx.time());
                    log_info!(self.ctx, "cloudlet #{} canceled before submission", cloudlet_id);
                    self.cloudlet_received_list.push(cloudlet);
                    if self.started {
                        self.destroy_vms_if_done();
                    }
                } else {
                    log_warn!(self.ctx, "can't cancel unknown cloudlet #{}", cloudlet_id);
                }
            }
            BrokerCommand::PauseCloudlet(cloudlet_id) => match self.cloudlets_in_flight.get(&cloudlet_id) {
                Some(vm_id) => {
                    let vm_id = *vm_id;
                    self.ctx.emit(
                        CloudletPause { cloudlet_id, vm_id },
                        self.datacenter_id,
                        self.sim_config.message_delay,
                    );
                }
                None => log_warn!(self.ctx, "can't pause cloudlet #{}: not submitted", cloudlet_id),
            },
            BrokerCommand::ResumeCloudlet(cloudlet_id) => match self.cloudlets_in_flight.get(&cloudlet_id) {
                Some(vm_id) => {
                    let vm_id = *vm_id;
                    self.ctx.emit(
                        CloudletResume { cloudlet_id, vm_id },
                        self.datacenter_id,
                        self.sim_config.message_delay,
                    );
                }
                None => log_warn!(self.ctx, "can't resume cloudlet #{}: not submitted", cloudlet_id),
            },
            BrokerCommand::DestroyVm(vm_id) => {
                self.vms_created.retain(|id| *id != vm_id);
                self.ctx
                    .emit(VmDestroyRequest { vm_id }, self.datacenter_id, self.sim_config.message_delay);
            }
        }
    }

    fn take_unsubmitted(&mut self, cloudlet_id: u32) -> Option<Cloudlet> {
        if let Some(idx) = self.cloudlet_list.iter().position(|c| c.id == cloudlet_id) {
            return Some(self.cloudlet_list.remove(idx));
        }
        let idx = self.cloudlet_waiting_list.iter().position(|c| c.id == cloudlet_id)?;
        Some(self.cloudlet_waiting_list.remove(idx))
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            BrokerStart {} => {
                self.on_start();
            }
            VmCreateAck { vm_id, host_id } => {
                self.on_vm_create_ack(vm_id, host_id);
            }
            VmDestroyed { vm_id } => {
                self.on_vm_destroyed(vm_id);
            }
            CloudletReturn { cloudlet } => {
                self.on_cloudlet_return(cloudlet);
            }
            BrokerCommandEvent { command } => {
                self.on_command(command);
            }
        })
    }
}
