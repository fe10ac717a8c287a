//! Events exchanged between brokers and datacenters.

pub mod broker {
    use serde::Serialize;

    /// Makes broker request its VMs and then submit its cloudlets.
    #[derive(Serialize, Clone)]
    pub struct BrokerStart {}
}

pub mod vm {
    use serde::Serialize;

    use crate::core::vm::Vm;

    #[derive(Serialize, Clone)]
    pub struct VmCreateRequest {
        pub vm: Vm,
    }

    /// Result of VM creation, `host_id` is `None` if VM was not placed.
    #[derive(Serialize, Clone)]
    pub struct VmCreateAck {
        pub vm_id: u32,
        pub host_id: Option<u32>,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyed {
        pub vm_id: u32,
    }
}

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;

    #[derive(Serialize, Clone)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
    }

    /// Cloudlet in terminal status returned to its broker.
    #[derive(Serialize, Clone)]
    pub struct CloudletReturn {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletCancel {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletPause {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletResume {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }
}

pub mod datacenter {
    use serde::Serialize;

    /// Wakes datacenter up to update cloudlets processing.
    #[derive(Serialize, Clone)]
    pub struct DatacenterTick {}
}
