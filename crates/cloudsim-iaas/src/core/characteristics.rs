use serde::{Deserialize, Serialize};

/// Static properties of a datacenter and its resource prices.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DatacenterCharacteristics {
    pub arch: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
    /// Price of using processing for one time unit.
    pub cost_per_sec: f64,
    pub cost_per_mem: f64,
    pub cost_per_storage: f64,
    pub cost_per_bw: f64,
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            arch: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 10.,
            cost_per_sec: 3.,
            cost_per_mem: 0.05,
            cost_per_storage: 0.001,
            cost_per_bw: 0.,
        }
    }
}

impl DatacenterCharacteristics {
    /// Cost of executing the cloudlet for `cpu_time` and transferring its input and output files.
    pub fn processing_cost(&self, cpu_time: f64, transferred: u64) -> f64 {
        self.cost_per_sec * cpu_time + self.cost_per_bw * transferred as f64
    }
}
