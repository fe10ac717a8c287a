//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::error::SimulationError;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub message_delay: Option<f64>,
    pub scheduling_interval: Option<f64>,
    pub min_time_between_events: Option<f64>,
    pub allow_vm_oversubscription: Option<bool>,
    pub no_progress_event_limit: Option<u64>,
    pub allocation_policy: Option<String>,
    pub hosts: Option<Vec<HostConfig>>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Number of processing elements.
    pub pes: u32,
    /// Capacity of each processing element in MIPS.
    pub mips: f64,
    /// Memory capacity in MB.
    pub ram: u64,
    /// Bandwidth capacity in Mbit/s.
    pub bw: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// Number of such hosts.
    pub count: Option<u32>,
}

const DEFAULT_MIN_TIME_BETWEEN_EVENTS: f64 = 0.01;

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Delay of messages exchanged between brokers and datacenters.
    pub message_delay: f64,
    /// Period of forced cloudlet processing updates in datacenters, zero disables periodic updates.
    pub scheduling_interval: f64,
    /// Minimal delay between consecutive datacenter processing updates.
    pub min_time_between_events: f64,
    /// Whether hosts may place VM virtual PEs on already fully requested physical PEs.
    pub allow_vm_oversubscription: bool,
    /// Number of consecutive processed events without any progress after which the run is aborted.
    /// Progress is a VM or cloudlet outcome or a clock advance while some cloudlet is running.
    pub no_progress_event_limit: u64,
    /// VM allocation policy used by datacenters built from this config.
    pub allocation_policy: String,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            message_delay: 0.,
            scheduling_interval: 0.,
            min_time_between_events: DEFAULT_MIN_TIME_BETWEEN_EVENTS,
            allow_vm_oversubscription: false,
            no_progress_event_limit: 1_000_000,
            allocation_policy: "FirstFit".to_string(),
            hosts: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Creates simulation config by parsing YAML string (uses default values if some parameters are absent).
    pub fn from_yaml(yaml: &str) -> Result<Self, SimulationError> {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(yaml).map_err(|e| SimulationError::Config(format!("can't parse YAML: {}", e)))?;
        let default = Self::default();
        let config = Self {
            message_delay: raw.message_delay.unwrap_or(default.message_delay),
            scheduling_interval: raw.scheduling_interval.unwrap_or(default.scheduling_interval),
            min_time_between_events: raw.min_time_between_events.unwrap_or(default.min_time_between_events),
            allow_vm_oversubscription: raw
                .allow_vm_oversubscription
                .unwrap_or(default.allow_vm_oversubscription),
            no_progress_event_limit: raw.no_progress_event_limit.unwrap_or(default.no_progress_event_limit),
            allocation_policy: raw.allocation_policy.unwrap_or(default.allocation_policy),
            hosts: raw.hosts.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, SimulationError> {
        let yaml = std::fs::read_to_string(file_name)
            .map_err(|e| SimulationError::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml(&yaml)
    }

    /// Returns total number of hosts described by the config.
    pub fn number_of_hosts(&self) -> u32 {
        self.hosts.iter().map(|host| host.count.unwrap_or(1)).sum()
    }

    /// Period of re-evaluating cloudlets with time-dependent CPU utilization.
    ///
    /// Equals the scheduling interval if it is set, otherwise the minimal time between events.
    pub fn reevaluation_interval(&self) -> f64 {
        [self.scheduling_interval, self.min_time_between_events]
            .into_iter()
            .find(|interval| *interval > 0.)
            .unwrap_or(DEFAULT_MIN_TIME_BETWEEN_EVENTS)
    }

    fn validate(&self) -> Result<(), SimulationError> {
        let durations = [
            ("message_delay", self.message_delay),
            ("scheduling_interval", self.scheduling_interval),
            ("min_time_between_events", self.min_time_between_events),
        ];
        for (name, value) in durations {
            if value.is_nan() || value < 0. {
                return Err(SimulationError::Config(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        for host in &self.hosts {
            if host.pes == 0 || host.mips <= 0. {
                return Err(SimulationError::Config(format!(
                    "host must have at least one PE with positive MIPS: {:?}",
                    host
                )));
            }
        }
        Ok(())
    }
}
