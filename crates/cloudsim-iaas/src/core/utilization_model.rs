//! Resource utilization models of cloudlets.

use dyn_clone::{clone_trait_object, DynClone};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::config::options::{parse_config_value, parse_option, parse_options};
use crate::core::error::SimulationError;

/// A utilization model defines which fraction of the requested resource a cloudlet uses at the moment.
///
/// `time` is the current simulation time and `time_from_start` is the time passed since the cloudlet start.
/// Returned values are expected to lie in [0, 1].
pub trait UtilizationModel: DynClone {
    fn utilization(&self, time: f64, time_from_start: f64) -> f64;

    /// Whether the utilization never changes over time.
    ///
    /// Processing of cloudlets with non-constant CPU utilization is re-evaluated periodically.
    fn is_constant(&self) -> bool {
        false
    }
}

clone_trait_object!(UtilizationModel);

/// The cloudlet always uses the whole requested resource.
#[derive(Clone, Default)]
pub struct FullUtilizationModel;

impl FullUtilizationModel {
    pub fn new() -> Self {
        Self {}
    }
}

impl UtilizationModel for FullUtilizationModel {
    fn utilization(&self, _time: f64, _time_from_start: f64) -> f64 {
        1.
    }

    fn is_constant(&self) -> bool {
        true
    }
}

/// Constant fraction of the requested resource.
#[derive(Clone)]
pub struct ConstantUtilizationModel {
    utilization: f64,
}

impl ConstantUtilizationModel {
    pub fn new(utilization: f64) -> Self {
        Self {
            utilization: utilization.clamp(0., 1.),
        }
    }
}

impl UtilizationModel for ConstantUtilizationModel {
    fn utilization(&self, _time: f64, _time_from_start: f64) -> f64 {
        self.utilization
    }

    fn is_constant(&self) -> bool {
        true
    }
}

/// Pseudo-random utilization which depends only on the seed and the queried time,
/// so repeated queries and repeated runs return the same values.
#[derive(Clone)]
pub struct StochasticUtilizationModel {
    seed: u64,
}

impl StochasticUtilizationModel {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl UtilizationModel for StochasticUtilizationModel {
    fn utilization(&self, time: f64, _time_from_start: f64) -> f64 {
        let mut rand = Pcg64::seed_from_u64(self.seed ^ time.to_bits());
        rand.gen_range(0.0..=1.0)
    }
}

/// Creates utilization model from a config string such as `Full`, `Constant[utilization=0.5]` or
/// `Stochastic[seed=123]`.
pub fn utilization_model_resolver(config_str: &str) -> Result<Box<dyn UtilizationModel>, SimulationError> {
    let (model_name, options) = parse_config_value(config_str);
    let options = parse_options(&options.unwrap_or_default());
    match model_name.as_str() {
        "Full" => Ok(Box::new(FullUtilizationModel::new())),
        "Constant" => Ok(Box::new(ConstantUtilizationModel::new(parse_option(
            &options,
            "utilization",
            config_str,
        )?))),
        "Stochastic" => Ok(Box::new(StochasticUtilizationModel::new(parse_option(
            &options, "seed", config_str,
        )?))),
        _ => Err(SimulationError::Config(format!("unknown utilization model: {}", config_str))),
    }
}
