//! Helpers for parsing component definitions like `Constant[utilization=0.5]` in config values.

use std::collections::HashMap;
use std::str::FromStr;

use crate::core::error::SimulationError;

/// Splits config value string into name and options parts.
///
/// For example, `BestFit[metric=ram]` is split into name `BestFit` and options string `metric=ram`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((name, rest)) => (name.trim().to_string(), Some(rest.trim_end().trim_end_matches(']').to_string())),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string from config value into a map with option names and values.
///
/// # Examples
///
/// ```rust
/// use cloudsim_iaas::core::config::options::parse_options;
///
/// let options = parse_options("utilization=0.8,seed=something");
/// assert_eq!(options.get("utilization").unwrap(), "0.8");
/// assert_eq!(options.get("seed").unwrap(), "something");
/// assert_eq!(options.get("other"), None);
/// ```
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    options_str
        .split(',')
        .filter_map(|option| option.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Reads a required typed option, reporting missing or malformed values as config errors.
pub fn parse_option<T: FromStr>(
    options: &HashMap<String, String>,
    name: &str,
    config_str: &str,
) -> Result<T, SimulationError> {
    let value = options
        .get(name)
        .ok_or_else(|| SimulationError::Config(format!("option {} is missing in {}", name, config_str)))?;
    value
        .parse()
        .map_err(|_| SimulationError::Config(format!("can't parse option {}={} in {}", name, value, config_str)))
}
