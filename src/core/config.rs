use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{NvChartError, Result};

/// Collector configuration, fixed once the plugin is initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Backfill missing values from the nvidia-settings text report
    pub legacy: bool,
    /// Memory clock multiplier; 2 reports the effective DDR clock
    pub mem_factor: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            legacy: false,
            mem_factor: 1,
        }
    }
}

impl CollectorConfig {
    pub const LEGACY_KEY: &'static str = "legacy";
    pub const MEM_FACTOR_KEY: &'static str = "nvMemFactor";

    /// Build from the host configuration mapping.
    ///
    /// Never fails: unknown or malformed values fall back to the defaults
    /// with a logged warning.
    pub fn from_mapping(map: &Map<String, Value>) -> Self {
        let legacy = match map.get(Self::LEGACY_KEY) {
            None | Some(Value::Null) => {
                log::info!("No legacy mode specified. Setting to 'false'");
                false
            }
            Some(Value::String(s)) if s.is_empty() => {
                log::info!("No legacy mode specified. Setting to 'false'");
                false
            }
            Some(Value::Bool(flag)) => {
                if *flag {
                    log::info!("Legacy mode set to true");
                }
                *flag
            }
            Some(other) => {
                log::warn!("'legacy' must be a boolean, got {}. Setting to 'false'", other);
                false
            }
        };

        let mem_factor = match map.get(Self::MEM_FACTOR_KEY) {
            None | Some(Value::Null) => {
                log::info!("No 'nvMemFactor' configured. Setting to 1");
                1
            }
            Some(value) => match parse_factor(value) {
                Some(factor) => {
                    log::info!("'nvMemFactor' set to: {}", factor);
                    factor
                }
                None => {
                    log::warn!(
                        "nvMemFactor in config is not a positive integer ({}). Setting 'nvMemFactor' to 1",
                        value
                    );
                    1
                }
            },
        };

        Self { legacy, mem_factor }
    }

    /// Load the mapping from a JSON object file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&data)?;
        match value {
            Value::Object(map) => Ok(Self::from_mapping(&map)),
            _ => Err(NvChartError::config(format!(
                "{} must contain a JSON object",
                path.display()
            ))),
        }
    }

    pub fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn with_mem_factor(mut self, mem_factor: u32) -> Self {
        self.mem_factor = mem_factor.max(1);
        self
    }
}

fn parse_factor(value: &Value) -> Option<u32> {
    let factor = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(factor).ok().filter(|f| *f > 0)
}
