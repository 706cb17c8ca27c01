//! Axis bank built from configuration.
//!
//! Turns the `[[axes]]` entries of the machine file into the id → axis map
//! the motion kernel is constructed from. Built once at startup and passed
//! by value; there is no global registry.

use crate::drivers::simulation::SimAxis;
use crate::error::HalError;
use lhk_common::hal::consts::MAX_AXES;
use lhk_common::hal::{Axis, AxisSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Axis id → shared axis handle.
pub type AxisMap = BTreeMap<u8, Arc<dyn Axis>>;

/// One `[[axes]]` entry.
///
/// # TOML Example
///
/// ```toml
/// [[axes]]
/// id = 12
/// name = "z1"
/// home_time_ms = 800
/// settings = { velocity = 300.0, acceleration = 2000.0, min_limit = 0.0, max_limit = 120.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimAxisConfig {
    /// Axis id (1-based, unique).
    pub id: u8,
    /// Axis name.
    pub name: String,
    /// Motion limits and calibration.
    pub settings: AxisSettings,
    /// Simulated homing time [ms].
    #[serde(default)]
    pub home_time_ms: u64,
    /// Factor applied to simulated move times (0 = instant).
    #[serde(default)]
    pub time_scale: f64,
    /// Position at start-up [mm].
    #[serde(default)]
    pub initial_position: f64,
    /// Start already homed.
    #[serde(default)]
    pub homed: bool,
}

/// Validated set of simulated axes.
#[derive(Debug, Default)]
pub struct AxisBank {
    sims: BTreeMap<u8, Arc<SimAxis>>,
}

impl AxisBank {
    /// Build the bank.
    ///
    /// # Errors
    /// - `HalError::InvalidSettings` for id 0 or settings failing validation
    /// - `HalError::DuplicateAxis` when two entries share an id
    /// - `HalError::ConfigError` when more than [`MAX_AXES`] axes are defined
    pub fn from_configs(configs: &[SimAxisConfig]) -> Result<Self, HalError> {
        if configs.len() > MAX_AXES {
            return Err(HalError::ConfigError(format!(
                "{} axes defined, at most {MAX_AXES} supported",
                configs.len()
            )));
        }

        let mut sims = BTreeMap::new();
        for config in configs {
            if config.id == 0 {
                return Err(HalError::InvalidSettings {
                    axis_id: 0,
                    reason: "axis ids are 1-based".to_string(),
                });
            }
            config
                .settings
                .validate()
                .map_err(|reason| HalError::InvalidSettings {
                    axis_id: config.id,
                    reason,
                })?;
            if sims.contains_key(&config.id) {
                return Err(HalError::DuplicateAxis(config.id));
            }

            let axis = SimAxis::new(config.id, config.name.clone(), config.settings.clone())
                .with_home_duration(Duration::from_millis(config.home_time_ms))
                .with_time_scale(config.time_scale);
            axis.set_position(config.initial_position);
            axis.set_homed(config.homed);
            debug!("Axis {} ({}) created", config.id, config.name);
            sims.insert(config.id, Arc::new(axis));
        }

        info!("Axis bank ready with {} axes", sims.len());
        Ok(Self { sims })
    }

    /// Axes as the kernel sees them.
    pub fn axes(&self) -> AxisMap {
        self.sims
            .iter()
            .map(|(id, sim)| (*id, Arc::clone(sim) as Arc<dyn Axis>))
            .collect()
    }

    /// Concrete simulator for `id`, for scripting faults and inspecting journals.
    pub fn sim(&self, id: u8) -> Option<Arc<SimAxis>> {
        self.sims.get(&id).cloned()
    }

    /// Number of axes.
    pub fn len(&self) -> usize {
        self.sims.len()
    }

    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.sims.is_empty()
    }
}
