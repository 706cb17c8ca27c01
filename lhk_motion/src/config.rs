//! Machine file: one TOML document describing the whole instrument.
//!
//! ```toml
//! [shared]
//! service_name = "lhk-bench-01"
//! log_level = "info"
//!
//! [homing]
//! timeout_s = 30
//! x_concurrency = 2
//!
//! [io]
//! output_count = 16
//!
//! [[axes]]
//! id = 1
//! name = "x1"
//! settings = { velocity = 800.0, acceleration = 4000.0, min_limit = 0.0, max_limit = 600.0 }
//!
//! [[topology.arms]]
//! x = 1
//! z = 2
//! w = 3
//!
//! [[topology.stages]]
//! kind = "stage"
//! y = 21
//! r = 23
//!
//! [[teachpoints.robot]]
//! stage = 1
//! y = 210.0
//! ```
//!
//! Parsing goes through [`ConfigLoader`]; [`MachineConfig::validate`]
//! then checks what serde cannot.

use crate::topology::TopologyConfig;
use lhk_common::config::{ConfigError, ConfigLoader, SharedConfig};
use lhk_common::hal::consts::{DEFAULT_HOME_TIMEOUT_S, DEFAULT_X_HOMING_PERMITS};
use lhk_common::teachpoint::TeachpointTable;
use lhk_hal::SimAxisConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

// ─── Sections ───────────────────────────────────────────────────────

fn default_timeout_s() -> u64 {
    DEFAULT_HOME_TIMEOUT_S
}

fn default_x_concurrency() -> usize {
    DEFAULT_X_HOMING_PERMITS
}

fn default_output_count() -> usize {
    16
}

/// `[homing]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomingConfig {
    /// Budget of one group home, shared by its axes [s].
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    /// Maximum concurrent X homes across all arms.
    #[serde(default = "default_x_concurrency")]
    pub x_concurrency: usize,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            timeout_s: default_timeout_s(),
            x_concurrency: default_x_concurrency(),
        }
    }
}

/// `[io]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    /// Number of digital outputs on the fluidics port.
    #[serde(default = "default_output_count")]
    pub output_count: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            output_count: default_output_count(),
        }
    }
}

// ─── Machine File ───────────────────────────────────────────────────

/// Complete machine description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Service name and log level.
    pub shared: SharedConfig,
    /// Homing budget and X concurrency.
    #[serde(default)]
    pub homing: HomingConfig,
    /// Simulated axes.
    #[serde(default)]
    pub axes: Vec<SimAxisConfig>,
    /// Fluidics output port.
    #[serde(default)]
    pub io: IoConfig,
    /// Arms and stages.
    #[serde(default)]
    pub topology: TopologyConfig,
    /// Calibration.
    #[serde(default)]
    pub teachpoints: TeachpointTable,
}

impl MachineConfig {
    /// Semantic checks.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` for a blank service name, duplicate
    /// axis ids or a zero X-homing concurrency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let mut seen = HashSet::new();
        for axis in &self.axes {
            if !seen.insert(axis.id) {
                return Err(ConfigError::ValidationError(format!(
                    "axis id {} defined more than once",
                    axis.id
                )));
            }
        }

        if self.homing.x_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "homing.x_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Homing budget as a [`Duration`].
    pub fn home_timeout(&self) -> Duration {
        Duration::from_secs(self.homing.timeout_s)
    }
}

/// Load and validate a machine file.
pub fn load_config(path: &Path) -> Result<MachineConfig, ConfigError> {
    let config = MachineConfig::load(path)?;
    config.validate()?;
    Ok(config)
}
