//! Prelude module for common re-exports.
//!
//! ```rust
//! use lhk_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Hardware Capabilities ──────────────────────────────────────────
pub use crate::hal::{
    Axis, AxisFault, AxisSettings, IoFault, MoveParams, OutputPort, TorqueLimitedMove,
};

// ─── Teachpoints ────────────────────────────────────────────────────
pub use crate::teachpoint::{
    RobotTeachpoint, StagePoint, StageTeachpoint, TeachpointSource, TeachpointTable,
    WasherPosition, WasherStops, WasherTeachpoint,
};

/// Default homing budget as Duration.
pub const DEFAULT_HOME_TIMEOUT: Duration =
    Duration::from_secs(crate::hal::consts::DEFAULT_HOME_TIMEOUT_S);
