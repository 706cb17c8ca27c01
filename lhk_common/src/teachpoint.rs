//! Calibrated reference positions (teachpoints).
//!
//! Teachpoints are recorded per arm/stage combination during calibration
//! and depend on the whole system's geometry, so they are owned outside
//! the motion kernel and injected after the topology is built. The kernel
//! only reads them through [`TeachpointSource`].
//!
//! [`TeachpointTable`] is the plain in-memory implementation, loadable
//! from the `[teachpoints]` section of the machine file:
//!
//! ```toml
//! [[teachpoints.stage]]
//! arm = 1
//! stage = 1
//! upper_left = { x = 100.0, y = 40.0, z = 55.0 }
//! lower_right = { x = 160.0, y = 120.0, z = 55.0 }
//!
//! [[teachpoints.robot]]
//! stage = 1
//! orientation = 0
//! y = 210.0
//!
//! [[teachpoints.washer]]
//! stage = 2
//! plenum = { retracted = 30.0, wash = 10.0, dry = 18.0 }
//! bath = { retracted = 0.0, wash = 22.0, dry = 12.0 }
//! ```

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

// ─── Geometry ───────────────────────────────────────────────────────

/// One recorded corner of a stage teachpoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StagePoint {
    /// Arm X [mm].
    pub x: f64,
    /// Stage Y [mm].
    pub y: f64,
    /// Arm Z [mm].
    #[serde(default)]
    pub z: f64,
    /// Stage R [mm].
    #[serde(default)]
    pub r: f64,
}

/// Upper-left / lower-right calibration of one stage under one arm.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageTeachpoint {
    /// Upper-left well position.
    pub upper_left: StagePoint,
    /// Lower-right well position.
    pub lower_right: StagePoint,
}

impl StageTeachpoint {
    /// Midpoint between the two corners, as `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.upper_left.x + self.lower_right.x) / 2.0,
            (self.upper_left.y + self.lower_right.y) / 2.0,
        )
    }
}

/// Stage position at which the plate-transfer robot reaches the stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotTeachpoint {
    /// Stage Y [mm].
    pub y: f64,
    /// Stage R [mm].
    #[serde(default)]
    pub r: f64,
}

// ─── Washer ─────────────────────────────────────────────────────────

/// Named stop of a wash-head axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasherPosition {
    /// Clear of the stage.
    Retracted,
    /// Engaged for washing.
    Wash,
    /// Engaged for drying.
    Dry,
}

impl fmt::Display for WasherPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retracted => write!(f, "retracted"),
            Self::Wash => write!(f, "wash"),
            Self::Dry => write!(f, "dry"),
        }
    }
}

impl FromStr for WasherPosition {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retracted" => Ok(Self::Retracted),
            "wash" => Ok(Self::Wash),
            "dry" => Ok(Self::Dry),
            _ => Err(format!("unknown washer position: {s:?}")),
        }
    }
}

/// Calibrated stops of one wash-head axis [mm].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WasherStops {
    /// Retracted stop.
    pub retracted: f64,
    /// Wash stop.
    pub wash: f64,
    /// Dry stop.
    pub dry: f64,
}

impl WasherStops {
    /// Position of the given stop.
    pub fn at(&self, position: WasherPosition) -> f64 {
        match position {
            WasherPosition::Retracted => self.retracted,
            WasherPosition::Wash => self.wash,
            WasherPosition::Dry => self.dry,
        }
    }
}

/// Plenum (A) and bath (B) stops of one wash station.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WasherTeachpoint {
    /// Plenum (A axis) stops; the plenum moves down to engage.
    pub plenum: WasherStops,
    /// Bath (B axis) stops; the bath moves up to engage.
    pub bath: WasherStops,
}

// ─── Lookup ─────────────────────────────────────────────────────────

/// Read-only teachpoint lookup service.
pub trait TeachpointSource: Send + Sync {
    /// Calibration of `stage_id` as seen by `arm_id`.
    fn stage_teachpoint(&self, arm_id: u8, stage_id: u8) -> Option<StageTeachpoint>;

    /// Robot hand-off position of `stage_id` for the given orientation.
    fn robot_teachpoint(&self, stage_id: u8, orientation: u8) -> Option<RobotTeachpoint>;

    /// Wash-head stops of `stage_id`.
    fn washer_teachpoint(&self, stage_id: u8) -> Option<WasherTeachpoint>;
}

/// `[[teachpoints.stage]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    /// Arm id (1-based).
    pub arm: u8,
    /// Stage id (1-based).
    pub stage: u8,
    /// Upper-left corner.
    pub upper_left: StagePoint,
    /// Lower-right corner.
    pub lower_right: StagePoint,
}

/// `[[teachpoints.robot]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotEntry {
    /// Stage id (1-based).
    pub stage: u8,
    /// Robot approach orientation.
    #[serde(default)]
    pub orientation: u8,
    /// Stage Y [mm].
    pub y: f64,
    /// Stage R [mm].
    #[serde(default)]
    pub r: f64,
}

/// `[[teachpoints.washer]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasherEntry {
    /// Stage id of the wash station (1-based).
    pub stage: u8,
    /// Plenum stops.
    pub plenum: WasherStops,
    /// Bath stops.
    pub bath: WasherStops,
}

/// In-memory teachpoint table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeachpointTable {
    /// Stage calibrations.
    #[serde(default)]
    pub stage: Vec<StageEntry>,
    /// Robot hand-off positions.
    #[serde(default)]
    pub robot: Vec<RobotEntry>,
    /// Wash-head stops.
    #[serde(default)]
    pub washer: Vec<WasherEntry>,
}

impl TeachpointTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) a stage calibration.
    pub fn set_stage(&mut self, arm: u8, stage: u8, teachpoint: StageTeachpoint) {
        self.stage.retain(|e| !(e.arm == arm && e.stage == stage));
        self.stage.push(StageEntry {
            arm,
            stage,
            upper_left: teachpoint.upper_left,
            lower_right: teachpoint.lower_right,
        });
    }

    /// Record (or replace) a robot hand-off position.
    pub fn set_robot(&mut self, stage: u8, orientation: u8, teachpoint: RobotTeachpoint) {
        self.robot
            .retain(|e| !(e.stage == stage && e.orientation == orientation));
        self.robot.push(RobotEntry {
            stage,
            orientation,
            y: teachpoint.y,
            r: teachpoint.r,
        });
    }

    /// Record (or replace) wash-head stops.
    pub fn set_washer(&mut self, stage: u8, teachpoint: WasherTeachpoint) {
        self.washer.retain(|e| e.stage != stage);
        self.washer.push(WasherEntry {
            stage,
            plenum: teachpoint.plenum,
            bath: teachpoint.bath,
        });
    }
}

impl TeachpointSource for TeachpointTable {
    fn stage_teachpoint(&self, arm_id: u8, stage_id: u8) -> Option<StageTeachpoint> {
        self.stage
            .iter()
            .find(|e| e.arm == arm_id && e.stage == stage_id)
            .map(|e| StageTeachpoint {
                upper_left: e.upper_left,
                lower_right: e.lower_right,
            })
    }

    fn robot_teachpoint(&self, stage_id: u8, orientation: u8) -> Option<RobotTeachpoint> {
        self.robot
            .iter()
            .find(|e| e.stage == stage_id && e.orientation == orientation)
            .map(|e| RobotTeachpoint { y: e.y, r: e.r })
    }

    fn washer_teachpoint(&self, stage_id: u8) -> Option<WasherTeachpoint> {
        self.washer
            .iter()
            .find(|e| e.stage == stage_id)
            .map(|e| WasherTeachpoint {
                plenum: e.plenum,
                bath: e.bath,
            })
    }
}
