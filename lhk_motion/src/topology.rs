//! Topology: the owning registry of arms and stages.
//!
//! Built once from a [`TopologyConfig`] and the id → axis map. Ids are
//! assigned 1-based in insertion order, one sequence for arms and one
//! for stages (wash stations included). Wash stations are additionally
//! listed in their own view.
//!
//! Construction either yields a complete topology or fails on the first
//! component that cannot be built; nothing is left half-bound.

use crate::arm::Arm;
use crate::error::{MotionError, MotionResult};
use crate::group::MotionGroup;
use crate::permit::HomingPermits;
use crate::stage::{Plate, Stage, StageMotion};
use crate::wash_station::{FluidicsConfig, WashStation};
use lhk_common::hal::{Axis, OutputPort};
use lhk_common::teachpoint::TeachpointSource;
use lhk_hal::AxisMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Upper-left and lower-right spacings may disagree by this much [mm].
const ARM_SPACING_TOLERANCE_MM: f64 = 1.0;

// ─── Configuration ──────────────────────────────────────────────────

fn default_available() -> bool {
    true
}

/// `[[topology.arms]]` entry: axis ids bound to X, Z and W.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    /// X axis id.
    pub x: u8,
    /// Z axis id.
    pub z: u8,
    /// W axis id.
    pub w: u8,
    /// Plunger shuck offset [mm].
    #[serde(default)]
    pub w_shuck_offset_mm: f64,
    /// Whether the arm may be used.
    #[serde(default = "default_available")]
    pub available: bool,
}

/// `[[topology.stages]]` entry.
///
/// # TOML Example
///
/// ```toml
/// [[topology.stages]]
/// kind = "stage"
/// y = 21
/// r = 23
///
/// [[topology.stages]]
/// kind = "wash_station"
/// y = 22
/// a = 26
/// b = 27
/// fluidics = { bath_water = 0, plenum_water = 1, overflow_exhaust = 2, vacuum = 3, air = 4 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    /// Plain Y/R stage.
    Stage {
        /// Y axis id.
        y: u8,
        /// R axis id, when fitted.
        #[serde(default)]
        r: Option<u8>,
    },
    /// Stage with a wash head.
    WashStation {
        /// Y axis id.
        y: u8,
        /// Plenum axis id.
        a: u8,
        /// Bath axis id.
        b: u8,
        /// Fluidic output bits.
        fluidics: FluidicsConfig,
    },
}

/// `[topology]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Arms in id order.
    #[serde(default)]
    pub arms: Vec<ArmConfig>,
    /// Stages and wash stations in id order.
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

// ─── Topology ───────────────────────────────────────────────────────

/// Registry of every arm and stage of the instrument.
pub struct Topology {
    arms: Vec<Arc<Arm>>,
    stages: Vec<Arc<dyn StageMotion>>,
    wash_stations: Vec<Arc<WashStation>>,
    x_homing: Arc<HomingPermits>,
}

impl fmt::Debug for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topology")
            .field("arms", &self.arms.len())
            .field("stages", &self.stages.len())
            .field("wash_stations", &self.wash_stations.len())
            .field("x_homing", &self.x_homing)
            .finish()
    }
}

fn resolve(axes: &AxisMap, component: &str, axis_id: u8) -> MotionResult<Arc<dyn Axis>> {
    axes.get(&axis_id)
        .cloned()
        .ok_or_else(|| MotionError::MissingAxis {
            component: component.to_string(),
            axis_id,
        })
}

fn next_id(index: usize, kind: &str) -> MotionResult<u8> {
    u8::try_from(index + 1)
        .map_err(|_| MotionError::InvalidArgument(format!("too many {kind}s in topology")))
}

impl Topology {
    /// Build every arm and stage.
    ///
    /// `io` is shared by all wash stations; `x_homing_permits` caps
    /// concurrent X homes across all arms.
    ///
    /// # Errors
    /// - `MotionError::MissingAxis` naming the component whose axis is absent
    /// - `MotionError::InvalidFluidics` for colliding fluidic bits
    pub fn build(
        config: &TopologyConfig,
        axes: &AxisMap,
        io: Arc<dyn OutputPort>,
        x_homing_permits: usize,
    ) -> MotionResult<Self> {
        let x_homing = Arc::new(HomingPermits::new(x_homing_permits));

        let mut arms = Vec::with_capacity(config.arms.len());
        for (index, arm) in config.arms.iter().enumerate() {
            let id = next_id(index, "arm")?;
            let component = format!("arm {id}");
            arms.push(Arc::new(Arm::new(
                id,
                resolve(axes, &component, arm.x)?,
                resolve(axes, &component, arm.z)?,
                resolve(axes, &component, arm.w)?,
                arm.w_shuck_offset_mm,
                arm.available,
                Arc::clone(&x_homing),
            )?));
        }

        let mut stages: Vec<Arc<dyn StageMotion>> = Vec::with_capacity(config.stages.len());
        let mut wash_stations = Vec::new();
        for (index, stage) in config.stages.iter().enumerate() {
            let id = next_id(index, "stage")?;
            let component = format!("stage {id}");
            match stage {
                StageConfig::Stage { y, r } => {
                    let r = r.map(|r| resolve(axes, &component, r)).transpose()?;
                    stages.push(Arc::new(Stage::new(id, resolve(axes, &component, *y)?, r)?));
                }
                StageConfig::WashStation { y, a, b, fluidics } => {
                    let station = Arc::new(WashStation::new(
                        id,
                        resolve(axes, &component, *y)?,
                        resolve(axes, &component, *a)?,
                        resolve(axes, &component, *b)?,
                        Arc::clone(&io),
                        *fluidics,
                    )?);
                    stages.push(Arc::clone(&station) as Arc<dyn StageMotion>);
                    wash_stations.push(station);
                }
            }
        }

        let topology = Self {
            arms,
            stages,
            wash_stations,
            x_homing,
        };
        topology.refresh_all()?;
        info!(
            "Topology built: {} arms ({} available), {} stages ({} wash stations)",
            topology.arms.len(),
            topology.available_arms().count(),
            topology.stages.len(),
            topology.wash_stations.len()
        );
        Ok(topology)
    }

    // ─── Lookup ─────────────────────────────────────────────────────

    /// Every arm in id order.
    pub fn arms(&self) -> &[Arc<Arm>] {
        &self.arms
    }

    /// Arm by 1-based id.
    pub fn arm(&self, id: u8) -> Option<&Arc<Arm>> {
        self.arms.get(usize::from(id).checked_sub(1)?)
    }

    /// Arms flagged available.
    pub fn available_arms(&self) -> impl Iterator<Item = &Arc<Arm>> {
        self.arms.iter().filter(|arm| arm.is_available())
    }

    /// Every stage, wash stations included, in id order.
    pub fn stages(&self) -> &[Arc<dyn StageMotion>] {
        &self.stages
    }

    /// Stage by 1-based id.
    pub fn stage(&self, id: u8) -> Option<&Arc<dyn StageMotion>> {
        self.stages.get(usize::from(id).checked_sub(1)?)
    }

    /// Wash stations only.
    pub fn wash_stations(&self) -> &[Arc<WashStation>] {
        &self.wash_stations
    }

    /// Wash station by stage id.
    pub fn wash_station(&self, stage_id: u8) -> Option<&Arc<WashStation>> {
        self.wash_stations
            .iter()
            .find(|station| station.id() == stage_id)
    }

    /// Group driving `role`: X/Z/W on the arm, Y/R on the stage, A/B on
    /// the wash station. `None` if the group does not exist or does not
    /// bind the role.
    pub fn group_for(&self, arm_id: u8, stage_id: u8, role: &str) -> Option<&dyn MotionGroup> {
        let group: &dyn MotionGroup = match role {
            "X" | "Z" | "W" => self.arm(arm_id)?.as_ref(),
            "Y" | "R" => self.stage(stage_id)?.as_motion_group(),
            "A" | "B" => self.wash_station(stage_id)?.as_ref(),
            _ => return None,
        };
        group.group().axis(role).is_ok().then_some(group)
    }

    /// Stage currently holding `plate`.
    pub fn stage_with_plate(&self, plate: &Plate) -> Option<&Arc<dyn StageMotion>> {
        self.stages
            .iter()
            .find(|stage| stage.stage().plate().as_ref() == Some(plate))
    }

    /// Shared X-homing permits.
    pub fn x_homing(&self) -> &Arc<HomingPermits> {
        &self.x_homing
    }

    // ─── Aggregate Control ──────────────────────────────────────────

    /// Whether every available arm and every stage is homed.
    pub fn is_homed(&self, use_cache: bool) -> MotionResult<bool> {
        for arm in self.available_arms() {
            if !arm.is_homed(use_cache)? {
                return Ok(false);
            }
        }
        for stage in &self.stages {
            if !stage.is_homed(use_cache)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Reset every available arm and every stage.
    pub fn reset(&self) -> MotionResult<()> {
        for arm in self.available_arms() {
            arm.reset()?;
        }
        for stage in &self.stages {
            stage.reset()?;
        }
        Ok(())
    }

    /// Refresh the status snapshot of every group.
    pub fn refresh_all(&self) -> MotionResult<()> {
        for arm in &self.arms {
            arm.refresh_status()?;
        }
        for stage in &self.stages {
            stage.refresh_status()?;
        }
        Ok(())
    }

    /// Inject the teachpoint lookup into every stage.
    pub fn set_teachpoints(&self, teachpoints: Arc<dyn TeachpointSource>) {
        for stage in &self.stages {
            stage.stage().set_teachpoints(Arc::clone(&teachpoints));
        }
    }

    /// Y separation of two arms as calibrated on `stage_id` [mm].
    ///
    /// Mean of the upper-left and lower-right separations.
    pub fn arm_spacing(&self, arm1: u8, arm2: u8, stage_id: u8) -> MotionResult<f64> {
        let stage = self
            .stage(stage_id)
            .ok_or_else(|| MotionError::InvalidArgument(format!("no stage {stage_id}")))?
            .stage();
        let first = stage.stage_teachpoint(arm1)?;
        let second = stage.stage_teachpoint(arm2)?;

        let upper_left = (first.upper_left.y - second.upper_left.y).abs();
        let lower_right = (first.lower_right.y - second.lower_right.y).abs();
        if (upper_left - lower_right).abs() > ARM_SPACING_TOLERANCE_MM {
            warn!(
                "Arms {} and {} on stage {}: upper-left spacing {:.3}mm, lower-right {:.3}mm",
                arm1, arm2, stage_id, upper_left, lower_right
            );
        }
        Ok((upper_left + lower_right) / 2.0)
    }
}
