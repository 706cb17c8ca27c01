//! Plate-positioning stage (Y/R).

use crate::error::{MotionError, MotionResult};
use crate::group::{AxisGroup, MotionGroup};
use crate::wash_station::WashStation;
use lhk_common::hal::{Axis, MoveParams};
use lhk_common::teachpoint::{RobotTeachpoint, StageTeachpoint, TeachpointSource};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Labware sitting on a stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plate {
    /// Barcode or user-assigned name.
    pub name: String,
    /// Labware type.
    pub labware: String,
}

impl Plate {
    /// Plate `name` of type `labware`.
    pub fn new(name: impl Into<String>, labware: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labware: labware.into(),
        }
    }
}

/// Behaviour of anything that positions labware along Y (and R).
pub trait StageMotion: MotionGroup {
    /// Stage part of the implementor.
    fn stage(&self) -> &Stage;

    /// The implementor as a plain motion group.
    fn as_motion_group(&self) -> &dyn MotionGroup;

    /// Move to `y` [mm] and `r` [mm], returning once arrived.
    fn move_to(&self, y: f64, r: f64) -> MotionResult<()>;

    /// Move to where the plate-transfer robot reaches the stage.
    fn move_to_robot_teachpoint(&self, orientation: u8) -> MotionResult<()> {
        let teachpoint = self.stage().robot_teachpoint(orientation)?;
        self.move_to(teachpoint.y, teachpoint.r)
    }

    /// The implementor as a wash station, if it is one.
    fn as_wash_station(&self) -> Option<&WashStation> {
        None
    }
}

/// Y/R stage.
///
/// The R axis is optional: wash stations carry a stage without one.
pub struct Stage {
    group: AxisGroup,
    y: Arc<dyn Axis>,
    r: Option<Arc<dyn Axis>>,
    plate: Mutex<Option<Plate>>,
    teachpoints: RwLock<Option<Arc<dyn TeachpointSource>>>,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("group", &self.group)
            .field("plate", &*self.plate.lock())
            .finish()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group.name())
    }
}

impl Stage {
    /// Stage with a Y and an optional R axis.
    pub fn new(id: u8, y: Arc<dyn Axis>, r: Option<Arc<dyn Axis>>) -> MotionResult<Self> {
        Self::named(id, format!("Stage {id}"), y, r)
    }

    pub(crate) fn named(
        id: u8,
        name: String,
        y: Arc<dyn Axis>,
        r: Option<Arc<dyn Axis>>,
    ) -> MotionResult<Self> {
        let mut group = AxisGroup::new(id, name);
        group.add_axis("Y", Arc::clone(&y))?;
        if let Some(r) = &r {
            group.add_axis("R", Arc::clone(r))?;
        }
        Ok(Self {
            group,
            y,
            r,
            plate: Mutex::new(None),
            teachpoints: RwLock::new(None),
        })
    }

    pub(crate) fn group_mut(&mut self) -> &mut AxisGroup {
        &mut self.group
    }

    /// Y axis.
    pub fn y(&self) -> &Arc<dyn Axis> {
        &self.y
    }

    /// R axis, when fitted.
    pub fn r(&self) -> Option<&Arc<dyn Axis>> {
        self.r.as_ref()
    }

    /// Current Y [mm].
    pub fn y_position(&self) -> MotionResult<f64> {
        Ok(self.y.position_mm()?)
    }

    /// Current R [mm]; 0 without an R axis.
    pub fn r_position(&self) -> MotionResult<f64> {
        match &self.r {
            Some(r) => Ok(r.position_mm()?),
            None => Ok(0.0),
        }
    }

    // ─── Plate ──────────────────────────────────────────────────────

    /// Plate currently on the stage.
    pub fn plate(&self) -> Option<Plate> {
        self.plate.lock().clone()
    }

    /// Record a plate on the stage.
    pub fn set_plate(&self, plate: Plate) {
        debug!("{}: plate {} placed", self, plate.name);
        *self.plate.lock() = Some(plate);
    }

    /// Forget the plate, returning it.
    pub fn clear_plate(&self) -> Option<Plate> {
        self.plate.lock().take()
    }

    // ─── Teachpoints ────────────────────────────────────────────────

    /// Inject the teachpoint lookup.
    pub fn set_teachpoints(&self, teachpoints: Arc<dyn TeachpointSource>) {
        *self.teachpoints.write() = Some(teachpoints);
    }

    /// Teachpoint lookup, once injected.
    pub fn teachpoints(&self) -> MotionResult<Arc<dyn TeachpointSource>> {
        self.teachpoints
            .read()
            .clone()
            .ok_or(MotionError::TeachpointsUnavailable {
                stage: self.group.id(),
            })
    }

    /// Calibration of this stage under `arm_id`.
    pub fn stage_teachpoint(&self, arm_id: u8) -> MotionResult<StageTeachpoint> {
        self.teachpoints()?
            .stage_teachpoint(arm_id, self.group.id())
            .ok_or_else(|| {
                MotionError::TeachpointMissing(format!(
                    "arm {arm_id} on stage {}",
                    self.group.id()
                ))
            })
    }

    /// Robot hand-off position for `orientation`.
    pub fn robot_teachpoint(&self, orientation: u8) -> MotionResult<RobotTeachpoint> {
        self.teachpoints()?
            .robot_teachpoint(self.group.id(), orientation)
            .ok_or_else(|| {
                MotionError::TeachpointMissing(format!(
                    "robot orientation {orientation} on stage {}",
                    self.group.id()
                ))
            })
    }

    /// Midpoint of the upper-left and lower-right teachpoints seen by `arm_id`.
    pub fn center_position(&self, arm_id: u8) -> MotionResult<(f64, f64)> {
        Ok(self.stage_teachpoint(arm_id)?.center())
    }

    /// Start Y (and R), then wait on both.
    fn move_yr(&self, y: f64, r: f64) -> MotionResult<()> {
        let start = Instant::now();
        self.y.move_absolute(y, MoveParams::new().wait(false))?;
        if let Some(axis) = &self.r {
            axis.move_absolute(r, MoveParams::new().wait(false))?;
        }
        self.y.move_absolute(y, MoveParams::new())?;
        if let Some(axis) = &self.r {
            axis.move_absolute(r, MoveParams::new())?;
        }
        debug!(
            "{}: move to Y={:.3} R={:.3} took {}ms",
            self,
            y,
            r,
            start.elapsed().as_millis()
        );
        Ok(())
    }
}

impl MotionGroup for Stage {
    fn group(&self) -> &AxisGroup {
        &self.group
    }
}

impl StageMotion for Stage {
    fn stage(&self) -> &Stage {
        self
    }

    fn as_motion_group(&self) -> &dyn MotionGroup {
        self
    }

    fn move_to(&self, y: f64, r: f64) -> MotionResult<()> {
        self.move_yr(y, r)
    }
}
