//! Tip-washing station.
//!
//! A stage (Y only) carrying a wash head: the plenum (A) comes down from
//! above and the bath (B) comes up from below. With either one engaged
//! the stage must not leave the wash position, and neither may engage
//! unless the stage sits at the wash position or in the safe zone.
//!
//! ```text
//!            A (plenum)  ↓ engage
//!   ═════ stage (Y) ═════
//!            B (bath)    ↑ engage
//! ```
//!
//! The station also switches five fluidic lines through an output port
//! and owns the tip grid it serves tips from.

use crate::error::{MotionError, MotionResult};
use crate::group::{AxisGroup, MotionGroup};
use crate::stage::{Stage, StageMotion};
use crate::tip_grid::{SlotIndex, TipGrid};
use lhk_common::hal::{Axis, MoveParams, OutputPort};
use lhk_common::prelude::DEFAULT_HOME_TIMEOUT;
use lhk_common::teachpoint::{WasherPosition, WasherTeachpoint};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Stage Y above which the wash head can never hit anything [mm].
pub const Y_SAFE_MM: f64 = 170.0;

/// Tolerance on "retracted" and "at wash position" [mm].
pub const POSITION_TOLERANCE_MM: f64 = 0.5;

/// Slowest accepted washer speed factor.
pub const MIN_SPEED_FACTOR: f64 = 0.001;

// ─── Lifecycle ──────────────────────────────────────────────────────

/// Lifecycle of a wash station, driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WashStationState {
    /// Not homed yet.
    #[default]
    Uninitialized,
    /// Handing out clean tips.
    ServingTips,
    /// Running a wash cycle.
    Washing,
    /// Taken out of service.
    OutOfService,
}

// ─── Fluidics ───────────────────────────────────────────────────────

/// Output bit of each fluidic line.
///
/// # TOML Example
///
/// ```toml
/// fluidics = { bath_water = 0, plenum_water = 1, overflow_exhaust = 2, vacuum = 3, air = 4 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidicsConfig {
    /// Bath water valve.
    pub bath_water: usize,
    /// Plenum water valve.
    pub plenum_water: usize,
    /// Overflow exhaust.
    pub overflow_exhaust: usize,
    /// Vacuum.
    pub vacuum: usize,
    /// Drying air.
    pub air: usize,
}

impl FluidicsConfig {
    fn lines(&self) -> [(&'static str, usize); 5] {
        [
            ("bath_water", self.bath_water),
            ("plenum_water", self.plenum_water),
            ("overflow_exhaust", self.overflow_exhaust),
            ("vacuum", self.vacuum),
            ("air", self.air),
        ]
    }

    /// Check that all five bits are pairwise distinct.
    pub fn validate(&self) -> Result<(), String> {
        let lines = self.lines();
        for (i, (name, bit)) in lines.iter().enumerate() {
            if let Some((other, _)) = lines[i + 1..].iter().find(|(_, b)| b == bit) {
                return Err(format!("{name} and {other} share output bit {bit}"));
            }
        }
        Ok(())
    }
}

// ─── Wash Station ───────────────────────────────────────────────────

/// Stage with a plenum/bath wash head, fluidics and a tip grid.
pub struct WashStation {
    stage: Stage,
    a: Arc<dyn Axis>,
    b: Arc<dyn Axis>,
    io: Arc<dyn OutputPort>,
    fluidics: FluidicsConfig,
    tip_grid: TipGrid,
    state: Mutex<WashStationState>,
}

impl fmt::Debug for WashStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WashStation")
            .field("stage", &self.stage)
            .field("fluidics", &self.fluidics)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl fmt::Display for WashStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wash station {}", self.stage.group().id())
    }
}

impl WashStation {
    /// Build a wash station.
    ///
    /// # Errors
    /// `MotionError::InvalidFluidics` if two fluidic lines share a bit.
    pub fn new(
        id: u8,
        y: Arc<dyn Axis>,
        a: Arc<dyn Axis>,
        b: Arc<dyn Axis>,
        io: Arc<dyn OutputPort>,
        fluidics: FluidicsConfig,
    ) -> MotionResult<Self> {
        let name = format!("Wash station {id}");
        fluidics
            .validate()
            .map_err(|reason| MotionError::InvalidFluidics {
                component: name.clone(),
                reason,
            })?;

        let mut stage = Stage::named(id, name, y, None)?;
        stage.group_mut().add_axis("A", Arc::clone(&a))?;
        stage.group_mut().add_axis("B", Arc::clone(&b))?;
        Ok(Self {
            stage,
            a,
            b,
            io,
            fluidics,
            tip_grid: TipGrid::new(),
            state: Mutex::new(WashStationState::Uninitialized),
        })
    }

    /// Plenum axis.
    pub fn a(&self) -> &Arc<dyn Axis> {
        &self.a
    }

    /// Bath axis.
    pub fn b(&self) -> &Arc<dyn Axis> {
        &self.b
    }

    /// Tip grid served by this station.
    pub fn tip_grid(&self) -> &TipGrid {
        &self.tip_grid
    }

    /// Fluidic bit assignment.
    pub fn fluidics(&self) -> &FluidicsConfig {
        &self.fluidics
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WashStationState {
        *self.state.lock()
    }

    /// Set the lifecycle state.
    pub fn set_state(&self, state: WashStationState) {
        let mut current = self.state.lock();
        if *current != state {
            info!("{}: {:?} -> {:?}", self, *current, state);
        }
        *current = state;
    }

    /// Home plenum and bath together.
    pub fn home_ab(&self) -> MotionResult<()> {
        self.stage.group().home(&["A", "B"], DEFAULT_HOME_TIMEOUT)
    }

    // ─── Teachpoints ────────────────────────────────────────────────

    fn washer_teachpoint(&self) -> MotionResult<WasherTeachpoint> {
        let id = self.stage.group().id();
        self.stage
            .teachpoints()?
            .washer_teachpoint(id)
            .ok_or_else(|| MotionError::TeachpointMissing(format!("washer on stage {id}")))
    }

    /// Stage Y at which the wash head lines up [mm].
    pub fn wash_y(&self) -> MotionResult<f64> {
        Ok(self.stage.robot_teachpoint(0)?.y)
    }

    /// World `(x, y)` of a tip slot as seen by `arm_id`.
    pub fn tip_slot_position(&self, slot: SlotIndex, arm_id: u8) -> MotionResult<(f64, f64)> {
        TipGrid::slot_xy(slot, self.stage.center_position(arm_id)?)
    }

    // ─── Interlocks ─────────────────────────────────────────────────

    /// Reason the stage may not move, if any.
    fn y_blocker(&self) -> MotionResult<Option<&'static str>> {
        let washer = self.washer_teachpoint()?;
        if self.a.position_mm()? < washer.plenum.retracted - POSITION_TOLERANCE_MM {
            return Ok(Some("plenum is not fully retracted"));
        }
        if self.b.position_mm()? > washer.bath.retracted + POSITION_TOLERANCE_MM {
            return Ok(Some("bath is not fully retracted"));
        }
        Ok(None)
    }

    /// Whether plenum and bath are both retracted.
    pub fn is_y_safe_to_move(&self) -> MotionResult<bool> {
        Ok(self.y_blocker()?.is_none())
    }

    fn ensure_y_safe(&self) -> MotionResult<()> {
        match self.y_blocker()? {
            Some(reason) => Err(MotionError::unsafe_motion(self, reason)),
            None => Ok(()),
        }
    }

    /// Whether the stage is at the wash position or in the safe zone.
    pub fn is_washer_safe_to_move(&self) -> MotionResult<bool> {
        let y = self.stage.y_position()?;
        let wash_y = self.wash_y()?;
        Ok((y - wash_y).abs() < POSITION_TOLERANCE_MM || y > Y_SAFE_MM)
    }

    fn ensure_washer_safe(&self) -> MotionResult<()> {
        if self.is_washer_safe_to_move()? {
            Ok(())
        } else {
            Err(MotionError::unsafe_motion(
                self,
                "stage is neither at the wash position nor in the safe zone",
            ))
        }
    }

    // ─── Motion ─────────────────────────────────────────────────────

    /// Move the stage under the wash head.
    pub fn move_to_washer(&self) -> MotionResult<()> {
        let wash_y = self.wash_y()?;
        self.move_to(wash_y, 0.0)
    }

    /// Move plenum and/or bath to a named stop.
    ///
    /// `speed_factor` is clamped to `[0.001, 1]` and scales velocity
    /// linearly and acceleration quadratically. The plenum is started
    /// first, the bath runs to completion, then the plenum is awaited.
    pub fn move_washer(
        &self,
        target: WasherPosition,
        move_plenum: bool,
        move_bath: bool,
        speed_factor: f64,
    ) -> MotionResult<()> {
        if speed_factor.is_nan() {
            return Err(MotionError::InvalidArgument(
                "washer speed factor is NaN".to_string(),
            ));
        }
        let speed_factor = speed_factor.clamp(MIN_SPEED_FACTOR, 1.0);
        let washer = self.washer_teachpoint()?;

        let plenum_src = self.a.position_mm()?;
        let plenum_dst = if move_plenum {
            washer.plenum.at(target)
        } else {
            plenum_src
        };
        if plenum_dst < plenum_src
            && plenum_dst < washer.plenum.retracted - POSITION_TOLERANCE_MM
        {
            self.ensure_washer_safe()?;
        }

        let bath_src = self.b.position_mm()?;
        let bath_dst = if move_bath {
            washer.bath.at(target)
        } else {
            bath_src
        };
        if bath_dst > bath_src && bath_dst > washer.bath.retracted + POSITION_TOLERANCE_MM {
            self.ensure_washer_safe()?;
        }

        debug!(
            "{}: washer to {} (plenum={}, bath={}, speed={:.3})",
            self, target, move_plenum, move_bath, speed_factor
        );
        let scaled = |axis: &Arc<dyn Axis>| {
            let settings = axis.settings();
            MoveParams::new()
                .velocity(settings.velocity * speed_factor)
                .acceleration(settings.acceleration * speed_factor * speed_factor)
        };
        if move_plenum {
            self.a
                .move_absolute(plenum_dst, scaled(&self.a).wait(false))?;
        }
        if move_bath {
            self.b.move_absolute(bath_dst, scaled(&self.b))?;
        }
        if move_plenum {
            self.a.move_absolute(plenum_dst, scaled(&self.a))?;
        }
        Ok(())
    }

    /// Retract the wash head so the stage may move.
    pub fn clear_for_stage(&self) -> MotionResult<()> {
        self.move_washer(WasherPosition::Retracted, true, true, 1.0)
    }

    fn jog_plenum(&self, increment: f64) -> MotionResult<()> {
        let destination = self.a.position_mm()? + increment;
        let retracted = self.washer_teachpoint()?.plenum.retracted;
        if increment < 0.0 && destination < retracted - POSITION_TOLERANCE_MM {
            self.ensure_washer_safe()?;
        }
        self.a.move_absolute(destination, MoveParams::new())?;
        Ok(())
    }

    fn jog_bath(&self, increment: f64) -> MotionResult<()> {
        let destination = self.b.position_mm()? + increment;
        let retracted = self.washer_teachpoint()?.bath.retracted;
        if increment > 0.0 && destination > retracted + POSITION_TOLERANCE_MM {
            self.ensure_washer_safe()?;
        }
        self.b.move_absolute(destination, MoveParams::new())?;
        Ok(())
    }

    // ─── Fluidics ───────────────────────────────────────────────────

    fn switch(&self, bit: usize, on: bool) -> MotionResult<()> {
        self.io
            .set_output_state(bit, on)
            .map_err(|source| MotionError::Io {
                component: self.to_string(),
                source,
            })
    }

    /// Bath water valve.
    pub fn set_bath_water(&self, on: bool) -> MotionResult<()> {
        self.switch(self.fluidics.bath_water, on)
    }

    /// Plenum water valve.
    pub fn set_plenum_water(&self, on: bool) -> MotionResult<()> {
        self.switch(self.fluidics.plenum_water, on)
    }

    /// Overflow exhaust.
    pub fn set_overflow_exhaust(&self, on: bool) -> MotionResult<()> {
        self.switch(self.fluidics.overflow_exhaust, on)
    }

    /// Vacuum.
    pub fn set_vacuum(&self, on: bool) -> MotionResult<()> {
        self.switch(self.fluidics.vacuum, on)
    }

    /// Drying air.
    pub fn set_air(&self, on: bool) -> MotionResult<()> {
        self.switch(self.fluidics.air, on)
    }
}

impl MotionGroup for WashStation {
    fn group(&self) -> &AxisGroup {
        self.stage.group()
    }

    /// Y jogs go through the stage interlock, A/B jogs through the washer interlock.
    fn jog(&self, role: &str, increment: f64) -> MotionResult<()> {
        match role {
            "Y" => {
                let y = self.stage.y_position()?;
                self.move_to(y + increment, 0.0)
            }
            "A" => self.jog_plenum(increment),
            "B" => self.jog_bath(increment),
            _ => Err(MotionError::UnknownRole {
                group: self.stage.group().id(),
                role: role.to_string(),
            }),
        }
    }
}

impl StageMotion for WashStation {
    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn as_motion_group(&self) -> &dyn MotionGroup {
        self
    }

    /// Move Y only; R is ignored.
    ///
    /// Entering or leaving the zone below the safe Y requires the wash
    /// head to be retracted. Nothing is commanded otherwise.
    fn move_to(&self, y: f64, _r: f64) -> MotionResult<()> {
        if y < Y_SAFE_MM || self.stage.y_position()? < Y_SAFE_MM {
            self.ensure_y_safe()?;
        }
        self.stage.y().move_absolute(y, MoveParams::new())?;
        Ok(())
    }

    fn as_wash_station(&self) -> Option<&WashStation> {
        Some(self)
    }
}
