//! Liquid-handling arm (X/Z/W).
//!
//! - X: horizontal reach
//! - Z: dispense depth; "down" is `+` unless the axis is flipped
//! - W: syringe plunger, addressed in µL through [`PlungerAxis`]
//!
//! The arm owns the two non-trivial liquid-handling algorithms:
//! [`Arm::transfer`] (W and Z moving in proportional time) and
//! [`Arm::press_tip`] (torque- or position-limited tip seating).

use crate::error::{MotionError, MotionResult, PressFailure};
use crate::group::{AxisGroup, MotionGroup};
use crate::permit::HomingPermits;
use crate::tip_grid::SlotIndex;
use lhk_common::hal::{Axis, AxisFault, AxisSettings, MoveParams, TorqueLimitedMove};
use lhk_common::prelude::DEFAULT_HOME_TIMEOUT;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// ─── Tip Press Constants ────────────────────────────────────────────

/// The torque-limited press aims this far past the press position [mm].
pub const TORQUE_PRESS_OVERSHOOT_MM: f64 = 2.0;

/// Accepted deviation of the torque-limited stop from the press position [mm].
pub const TORQUE_PRESS_WINDOW_MM: f64 = 1.8;

/// Motor current during a torque-limited press [A].
pub const TORQUE_PRESS_CURRENT_A: f64 = 4.3;

/// Velocity of a torque-limited press [mm/s].
const TORQUE_PRESS_VELOCITY: f64 = 20.0;

/// Acceleration of a torque-limited press [mm/s²].
const TORQUE_PRESS_ACCELERATION: f64 = 500.0;

/// Jerk of a torque-limited press and its floor.
const TORQUE_PRESS_JERK: i32 = 5;
const TORQUE_PRESS_MIN_JERK: i32 = 1;

/// Settling time after a torque-limited press [ms].
const TORQUE_PRESS_SETTLING_MS: u16 = 500;

/// Travel from the start inside which the current limit is active [mm].
const TORQUE_LIMIT_WINDOW_MM: f64 = 12.0;

/// Peak current of the Z controller [A].
pub const CONTROLLER_MAX_CURRENT_A: f64 = 6.11;

/// Attempts made by a position-limited press (one try plus two retries).
pub const POSITION_PRESS_ATTEMPTS: u32 = 3;

/// Velocity wanted for a position-limited press [mm/s].
const POSITION_PRESS_VELOCITY: f64 = 20.0;

/// Acceleration wanted for a position-limited press [mm/s²].
const POSITION_PRESS_ACCELERATION: f64 = 500.0;

/// Extra hold after a successful position press.
const POSITION_PRESS_DWELL: Duration = Duration::from_millis(50);

/// Current register counts per ampere.
const CURRENT_COUNTS_PER_AMP: f64 = 65472.0 / 2.0 / CONTROLLER_MAX_CURRENT_A;

/// Convert the Z current register to amperes.
pub fn current_amps(raw: i16) -> f64 {
    f64::from(raw) / CURRENT_COUNTS_PER_AMP
}

// ─── Tip Lifecycle ──────────────────────────────────────────────────

/// Tip lifecycle of an arm, driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TipState {
    /// Bare barrel.
    #[default]
    NoTip,
    /// Press in progress.
    PressingTip,
    /// Fresh tip on.
    CleanTip,
    /// Tip in use.
    UsingTip,
    /// Tip used.
    DirtyTip,
    /// Waiting for a shuck slot.
    ReadyToShuckTip,
    /// Shuck queued.
    ShuckingTipInQueue,
    /// Shuck in progress.
    ShuckingTipInAction,
    /// Arm taken out of use.
    Disabled,
    /// Arm in error.
    Error,
}

/// Tip slot currently held by an arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldSlot {
    /// Stage id of the wash station owning the grid.
    pub station: u8,
    /// Slot in that grid.
    pub slot: SlotIndex,
}

// ─── Plunger Wrapper ────────────────────────────────────────────────

/// W axis with every absolute position shifted by the shuck offset.
///
/// Positions are in µL; the offset is configured in mm and converted
/// once at construction.
pub struct PlungerAxis {
    axis: Arc<dyn Axis>,
    offset_ul: f64,
}

impl PlungerAxis {
    /// Wrap `axis` with a shuck offset in mm.
    pub fn new(axis: Arc<dyn Axis>, shuck_offset_mm: f64) -> Self {
        let offset_ul = axis.mm_to_ul(shuck_offset_mm);
        Self { axis, offset_ul }
    }

    /// Offset added to every absolute position [µL].
    pub fn offset_ul(&self) -> f64 {
        self.offset_ul
    }

    /// Axis id.
    pub fn id(&self) -> u8 {
        self.axis.id()
    }

    /// Settings of the raw axis.
    pub fn settings(&self) -> &AxisSettings {
        self.axis.settings()
    }

    /// See [`Axis::mm_to_ul`].
    pub fn mm_to_ul(&self, mm: f64) -> f64 {
        self.axis.mm_to_ul(mm)
    }

    /// See [`Axis::ul_to_mm`].
    pub fn ul_to_mm(&self, ul: f64) -> f64 {
        self.axis.ul_to_mm(ul)
    }

    /// Raw position [mm].
    pub fn position_mm(&self) -> Result<f64, AxisFault> {
        self.axis.position_mm()
    }

    /// Offset-corrected position [µL].
    pub fn position_ul(&self) -> Result<f64, AxisFault> {
        Ok(self.axis.position_ul()? - self.offset_ul)
    }

    /// Offset-corrected absolute move [µL].
    pub fn move_absolute(&self, position_ul: f64, params: MoveParams) -> Result<(), AxisFault> {
        self.axis.move_absolute(position_ul + self.offset_ul, params)
    }

    /// Move the raw axis to zero, ignoring the offset.
    pub fn move_to_zero(&self, wait: bool) -> Result<(), AxisFault> {
        self.axis.move_absolute(0.0, MoveParams::new().wait(wait))
    }
}

// ─── Move Requests ──────────────────────────────────────────────────

/// Options of [`Arm::move_z_offset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZMove {
    /// Velocity [mm/s]; `None` = axis ceiling.
    pub velocity: Option<f64>,
    /// Cap the velocity at the axis ceiling.
    pub clamp_velocity: bool,
    /// Block until done.
    pub wait: bool,
    /// Trapezoidal profile.
    pub use_trap: bool,
}

impl Default for ZMove {
    fn default() -> Self {
        Self {
            velocity: None,
            clamp_velocity: true,
            wait: true,
            use_trap: false,
        }
    }
}

/// Direction of a liquid transfer, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Draw liquid into the tip.
    Aspirate,
    /// Expel liquid from the tip.
    Dispense,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aspirate => write!(f, "ASPIRATE"),
            Self::Dispense => write!(f, "DISPENSE"),
        }
    }
}

/// Synchronized W/Z transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferRequest {
    /// Aspirate or dispense.
    pub kind: TransferKind,
    /// W destination [µL].
    pub w_destination_ul: f64,
    /// Z destination as an offset from `z_origin` [mm].
    pub z_destination: f64,
    /// W start [µL], used with theoretical positions.
    pub w_source_ul: f64,
    /// Z start as an offset from `z_origin` [mm], used with theoretical positions.
    pub z_source: f64,
    /// W velocity [µL/s].
    pub w_velocity_ul: f64,
    /// Fraction of W's acceleration ceiling to use.
    pub w_accel_factor: f64,
    /// Z reference (usually a teachpoint) [mm].
    pub z_origin: f64,
    /// Take the start from `w_source_ul`/`z_source` instead of reading the axes.
    pub use_theoretical_positions: bool,
    /// Skip the drives' ceiling checks for these moves.
    pub ignore_motion_parameters: bool,
}

/// Derived kinematics of a synchronized transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProfile {
    /// `z_distance / w_distance_mm`.
    pub ratio: f64,
    /// W acceleration [mm/s²].
    pub w_acceleration: f64,
    /// Z velocity [mm/s].
    pub z_velocity: f64,
    /// Z acceleration [mm/s²].
    pub z_acceleration: f64,
}

impl TransferProfile {
    /// Scale Z so it covers its distance in the time W covers its own.
    ///
    /// `w_velocity_mm` is W's velocity already converted to mm/s and
    /// `w_acceleration` is the scaled W acceleration [mm/s²].
    pub fn new(w_distance_mm: f64, z_distance: f64, w_velocity_mm: f64, w_acceleration: f64) -> Self {
        let ratio = z_distance / w_distance_mm;
        Self {
            ratio,
            w_acceleration,
            z_velocity: w_velocity_mm * ratio,
            z_acceleration: w_acceleration * ratio,
        }
    }
}

/// Simultaneous W and Z absolute move, see [`Arm::move_wz`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WzMove {
    /// W target [µL].
    pub w_position_ul: f64,
    /// Z target [mm].
    pub z_position: f64,
    /// W velocity [µL/s].
    pub w_velocity_ul: f64,
    /// Z velocity [mm/s].
    pub z_velocity: f64,
    /// W acceleration [mm/s²].
    pub w_acceleration: f64,
    /// Z acceleration [mm/s²].
    pub z_acceleration: f64,
    /// Skip the drives' ceiling checks.
    pub ignore_motion_parameters: bool,
}

/// How a tip is seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressStrategy {
    /// Drive into the tip under a current limit and judge the stop position.
    TorqueLimited,
    /// Drive to the press position, retrying on motion faults.
    PositionLimited,
}

/// Tip press request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressRequest {
    /// Z teachpoint of the tip rack [mm].
    pub z_teachpoint: f64,
    /// Offset from the teachpoint at which the barrel seals [mm].
    pub z_offset: f64,
    /// Extra push beyond the seal [mm].
    pub additional_push: f64,
    /// Press strategy.
    pub strategy: PressStrategy,
}

impl PressRequest {
    /// Absolute Z at which the barrel should seal [mm].
    pub fn press_position(&self) -> f64 {
        self.z_teachpoint + self.z_offset - self.additional_push
    }
}

// ─── Arm ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TipHolding {
    state: TipState,
    held: Option<HeldSlot>,
}

/// X/Z/W liquid-handling arm.
pub struct Arm {
    group: AxisGroup,
    available: bool,
    x: Arc<dyn Axis>,
    z: Arc<dyn Axis>,
    w: PlungerAxis,
    tip: Mutex<TipHolding>,
    x_homing: Arc<HomingPermits>,
}

impl fmt::Debug for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arm")
            .field("id", &self.group.id())
            .field("available", &self.available)
            .field("tip", &*self.tip.lock())
            .finish()
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arm {}", self.group.id())
    }
}

impl Arm {
    /// Build an arm from its three axes.
    ///
    /// `x_homing` is the permit shared by every arm of the topology.
    pub fn new(
        id: u8,
        x: Arc<dyn Axis>,
        z: Arc<dyn Axis>,
        w: Arc<dyn Axis>,
        w_shuck_offset_mm: f64,
        available: bool,
        x_homing: Arc<HomingPermits>,
    ) -> MotionResult<Self> {
        let mut group = AxisGroup::new(id, format!("Arm {id}"));
        group.add_axis("X", Arc::clone(&x))?;
        group.add_axis("Z", Arc::clone(&z))?;
        group.add_axis("W", Arc::clone(&w))?;
        Ok(Self {
            group,
            available,
            x,
            z,
            w: PlungerAxis::new(w, w_shuck_offset_mm),
            tip: Mutex::new(TipHolding::default()),
            x_homing,
        })
    }

    /// Whether the arm may be used.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// X axis.
    pub fn x(&self) -> &Arc<dyn Axis> {
        &self.x
    }

    /// Z axis.
    pub fn z(&self) -> &Arc<dyn Axis> {
        &self.z
    }

    /// Offset-corrected W axis.
    pub fn w(&self) -> &PlungerAxis {
        &self.w
    }

    /// Current tip lifecycle state.
    pub fn tip_state(&self) -> TipState {
        self.tip.lock().state
    }

    /// Set the tip lifecycle state.
    pub fn set_tip_state(&self, state: TipState) {
        self.tip.lock().state = state;
    }

    /// Slot of the tip currently held.
    pub fn held_slot(&self) -> Option<HeldSlot> {
        self.tip.lock().held
    }

    /// Record (or clear) the slot of the tip currently held.
    pub fn set_held_slot(&self, held: Option<HeldSlot>) {
        self.tip.lock().held = held;
    }

    // ─── Homing ─────────────────────────────────────────────────────

    /// Home W and Z together.
    pub fn home_wz(&self) -> MotionResult<()> {
        self.group.home(&["W", "Z"], DEFAULT_HOME_TIMEOUT)
    }

    /// Home X while holding one of the shared X-homing permits.
    pub fn home_x(&self) -> MotionResult<()> {
        let _permit = self.x_homing.acquire();
        debug!("{}: homing X", self);
        self.x.home(true)?;
        Ok(())
    }

    // ─── Z Helpers ──────────────────────────────────────────────────

    /// Absolute Z of `offset` below `origin`.
    pub fn absolute_z(&self, origin: f64, offset: f64) -> f64 {
        if self.z.settings().flip_direction {
            origin + offset
        } else {
            origin - offset
        }
    }

    /// Move Z to `offset` from `origin`.
    pub fn move_z_offset(&self, origin: f64, offset: f64, options: ZMove) -> MotionResult<()> {
        let ceiling = self.z.settings().velocity;
        let mut velocity = options.velocity.unwrap_or(ceiling);
        if options.clamp_velocity && (velocity > ceiling || velocity.is_nan()) {
            velocity = ceiling;
        }
        self.z.move_absolute(
            self.absolute_z(origin, offset),
            MoveParams::new()
                .velocity(velocity)
                .wait(options.wait)
                .trap(options.use_trap),
        )?;
        Ok(())
    }

    /// Whether X is within `delta` of `x`.
    pub fn verify_x_position(&self, x: f64, delta: f64) -> MotionResult<bool> {
        Ok((self.x.position_mm()? - x).abs() <= delta)
    }

    /// Whether Z is within `delta` of `offset` from `origin`.
    pub fn verify_z_position(&self, origin: f64, offset: f64, delta: f64) -> MotionResult<bool> {
        let target = self.absolute_z(origin, offset);
        Ok((self.z.position_mm()? - target).abs() <= delta)
    }

    /// Z to 0 (blocking), then start X toward 0.
    pub fn return_home(&self) -> MotionResult<()> {
        self.z.move_absolute(0.0, MoveParams::new())?;
        self.x.move_absolute(0.0, MoveParams::new().wait(false))?;
        Ok(())
    }

    /// Raise Z to its top soft limit, then back off 0.1 mm.
    ///
    /// Does nothing when Z is already within 0.5 mm of the limit.
    pub fn move_to_top_limit(
        &self,
        use_trap: bool,
        acceleration: Option<f64>,
        ignore_speed_limits: bool,
    ) -> MotionResult<()> {
        let settings = self.z.settings();
        let top = settings.top_limit();
        if self.verify_z_position(top, 0.0, 0.5)? {
            return Ok(());
        }
        self.z.move_absolute(
            top,
            MoveParams::new()
                .acceleration(acceleration.unwrap_or(settings.acceleration))
                .trap(use_trap)
                .ignore_motion_parameters(ignore_speed_limits),
        )?;
        let backed_off = if settings.flip_direction {
            top - 0.1
        } else {
            top + 0.1
        };
        self.z
            .move_absolute(backed_off, MoveParams::new().trap(true))?;
        Ok(())
    }

    /// Move Z `increment` up from `start`.
    pub fn move_relative_up_from(&self, start: f64, increment: f64) -> MotionResult<()> {
        let increment = if self.z.settings().flip_direction {
            increment
        } else {
            -increment
        };
        self.z.move_absolute(start + increment, MoveParams::new())?;
        Ok(())
    }

    /// Move X and Z together, returning once both arrived.
    pub fn move_xz_offset(
        &self,
        x: f64,
        z_origin: f64,
        z_offset: f64,
        x_use_trap: bool,
        z_use_trap: bool,
    ) -> MotionResult<()> {
        let z = self.absolute_z(z_origin, z_offset);
        let x_params = MoveParams::new().trap(x_use_trap);
        let z_params = MoveParams::new().trap(z_use_trap);
        self.x.move_absolute(x, x_params.wait(false))?;
        self.z.move_absolute(z, z_params.wait(false))?;
        self.x.move_absolute(x, x_params)?;
        self.z.move_absolute(z, z_params)?;
        Ok(())
    }

    // ─── Plunger ────────────────────────────────────────────────────

    /// Move W to an absolute volume at the axis' top speed.
    pub fn move_w_to_absolute_ul(&self, position_ul: f64, wait: bool) -> MotionResult<()> {
        let velocity_ul = self.w.mm_to_ul(self.w.settings().velocity);
        self.w.move_absolute(
            position_ul,
            MoveParams::new().velocity(velocity_ul).wait(wait),
        )?;
        Ok(())
    }

    /// Start (or, with `wait`, complete) a simultaneous W/Z move.
    pub fn move_wz(&self, request: &WzMove, wait: bool) -> MotionResult<()> {
        let settings = self.w.settings();
        let start = Instant::now();
        if !wait {
            debug!(
                "Non-blocking liquid transfer W{} started at {:.3}mm",
                self.group.id(),
                self.w.position_mm()?
            );
        }
        self.w.move_absolute(
            request.w_position_ul,
            MoveParams::new()
                .velocity(request.w_velocity_ul)
                .acceleration(request.w_acceleration)
                .jerk(settings.jerk)
                .wait(wait)
                .move_done_window(settings.move_done_window)
                .settling_time_ms(settings.settling_time_ms)
                .trap(true)
                .ignore_motion_parameters(request.ignore_motion_parameters),
        )?;
        if wait {
            debug!(
                "Liquid transfer W{} took {:.3}ms, now at {:.3}mm",
                self.group.id(),
                start.elapsed().as_secs_f64() * 1000.0,
                self.w.position_mm()?
            );
        }
        self.z.move_absolute(
            request.z_position,
            MoveParams::new()
                .velocity(request.z_velocity)
                .acceleration(request.z_acceleration)
                .wait(wait)
                .trap(true)
                .ignore_motion_parameters(request.ignore_motion_parameters),
        )?;
        Ok(())
    }

    /// Aspirate or dispense with Z following W in proportional time.
    ///
    /// A zero Z distance moves W alone; Z is not commanded at all.
    pub fn transfer(&self, request: &TransferRequest) -> MotionResult<()> {
        let w_start = if request.use_theoretical_positions {
            request.w_source_ul
        } else {
            self.w.position_ul()?
        };
        let w_distance_mm = self
            .w
            .ul_to_mm((request.w_destination_ul - w_start).abs());

        let z_start = if request.use_theoretical_positions {
            self.absolute_z(request.z_origin, request.z_source)
        } else {
            self.z.position_mm()?
        };
        let z_target = self.absolute_z(request.z_origin, request.z_destination);
        let z_distance = (z_target - z_start).abs();

        let w_acceleration = request.w_accel_factor * self.w.settings().acceleration;
        debug!("{} {} START", self, request.kind);

        if z_distance > 0.0 {
            if w_distance_mm == 0.0 {
                return Err(MotionError::InvalidArgument(format!(
                    "{}: Z must travel {z_distance:.3}mm while W stays put",
                    self
                )));
            }
            let profile = TransferProfile::new(
                w_distance_mm,
                z_distance,
                self.w.ul_to_mm(request.w_velocity_ul),
                w_acceleration,
            );
            let wz = WzMove {
                w_position_ul: request.w_destination_ul,
                z_position: z_target,
                w_velocity_ul: request.w_velocity_ul,
                z_velocity: profile.z_velocity,
                w_acceleration: profile.w_acceleration,
                z_acceleration: profile.z_acceleration,
                ignore_motion_parameters: request.ignore_motion_parameters,
            };
            self.move_wz(&wz, false)?;
            self.move_wz(&wz, true)?;
        } else {
            let params = MoveParams::new()
                .velocity(request.w_velocity_ul)
                .acceleration(w_acceleration)
                .trap(true)
                .ignore_motion_parameters(request.ignore_motion_parameters);
            self.w
                .move_absolute(request.w_destination_ul, params.wait(false))?;
            self.w.move_absolute(request.w_destination_ul, params)?;
        }

        debug!("{} {} END", self, request.kind);
        Ok(())
    }

    // ─── Tip Press ──────────────────────────────────────────────────

    /// Seat a tip and return the Z position where the barrel bottomed out.
    pub fn press_tip(&self, request: &PressRequest) -> MotionResult<f64> {
        let press_position = request.press_position();
        let outcome = match request.strategy {
            PressStrategy::TorqueLimited => self.press_torque_limited(press_position)?,
            PressStrategy::PositionLimited => self.press_position_limited(press_position)?,
        };

        let final_position = self.z.position_mm()?;
        let amps = current_amps(self.z.read_current_raw()?);
        debug!(
            "Axis {} tip press {} ({:?}): commanded {:.3}mm, actual {:.3}mm, actual-cmd {:.3}mm, IQ {:.3}A",
            self.z.id(),
            if outcome.is_ok() { "SUCCESS" } else { "FAILED" },
            request.strategy,
            press_position,
            final_position,
            final_position - press_position,
            amps
        );

        outcome.map(|()| final_position).map_err(|failure| MotionError::Press {
            axis_id: self.z.id(),
            failure,
        })
    }

    fn press_torque_limited(&self, press_position: f64) -> MotionResult<Result<(), PressFailure>> {
        let flip_sign = if self.z.settings().flip_direction {
            -1.0
        } else {
            1.0
        };
        let request = TorqueLimitedMove {
            destination: press_position + flip_sign * TORQUE_PRESS_OVERSHOOT_MM,
            velocity: TORQUE_PRESS_VELOCITY,
            acceleration: TORQUE_PRESS_ACCELERATION,
            jerk: TORQUE_PRESS_JERK,
            min_jerk: TORQUE_PRESS_MIN_JERK,
            settling_time_ms: TORQUE_PRESS_SETTLING_MS,
            current_limit: TORQUE_PRESS_CURRENT_A,
            controller_max_current: CONTROLLER_MAX_CURRENT_A,
            torque_window: TORQUE_LIMIT_WINDOW_MM,
        };
        self.z.move_absolute_torque_limited(&request)?;

        let actual = self.z.position_mm()?;
        let deviation = (actual - press_position) * flip_sign;
        if deviation > TORQUE_PRESS_WINDOW_MM {
            debug!("Axis {} tip press FAIL: no tip present", self.z.id());
            return Ok(Err(PressFailure::NoTipPresent {
                commanded: press_position,
                actual,
                window: TORQUE_PRESS_WINDOW_MM,
            }));
        }
        if deviation < -TORQUE_PRESS_WINDOW_MM {
            debug!("Axis {} tip press FAIL: over-travel", self.z.id());
            return Ok(Err(PressFailure::OverTravel {
                commanded: press_position,
                actual,
                window: TORQUE_PRESS_WINDOW_MM,
            }));
        }
        Ok(Ok(()))
    }

    fn press_position_limited(
        &self,
        press_position: f64,
    ) -> MotionResult<Result<(), PressFailure>> {
        let settings = self.z.settings();
        let mut velocity = POSITION_PRESS_VELOCITY;
        let mut acceleration = POSITION_PRESS_ACCELERATION;
        if settings.velocity < velocity {
            warn!(
                "Tip press wanted {}mm/s on axis {}, clipped to its {}mm/s limit",
                velocity,
                self.z.id(),
                settings.velocity
            );
            velocity = settings.velocity;
        }
        if settings.acceleration < acceleration {
            warn!(
                "Tip press wanted {}mm/s² on axis {}, clipped to its {}mm/s² limit",
                acceleration,
                self.z.id(),
                settings.acceleration
            );
            acceleration = settings.acceleration;
        }
        let params = MoveParams::new()
            .velocity(velocity)
            .acceleration(acceleration)
            .jerk(1)
            .move_done_window(1.3)
            .settling_time_ms(50)
            .trap(true);

        let before = self.z.position_mm()?;
        for attempt in 1..=POSITION_PRESS_ATTEMPTS {
            match self.z.move_absolute(press_position, params) {
                Ok(()) => {
                    std::thread::sleep(POSITION_PRESS_DWELL);
                    return Ok(Ok(()));
                }
                Err(fault) => {
                    let actual = self.z.position_mm()?;
                    debug!(
                        "Axis {} tip press attempt {} failed ({}): position error {:.3}mm",
                        self.z.id(),
                        attempt,
                        fault.message,
                        actual - press_position
                    );
                    if attempt < POSITION_PRESS_ATTEMPTS {
                        debug!("Axis {} tip press retrying", self.z.id());
                        self.z.move_absolute(before, MoveParams::new())?;
                    }
                }
            }
        }

        let actual = self.z.position_mm()?;
        Ok(Err(PressFailure::RetriesExhausted {
            attempts: POSITION_PRESS_ATTEMPTS,
            commanded: press_position,
            actual,
            position_error: actual - press_position,
        }))
    }
}

impl MotionGroup for Arm {
    fn group(&self) -> &AxisGroup {
        &self.group
    }
}
