//! Axis capability contract.
//!
//! This module defines:
//! - `Axis` trait - One motorized degree of freedom supplied by a driver
//! - `AxisSettings` - Per-axis motion limits and unit conversion
//! - `MoveParams` - Optional overrides for an absolute move
//! - `TorqueLimitedMove` - Parameters of a current-limited move
//! - `AxisFault` - Hardware-motion-fault raised by any axis operation
//!
//! # Units
//!
//! Linear axes work in millimetres. Volumetric axes (plungers) carry a
//! `ul_per_mm` factor in their settings; their absolute positions and
//! velocities are expressed in µL and µL/s while acceleration and jerk
//! stay in mm units.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Hardware-motion-fault raised by an axis driver.
///
/// Carries the identity of the offending axis so that callers several
/// layers up can still tell which motor misbehaved.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("axis {axis_id}: {message}")]
pub struct AxisFault {
    /// Id of the axis that reported the fault.
    pub axis_id: u8,
    /// Driver-supplied description.
    pub message: String,
}

impl AxisFault {
    /// Create a fault for the given axis.
    pub fn new(axis_id: u8, message: impl Into<String>) -> Self {
        Self {
            axis_id,
            message: message.into(),
        }
    }
}

fn default_jerk() -> i32 {
    10
}

fn default_move_done_window() -> f64 {
    0.05
}

fn default_settling_time_ms() -> u16 {
    20
}

fn default_encoder_lines() -> u32 {
    500
}

fn default_mm_per_rev() -> f64 {
    1.0
}

/// Per-axis motion limits and calibration.
///
/// # TOML Example
///
/// ```toml
/// velocity = 300.0
/// acceleration = 2000.0
/// min_limit = 0.0
/// max_limit = 120.0
/// flip_direction = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSettings {
    /// Velocity ceiling [mm/s].
    pub velocity: f64,
    /// Acceleration ceiling [mm/s²].
    pub acceleration: f64,
    /// Jerk [controller internal units].
    #[serde(default = "default_jerk")]
    pub jerk: i32,
    /// Window around the target that counts as "arrived" [mm].
    #[serde(default = "default_move_done_window")]
    pub move_done_window: f64,
    /// Time the axis must stay in the window before the move completes.
    #[serde(default = "default_settling_time_ms")]
    pub settling_time_ms: u16,
    /// Calibrated direction is inverted relative to the motor.
    #[serde(default)]
    pub flip_direction: bool,
    /// Lower soft limit [mm].
    pub min_limit: f64,
    /// Upper soft limit [mm].
    pub max_limit: f64,
    /// Encoder lines per motor revolution.
    #[serde(default = "default_encoder_lines")]
    pub encoder_lines: u32,
    /// Travel per motor revolution [mm].
    #[serde(default = "default_mm_per_rev")]
    pub mm_per_rev: f64,
    /// Volume displaced per millimetre of travel, for plunger axes [µL/mm].
    #[serde(default)]
    pub ul_per_mm: Option<f64>,
}

impl AxisSettings {
    /// Settings with the given ceilings and travel range, defaults elsewhere.
    pub fn new(velocity: f64, acceleration: f64, min_limit: f64, max_limit: f64) -> Self {
        Self {
            velocity,
            acceleration,
            jerk: default_jerk(),
            move_done_window: default_move_done_window(),
            settling_time_ms: default_settling_time_ms(),
            flip_direction: false,
            min_limit,
            max_limit,
            encoder_lines: default_encoder_lines(),
            mm_per_rev: default_mm_per_rev(),
            ul_per_mm: None,
        }
    }

    /// Same settings with the direction flip set.
    pub fn flipped(mut self, flip: bool) -> Self {
        self.flip_direction = flip;
        self
    }

    /// Same settings with a volumetric conversion factor.
    pub fn volumetric(mut self, ul_per_mm: f64) -> Self {
        self.ul_per_mm = Some(ul_per_mm);
        self
    }

    /// Whether positions on this axis are expressed in µL.
    pub fn is_volumetric(&self) -> bool {
        self.ul_per_mm.is_some()
    }

    /// Convert a travel in mm to the axis' native volume unit.
    ///
    /// Identity for linear axes.
    pub fn mm_to_ul(&self, mm: f64) -> f64 {
        mm * self.ul_per_mm.unwrap_or(1.0)
    }

    /// Convert a volume in µL to travel in mm.
    ///
    /// Identity for linear axes.
    pub fn ul_to_mm(&self, ul: f64) -> f64 {
        ul / self.ul_per_mm.unwrap_or(1.0)
    }

    /// Encoder counts per mm (quadrature decoded).
    pub fn counts_per_mm(&self) -> f64 {
        f64::from(self.encoder_lines) * 4.0 / self.mm_per_rev
    }

    /// The mechanically "up" end of travel.
    pub fn top_limit(&self) -> f64 {
        if self.flip_direction {
            self.max_limit
        } else {
            self.min_limit
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.velocity > 0.0) {
            return Err(format!("velocity must be > 0 (got {})", self.velocity));
        }
        if !(self.acceleration > 0.0) {
            return Err(format!(
                "acceleration must be > 0 (got {})",
                self.acceleration
            ));
        }
        if self.min_limit >= self.max_limit {
            return Err(format!(
                "min_limit ({}) must be below max_limit ({})",
                self.min_limit, self.max_limit
            ));
        }
        if !(self.mm_per_rev > 0.0) {
            return Err(format!("mm_per_rev must be > 0 (got {})", self.mm_per_rev));
        }
        if let Some(factor) = self.ul_per_mm {
            if !(factor > 0.0) {
                return Err(format!("ul_per_mm must be > 0 (got {factor})"));
            }
        }
        Ok(())
    }
}

/// Optional overrides for [`Axis::move_absolute`].
///
/// `None` fields fall back to the axis' own [`AxisSettings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveParams {
    /// Velocity override.
    pub velocity: Option<f64>,
    /// Acceleration override.
    pub acceleration: Option<f64>,
    /// Jerk override.
    pub jerk: Option<i32>,
    /// Block until the move completes.
    pub wait: bool,
    /// Move-done window override [mm].
    pub move_done_window: Option<f64>,
    /// Settling time override.
    pub settling_time_ms: Option<u16>,
    /// Trapezoidal instead of S-curve profile.
    pub use_trap: bool,
    /// Skip the driver's velocity/acceleration ceiling checks for this move only.
    pub ignore_motion_parameters: bool,
}

impl Default for MoveParams {
    fn default() -> Self {
        Self {
            velocity: None,
            acceleration: None,
            jerk: None,
            wait: true,
            move_done_window: None,
            settling_time_ms: None,
            use_trap: false,
            ignore_motion_parameters: false,
        }
    }
}

impl MoveParams {
    /// Blocking move with the axis defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the velocity.
    pub fn velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Set the acceleration.
    pub fn acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    /// Set the jerk.
    pub fn jerk(mut self, jerk: i32) -> Self {
        self.jerk = Some(jerk);
        self
    }

    /// Block (or not) until the move completes.
    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Set the move-done window.
    pub fn move_done_window(mut self, window_mm: f64) -> Self {
        self.move_done_window = Some(window_mm);
        self
    }

    /// Set the settling time.
    pub fn settling_time_ms(mut self, ms: u16) -> Self {
        self.settling_time_ms = Some(ms);
        self
    }

    /// Use a trapezoidal profile.
    pub fn trap(mut self, use_trap: bool) -> Self {
        self.use_trap = use_trap;
        self
    }

    /// Bypass the ceiling checks.
    pub fn ignore_motion_parameters(mut self, ignore: bool) -> Self {
        self.ignore_motion_parameters = ignore;
        self
    }
}

/// Parameters of a current-limited move.
///
/// The axis drives toward `destination` and stops wherever the motor
/// current saturates at `current_limit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueLimitedMove {
    /// Destination if nothing stops the axis [mm].
    pub destination: f64,
    /// Velocity [mm/s].
    pub velocity: f64,
    /// Acceleration [mm/s²].
    pub acceleration: f64,
    /// Jerk [IU].
    pub jerk: i32,
    /// Minimum jerk [IU].
    pub min_jerk: i32,
    /// Settling time after the stop.
    pub settling_time_ms: u16,
    /// Current limit [A].
    pub current_limit: f64,
    /// Peak current of the controller [A].
    pub controller_max_current: f64,
    /// Window, relative to the start, inside which limiting is active [mm].
    pub torque_window: f64,
}

/// A single motorized degree of freedom.
///
/// Implementations must be internally synchronized: the kernel shares
/// axes between threads as `Arc<dyn Axis>` and calls these methods
/// through `&self`. Every method that touches hardware may fail with an
/// [`AxisFault`].
pub trait Axis: Send + Sync {
    /// Driver-level axis id.
    fn id(&self) -> u8;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Motion limits and calibration.
    fn settings(&self) -> &AxisSettings;

    /// Absolute move to `position`.
    ///
    /// With `params.wait == false` the move is started and the call returns
    /// immediately; issuing the same move again with `wait == true` blocks
    /// until it completes.
    fn move_absolute(&self, position: f64, params: MoveParams) -> Result<(), AxisFault>;

    /// Blocking relative move by `delta` in raw motor direction.
    fn move_relative(&self, delta: f64) -> Result<(), AxisFault>;

    /// Blocking current-limited move.
    fn move_absolute_torque_limited(&self, request: &TorqueLimitedMove) -> Result<(), AxisFault>;

    /// Run the homing routine.
    fn home(&self, wait: bool) -> Result<(), AxisFault>;

    /// Clear faults and start homing without waiting.
    fn send_reset_and_home(&self) -> Result<(), AxisFault>;

    /// Wait up to `timeout` for a homing routine started earlier.
    fn wait_for_home_result(&self, timeout: Duration) -> Result<(), AxisFault>;

    /// Power the drive on or off.
    fn enable(&self, on: bool, blocking: bool) -> Result<(), AxisFault>;

    /// Clear a fault/pause latch.
    fn reset_pause(&self) -> Result<(), AxisFault>;

    /// Current position [mm].
    fn position_mm(&self) -> Result<f64, AxisFault>;

    /// Current position [encoder counts].
    fn position_counts(&self) -> Result<i64, AxisFault>;

    /// Instantaneous motor current register [controller internal units].
    fn read_current_raw(&self) -> Result<i16, AxisFault>;

    /// Whether the axis reports a completed homing routine.
    fn is_homed(&self) -> bool;

    /// Whether the drive is powered.
    fn is_on(&self) -> bool;

    /// Convert mm to the axis' native volume unit.
    fn mm_to_ul(&self, mm: f64) -> f64 {
        self.settings().mm_to_ul(mm)
    }

    /// Convert the axis' native volume unit to mm.
    fn ul_to_mm(&self, ul: f64) -> f64 {
        self.settings().ul_to_mm(ul)
    }

    /// Current position in the native volume unit.
    fn position_ul(&self) -> Result<f64, AxisFault> {
        Ok(self.mm_to_ul(self.position_mm()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_conversion_is_identity() {
        let settings = AxisSettings::new(100.0, 1000.0, 0.0, 100.0);
        assert_eq!(settings.mm_to_ul(12.5), 12.5);
        assert_eq!(settings.ul_to_mm(12.5), 12.5);
        assert!(!settings.is_volumetric());
    }

    #[test]
    fn test_volumetric_conversion() {
        let settings = AxisSettings::new(50.0, 500.0, 0.0, 60.0).volumetric(4.0);
        assert!((settings.mm_to_ul(2.5) - 10.0).abs() < f64::EPSILON);
        assert!((settings.ul_to_mm(10.0) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_top_limit_follows_flip() {
        let settings = AxisSettings::new(100.0, 1000.0, -5.0, 120.0);
        assert_eq!(settings.top_limit(), -5.0);
        assert_eq!(settings.flipped(true).top_limit(), 120.0);
    }

    #[test]
    fn test_counts_per_mm() {
        let mut settings = AxisSettings::new(100.0, 1000.0, 0.0, 100.0);
        settings.encoder_lines = 500;
        settings.mm_per_rev = 2.0;
        assert!((settings.counts_per_mm() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let settings = AxisSettings::new(100.0, 1000.0, 10.0, 5.0);
        assert!(settings.validate().is_err());
        let settings = AxisSettings::new(0.0, 1000.0, 0.0, 5.0);
        assert!(settings.validate().is_err());
        let settings = AxisSettings::new(10.0, 1000.0, 0.0, 5.0).volumetric(-1.0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_move_params_builder() {
        let params = MoveParams::new();
        assert!(params.wait);
        assert!(params.velocity.is_none());

        let params = MoveParams::new().velocity(20.0).acceleration(500.0).wait(false).trap(true);
        assert_eq!(params.velocity, Some(20.0));
        assert_eq!(params.acceleration, Some(500.0));
        assert!(!params.wait);
        assert!(params.use_trap);
    }

    #[test]
    fn test_settings_toml_defaults() {
        let settings: AxisSettings = toml::from_str(
            r#"
velocity = 300.0
acceleration = 2000.0
min_limit = 0.0
max_limit = 120.0
"#,
        )
        .unwrap();
        assert!(!settings.flip_direction);
        assert_eq!(settings.jerk, 10);
        assert_eq!(settings.encoder_lines, 500);
        assert!(settings.ul_per_mm.is_none());
    }

    #[test]
    fn test_fault_display_names_axis() {
        let fault = AxisFault::new(13, "position error");
        assert_eq!(fault.to_string(), "axis 13: position error");
    }
}
