//! Simulated axis.
//!
//! `SimAxis` implements the blocking [`Axis`] contract on top of an
//! in-memory state:
//! - Moves land instantly; blocking calls sleep for the profile time
//!   scaled by `time_scale` (0 = no sleeping)
//! - Velocity/acceleration ceilings and soft limits are enforced like a
//!   real drive, raising [`AxisFault`]
//! - Homing takes `home_duration` and honours the caller's wait budget
//! - Every command is journaled so tests can assert what was issued
//! - Faults and torque-limited stop positions can be scripted

use lhk_common::hal::{Axis, AxisFault, AxisSettings, MoveParams, TorqueLimitedMove};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::physics::profile_duration;

/// Tolerance used when comparing positions and ceilings.
const EPSILON: f64 = 1e-9;

/// Command received by a simulated axis.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisCommand {
    /// `move_absolute` (position in native units).
    MoveAbsolute {
        /// Commanded position.
        position: f64,
        /// Parameters as received.
        params: MoveParams,
    },
    /// `move_relative` (delta in native units).
    MoveRelative {
        /// Commanded displacement.
        delta: f64,
    },
    /// `move_absolute_torque_limited`.
    MoveTorqueLimited(TorqueLimitedMove),
    /// `home`.
    Home,
    /// `send_reset_and_home`.
    ResetAndHome,
    /// `enable`.
    Enable(bool),
    /// `reset_pause`.
    ResetPause,
    /// `read_current_raw`, with the value returned.
    ReadCurrent(i16),
}

impl AxisCommand {
    /// Whether this command sets the axis in motion.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::MoveAbsolute { .. }
                | Self::MoveRelative { .. }
                | Self::MoveTorqueLimited(_)
                | Self::Home
                | Self::ResetAndHome
        )
    }
}

/// Fault armed for blocking moves to one target.
#[derive(Debug, Clone)]
struct ScriptedFault {
    /// Target (native units) that triggers the fault.
    target: f64,
    /// Remaining number of triggers.
    remaining: u32,
    /// Position [mm] the axis is left at.
    stop_at: Option<f64>,
    /// Fault message.
    message: String,
}

/// Mutable part of the simulated drive.
#[derive(Debug)]
struct SimState {
    /// Position [mm].
    position: f64,
    /// Drive powered.
    enabled: bool,
    /// Homing completed.
    homed: bool,
    /// Start of an in-flight homing routine.
    homing_started: Option<Instant>,
    /// Next homing attempt fails with this message.
    home_fault: Option<String>,
    /// Where a torque-limited move stops [mm]; `None` = reaches destination.
    torque_stop: Option<f64>,
    /// Current register value reported by `read_current_raw`.
    current_raw: i16,
    /// Armed faults.
    scripted_faults: VecDeque<ScriptedFault>,
    /// Received commands.
    journal: Vec<AxisCommand>,
}

/// Simulated axis providing the blocking [`Axis`] contract.
#[derive(Debug)]
pub struct SimAxis {
    /// Axis id
    id: u8,
    /// Axis name
    name: String,
    /// Motion limits
    settings: AxisSettings,
    /// Time a homing routine takes
    home_duration: Duration,
    /// Factor applied to simulated move times (0 = instant)
    time_scale: f64,
    /// Drive state
    state: Mutex<SimState>,
}

impl SimAxis {
    /// Create an unhomed, disabled axis at position 0.
    pub fn new(id: u8, name: impl Into<String>, settings: AxisSettings) -> Self {
        Self {
            id,
            name: name.into(),
            settings,
            home_duration: Duration::ZERO,
            time_scale: 0.0,
            state: Mutex::new(SimState {
                position: 0.0,
                enabled: false,
                homed: false,
                homing_started: None,
                home_fault: None,
                torque_stop: None,
                current_raw: 0,
                scripted_faults: VecDeque::new(),
                journal: Vec::new(),
            }),
        }
    }

    /// Same axis with a homing duration.
    pub fn with_home_duration(mut self, duration: Duration) -> Self {
        self.home_duration = duration;
        self
    }

    /// Same axis with blocking moves taking `scale` × profile time.
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale.max(0.0);
        self
    }

    /// Force the position [mm] (state restore / test setup).
    pub fn set_position(&self, position_mm: f64) {
        self.state.lock().position = position_mm;
    }

    /// Force the homed flag.
    pub fn set_homed(&self, homed: bool) {
        self.state.lock().homed = homed;
    }

    /// Value returned by the next current-register reads.
    pub fn set_current_raw(&self, raw: i16) {
        self.state.lock().current_raw = raw;
    }

    /// Where torque-limited moves stop [mm]; `None` lets them reach the destination.
    pub fn set_torque_stop(&self, position_mm: Option<f64>) {
        self.state.lock().torque_stop = position_mm;
    }

    /// Make the next `times` blocking absolute moves to `target` fault.
    ///
    /// The axis is left at `stop_at` [mm] (or where it started).
    pub fn fail_moves_to(&self, target: f64, times: u32, stop_at: Option<f64>) {
        if times == 0 {
            return;
        }
        self.state.lock().scripted_faults.push_back(ScriptedFault {
            target,
            remaining: times,
            stop_at,
            message: format!("position error exceeded while moving to {target:.3}"),
        });
    }

    /// Make the next homing attempt fault.
    pub fn fail_next_home(&self, message: impl Into<String>) {
        self.state.lock().home_fault = Some(message.into());
    }

    /// All commands received so far.
    pub fn commands(&self) -> Vec<AxisCommand> {
        self.state.lock().journal.clone()
    }

    /// Number of motion commands received so far.
    pub fn motion_command_count(&self) -> usize {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|c| c.is_motion())
            .count()
    }

    /// Forget the journal.
    pub fn clear_commands(&self) {
        self.state.lock().journal.clear();
    }

    fn fault(&self, message: impl Into<String>) -> AxisFault {
        let fault = AxisFault::new(self.id, message);
        debug!("Axis {} fault: {}", self.name, fault.message);
        fault
    }

    /// Reject parameters a real drive would refuse.
    fn check_move(&self, target_mm: f64, params: &MoveParams) -> Result<(), AxisFault> {
        if target_mm < self.settings.min_limit - EPSILON
            || target_mm > self.settings.max_limit + EPSILON
        {
            return Err(self.fault(format!(
                "target {:.3}mm outside soft limits [{:.3}, {:.3}]",
                target_mm, self.settings.min_limit, self.settings.max_limit
            )));
        }
        if params.ignore_motion_parameters {
            return Ok(());
        }
        if let Some(velocity) = params.velocity {
            let velocity_mm = self.settings.ul_to_mm(velocity);
            if !velocity_mm.is_finite() || velocity_mm > self.settings.velocity + EPSILON {
                return Err(self.fault(format!(
                    "velocity {:.3}mm/s exceeds ceiling {:.3}mm/s",
                    velocity_mm, self.settings.velocity
                )));
            }
        }
        if let Some(acceleration) = params.acceleration {
            if !acceleration.is_finite() || acceleration > self.settings.acceleration + EPSILON {
                return Err(self.fault(format!(
                    "acceleration {:.3}mm/s² exceeds ceiling {:.3}mm/s²",
                    acceleration, self.settings.acceleration
                )));
            }
        }
        Ok(())
    }

    /// Block for the simulated travel time.
    fn travel(&self, distance_mm: f64, velocity: f64, acceleration: f64) {
        if self.time_scale <= 0.0 {
            return;
        }
        let duration = profile_duration(distance_mm, velocity, acceleration);
        std::thread::sleep(duration.mul_f64(self.time_scale));
    }
}

impl Axis for SimAxis {
    fn id(&self) -> u8 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &AxisSettings {
        &self.settings
    }

    fn move_absolute(&self, position: f64, params: MoveParams) -> Result<(), AxisFault> {
        let target_mm = self.settings.ul_to_mm(position);
        let distance = {
            let mut state = self.state.lock();
            state.journal.push(AxisCommand::MoveAbsolute { position, params });
            self.check_move(target_mm, &params)?;

            if params.wait {
                let armed = state
                    .scripted_faults
                    .iter()
                    .position(|f| (f.target - position).abs() < EPSILON);
                if let Some(index) = armed {
                    let (stop_at, message) = {
                        let fault = &mut state.scripted_faults[index];
                        fault.remaining -= 1;
                        (fault.stop_at, fault.message.clone())
                    };
                    if state.scripted_faults[index].remaining == 0 {
                        state.scripted_faults.remove(index);
                    }
                    if let Some(stop) = stop_at {
                        state.position = stop;
                    }
                    return Err(self.fault(message));
                }
            }

            let distance = (target_mm - state.position).abs();
            state.position = target_mm;
            distance
        };

        trace!(
            "Axis {}: move_absolute target={:.3}mm wait={}",
            self.name, target_mm, params.wait
        );

        if params.wait {
            let velocity = params
                .velocity
                .map(|v| self.settings.ul_to_mm(v))
                .unwrap_or(self.settings.velocity);
            let acceleration = params.acceleration.unwrap_or(self.settings.acceleration);
            self.travel(distance, velocity, acceleration);
        }
        Ok(())
    }

    fn move_relative(&self, delta: f64) -> Result<(), AxisFault> {
        let delta_mm = self.settings.ul_to_mm(delta);
        {
            let mut state = self.state.lock();
            state.journal.push(AxisCommand::MoveRelative { delta });
            let target_mm = state.position + delta_mm;
            self.check_move(target_mm, &MoveParams::default())?;
            state.position = target_mm;
        }
        self.travel(delta_mm, self.settings.velocity, self.settings.acceleration);
        Ok(())
    }

    fn move_absolute_torque_limited(&self, request: &TorqueLimitedMove) -> Result<(), AxisFault> {
        let distance = {
            let mut state = self.state.lock();
            state.journal.push(AxisCommand::MoveTorqueLimited(*request));
            self.check_move(request.destination, &MoveParams::default())?;
            let stop = state.torque_stop.unwrap_or(request.destination);
            let distance = (stop - state.position).abs();
            state.position = stop;
            distance
        };
        debug!(
            "Axis {}: torque-limited move toward {:.3}mm stopped after {:.3}mm",
            self.name, request.destination, distance
        );
        self.travel(distance, request.velocity, request.acceleration);
        Ok(())
    }

    fn home(&self, wait: bool) -> Result<(), AxisFault> {
        {
            let mut state = self.state.lock();
            state.journal.push(AxisCommand::Home);
            if let Some(message) = state.home_fault.take() {
                state.homed = false;
                return Err(self.fault(message));
            }
            state.homed = false;
            state.homing_started = Some(Instant::now());
        }
        if wait {
            self.wait_for_home_result(self.home_duration + Duration::from_secs(1))
        } else {
            Ok(())
        }
    }

    fn send_reset_and_home(&self) -> Result<(), AxisFault> {
        let mut state = self.state.lock();
        state.journal.push(AxisCommand::ResetAndHome);
        state.homed = false;
        state.homing_started = Some(Instant::now());
        debug!("Axis {} reset and homing", self.name);
        Ok(())
    }

    fn wait_for_home_result(&self, timeout: Duration) -> Result<(), AxisFault> {
        let started = {
            let mut state = self.state.lock();
            if let Some(message) = state.home_fault.take() {
                state.homing_started = None;
                return Err(self.fault(message));
            }
            match state.homing_started {
                Some(started) => started,
                None if state.homed => return Ok(()),
                None => return Err(self.fault("no homing routine in progress")),
            }
        };

        let needed = self.home_duration.saturating_sub(started.elapsed());
        if needed > timeout {
            std::thread::sleep(timeout);
            return Err(self.fault(format!(
                "homing did not complete within {}ms",
                timeout.as_millis()
            )));
        }
        std::thread::sleep(needed);

        let mut state = self.state.lock();
        state.homing_started = None;
        state.homed = true;
        state.position = 0.0;
        debug!("Axis {} homed", self.name);
        Ok(())
    }

    fn enable(&self, on: bool, _blocking: bool) -> Result<(), AxisFault> {
        let mut state = self.state.lock();
        state.journal.push(AxisCommand::Enable(on));
        state.enabled = on;
        debug!("Axis {} {}", self.name, if on { "enabled" } else { "disabled" });
        Ok(())
    }

    fn reset_pause(&self) -> Result<(), AxisFault> {
        self.state.lock().journal.push(AxisCommand::ResetPause);
        Ok(())
    }

    fn position_mm(&self) -> Result<f64, AxisFault> {
        Ok(self.state.lock().position)
    }

    fn position_counts(&self) -> Result<i64, AxisFault> {
        let position = self.state.lock().position;
        Ok((position * self.settings.counts_per_mm()).round() as i64)
    }

    fn read_current_raw(&self) -> Result<i16, AxisFault> {
        let mut state = self.state.lock();
        let raw = state.current_raw;
        state.journal.push(AxisCommand::ReadCurrent(raw));
        Ok(raw)
    }

    fn is_homed(&self) -> bool {
        self.state.lock().homed
    }

    fn is_on(&self) -> bool {
        self.state.lock().enabled
    }
}
