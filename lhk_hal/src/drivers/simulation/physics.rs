//! Move-time model for simulated axes.
//!
//! Simulated moves are applied instantly; this module only decides how
//! long a blocking call should take so that timing-sensitive callers
//! (homing budgets, concurrent arms) see realistic durations.

use std::time::Duration;

/// Duration of a point-to-point move under a trapezoidal velocity profile.
///
/// Short moves never reach `max_velocity` and follow a triangular profile
/// (accelerate for half the distance, decelerate for the other half).
/// Non-positive limits yield a zero duration.
pub fn profile_duration(distance: f64, max_velocity: f64, max_acceleration: f64) -> Duration {
    let distance = distance.abs();
    if distance == 0.0 || !(max_velocity > 0.0) || !(max_acceleration > 0.0) {
        return Duration::ZERO;
    }

    // Distance covered while accelerating to max velocity and back to rest
    let ramp_distance = max_velocity * max_velocity / max_acceleration;
    let seconds = if distance <= ramp_distance {
        // Triangular profile
        2.0 * (distance / max_acceleration).sqrt()
    } else {
        // Accelerate, cruise, decelerate
        distance / max_velocity + max_velocity / max_acceleration
    };

    Duration::from_secs_f64(seconds)
}
