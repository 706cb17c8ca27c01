//! Motion kernel error taxonomy.
//!
//! - Construction: [`MotionError::MissingAxis`], [`MotionError::InvalidFluidics`],
//!   [`MotionError::DuplicateRole`]
//! - Interlocks: [`MotionError::UnsafeMotion`], raised before any axis is commanded
//! - Tip press: [`MotionError::Press`]
//! - Hardware: [`MotionError::Axis`], the driver's fault passed through unchanged
//! - Machine assembly: [`MotionError::Hal`]

use lhk_common::hal::{AxisFault, IoFault};
use lhk_hal::HalError;
use thiserror::Error;

/// Why a tip press failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PressFailure {
    /// Torque-limited press travelled too far: nothing to press into.
    #[error("no tip present: stopped at {actual:.3}mm, expected {commanded:.3}mm ±{window:.1}mm")]
    NoTipPresent {
        /// Press position [mm].
        commanded: f64,
        /// Where the axis stopped [mm].
        actual: f64,
        /// Accepted window [mm].
        window: f64,
    },

    /// Torque-limited press stopped short: crashed into something.
    #[error("over-travel: stopped at {actual:.3}mm, expected {commanded:.3}mm ±{window:.1}mm")]
    OverTravel {
        /// Press position [mm].
        commanded: f64,
        /// Where the axis stopped [mm].
        actual: f64,
        /// Accepted window [mm].
        window: f64,
    },

    /// Position-limited press faulted on every attempt.
    #[error("failed to press tip after {attempts} attempts, last position error {position_error:.3}mm")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Press position [mm].
        commanded: f64,
        /// Final position [mm].
        actual: f64,
        /// `actual - commanded` [mm].
        position_error: f64,
    },
}

/// Error type for every motion kernel operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// A component references an axis id absent from the axis map.
    #[error("cannot create {component}: axis {axis_id} is not defined")]
    MissingAxis {
        /// Component being built, e.g. "arm 2".
        component: String,
        /// Missing axis id.
        axis_id: u8,
    },

    /// Fluidic bit indices are not pairwise distinct.
    #[error("invalid fluidic configuration for {component}: {reason}")]
    InvalidFluidics {
        /// Component being built.
        component: String,
        /// What collided.
        reason: String,
    },

    /// A role was bound twice in one group.
    #[error("role {role} already bound in group {group}")]
    DuplicateRole {
        /// Group id.
        group: u8,
        /// Role name.
        role: String,
    },

    /// A role is not bound in the group.
    #[error("group {group} has no axis with role {role}")]
    UnknownRole {
        /// Group id.
        group: u8,
        /// Role name.
        role: String,
    },

    /// Interlock violation; no axis was commanded.
    #[error("unsafe motion on {component}: {reason}")]
    UnsafeMotion {
        /// Component that refused the move.
        component: String,
        /// Which interlock tripped.
        reason: String,
    },

    /// Tip press failed.
    #[error("tip press on axis {axis_id} failed: {failure}")]
    Press {
        /// Z axis id.
        axis_id: u8,
        /// Failure detail.
        failure: PressFailure,
    },

    /// Hardware-motion-fault from an axis.
    #[error(transparent)]
    Axis(#[from] AxisFault),

    /// Fluidic output write failed.
    #[error("{component}: {source}")]
    Io {
        /// Component that switched the output.
        component: String,
        /// Port error.
        source: IoFault,
    },

    /// No teachpoint lookup has been injected.
    #[error("no teachpoints loaded for stage {stage}")]
    TeachpointsUnavailable {
        /// Stage id.
        stage: u8,
    },

    /// The lookup has no entry for the request.
    #[error("missing teachpoint: {0}")]
    TeachpointMissing(String),

    /// Caller supplied an out-of-range argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The simulated axis bank could not be built.
    #[error(transparent)]
    Hal(#[from] HalError),
}

impl MotionError {
    /// Interlock violation for `component`.
    pub fn unsafe_motion(component: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnsafeMotion {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error is an interlock violation.
    pub fn is_unsafe_motion(&self) -> bool {
        matches!(self, Self::UnsafeMotion { .. })
    }
}

/// Result alias for motion operations.
pub type MotionResult<T> = Result<T, MotionError>;
