//! HAL error types.

use thiserror::Error;

/// Error types for HAL construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Two axis definitions share one id
    #[error("Duplicate axis id: {0}")]
    DuplicateAxis(u8),

    /// Axis settings failed validation
    #[error("Invalid settings for axis {axis_id}: {reason}")]
    InvalidSettings {
        /// Offending axis.
        axis_id: u8,
        /// Validation message.
        reason: String,
    },
}
