//! Digital output port contract.
//!
//! Used by wash stations to switch the fluidic lines (bath water, plenum
//! water, overflow exhaust, vacuum, air) addressed by bit index.

use thiserror::Error;

/// Error raised by an output port.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IoFault {
    /// Bit index outside the port's range.
    #[error("output bit {bit} out of range (port has {count} outputs)")]
    BitOutOfRange {
        /// Requested bit.
        bit: usize,
        /// Number of outputs on the port.
        count: usize,
    },

    /// Communication with the I/O module failed.
    #[error("I/O communication error: {0}")]
    CommunicationError(String),
}

/// A bank of digital outputs.
pub trait OutputPort: Send + Sync {
    /// Switch output `bit` on or off.
    fn set_output_state(&self, bit: usize, on: bool) -> Result<(), IoFault>;
}
