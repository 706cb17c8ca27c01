//! # LHK HAL Library
//!
//! Simulated hardware for the liquid-handling motion kernel.
//!
//! The kernel only ever sees `Arc<dyn Axis>` and `Arc<dyn OutputPort>`
//! (defined in `lhk_common::hal`). This crate supplies stand-ins that
//! behave like the real drives closely enough for bring-up, CI and
//! scripted failure testing.
//!
//! # Module Structure
//!
//! - [`bank`] - Builds the validated axis-id → axis map from configuration
//! - [`drivers`] - Driver implementations (currently: simulation)
//! - [`error`] - HAL error types

#![deny(missing_docs)]

pub mod bank;
pub mod drivers;
pub mod error;

pub use crate::bank::{AxisBank, AxisMap, SimAxisConfig};
pub use crate::drivers::simulation::{AxisCommand, SimAxis, SimOutputPort};
pub use crate::error::HalError;
