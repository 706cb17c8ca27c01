//! HAL driver implementations.
//!
//! - [`simulation`] - Software simulation for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `lhk_common::hal::Axis` (and `OutputPort` if the module has I/O)
//! 3. Extend [`crate::bank::AxisBank`] to construct it from configuration

pub mod simulation;
