//! Hardware capability contracts.
//!
//! The motion kernel never talks to a motor controller directly. Drivers
//! (real or simulated) implement the traits in this module and are handed
//! to the kernel as `Arc<dyn Axis>` / `Arc<dyn OutputPort>`.

pub mod axis;
pub mod consts;
pub mod io;

pub use axis::{Axis, AxisFault, AxisSettings, MoveParams, TorqueLimitedMove};
pub use io::{IoFault, OutputPort};
