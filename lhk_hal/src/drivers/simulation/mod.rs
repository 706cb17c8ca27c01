//! Simulation driver module.
//!
//! Software axes and outputs for development and testing without
//! physical hardware.

mod axis;
mod io;
mod physics;

pub use axis::{AxisCommand, SimAxis};
pub use io::SimOutputPort;
pub use physics::profile_duration;
