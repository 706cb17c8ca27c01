//! # LHK Motion Kernel
//!
//! Coordinates the servo axes of a liquid-handling instrument: arms that
//! pick, press, aspirate and dispense, stages that position labware
//! under them, and wash stations that clean tips. Every primitive is a
//! blocking call that either completes the physical move or returns a
//! [`MotionError`] with enough context to act on.
//!
//! ## Components
//!
//! - [`group::AxisGroup`] binds roles to axes and caches their status
//! - [`arm::Arm`] (X/Z/W): synchronized transfer and tip press
//! - [`stage::Stage`] (Y/R): teachpoint-driven positioning
//! - [`wash_station::WashStation`]: interlocked wash head, fluidics, tip grid
//! - [`tip_grid::TipGrid`]: tip inventory with atomic reservation
//! - [`topology::Topology`]: registry of all of the above
//!
//! ## Concurrency
//!
//! Callers drive different arms and stages from different threads. The
//! only cross-component coordination lives in [`permit::HomingPermits`]
//! (X homes) and [`tip_grid::TipGrid::reserve_tip`].

pub mod arm;
pub mod config;
pub mod error;
pub mod group;
pub mod machine;
pub mod permit;
pub mod stage;
pub mod tip_grid;
pub mod topology;
pub mod wash_station;

pub use crate::arm::{Arm, PressRequest, PressStrategy, TipState, TransferKind, TransferRequest};
pub use crate::error::{MotionError, MotionResult, PressFailure};
pub use crate::group::{AxisGroup, AxisStatus, MotionGroup};
pub use crate::machine::Machine;
pub use crate::permit::HomingPermits;
pub use crate::stage::{Plate, Stage, StageMotion};
pub use crate::tip_grid::{SlotIndex, SlotState, TipGrid};
pub use crate::topology::Topology;
pub use crate::wash_station::{FluidicsConfig, WashStation, WashStationState};
