//! LHK Common Library
//!
//! Shared contracts used by every crate of the liquid-handling motion
//! kernel workspace.
//!
//! # Module Structure
//!
//! - [`hal`] - Axis capability and fluidic output-port traits
//! - [`teachpoint`] - Calibrated reference positions and their lookup
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use lhk_common::prelude::*;
//! ```

pub mod config;
pub mod hal;
pub mod prelude;
pub mod teachpoint;
