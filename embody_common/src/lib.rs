//! emBODY Common Library
//!
//! Shared constants, state enums, configuration structures and collaborator
//! interfaces for the emBODY joint control core.
//!
//! # Module Structure
//!
//! - [`consts`] - Fixed-point bounds, capacities and firmware defaults
//! - [`config`] - TOML configuration loading trait and error type
//! - [`control_unit`] - Control modes, board profiles, faults, commands, status
//! - [`hal`] - Feedback and actuator interfaces implemented by board drivers
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use embody_common::prelude::*;
//!
//! assert!(ControlMode::Position.runs_trajectory());
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;
