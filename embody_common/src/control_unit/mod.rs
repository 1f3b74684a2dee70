//! Joint control shared types.
//!
//! Everything the control core, the board runner and the board drivers need
//! to agree on: control modes and board profiles, fault bitflags, joint and
//! board configuration, external commands and the published joint status.

pub mod command;
pub mod config;
pub mod error;
pub mod state;
pub mod status;
