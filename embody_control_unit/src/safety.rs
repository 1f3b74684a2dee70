//! Safety module root.
//!
//! I²T overcurrent integration, fault latching, in-position and hard-stop
//! detection.

pub mod i2t;
pub mod monitor;
