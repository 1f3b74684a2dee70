//! Control engine root.
//!
//! Fixed-point arithmetic, the shift-gain PID and the per-mode output
//! composition (position, torque, impedance, open loop, current cascade).

pub mod filters;
pub mod fixed;
pub mod history;
pub mod output;
pub mod pid;
