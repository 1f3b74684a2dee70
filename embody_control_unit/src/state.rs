//! Joint state module root.
//!
//! Per-joint context, the control mode state machine, and the controller
//! bank that runs the tick over all joints of a board.

pub mod bank;
pub mod joint;
pub mod mode;
