//! # emBODY Joint Control Unit Library
//!
//! Fixed-point joint control core for a motor-control board driving up to
//! twelve joints. Every tick reads encoder, strain and current feedback,
//! applies queued commands, advances the trajectory, runs the PID loops of
//! the active control mode, and writes one PWM duty per joint.
//!
//! ## Layers
//!
//! 1. **ControllerBank**: board-wide tick over all joints
//! 2. **ModeStateMachine**: per-joint control mode
//! 3. **Trajectory**: position stepper, velocity ramp, limit enforcer
//! 4. **Control**: 16-bit saturating PID, output composition per mode
//! 5. **Safety**: fault latching, I²T, hard-stop detection
//!
//! ## Zero-Allocation Tick
//!
//! All joint state is allocated in fixed-capacity `heapless` containers at
//! startup. The tick performs no heap allocation and never blocks.
//!
//! ```rust
//! use embody_control_unit::config::load_board_config_from_str;
//! use embody_control_unit::sim::{PlantParams, SimulatedBoard};
//! use embody_control_unit::state::bank::ControllerBank;
//! use embody_common::control_unit::command::JointCommand;
//! use embody_common::control_unit::state::ControlMode;
//!
//! let loaded = load_board_config_from_str("[[joints]]\nid = 0\n").unwrap();
//! let mut bank = ControllerBank::with_linear_profile(&loaded.board).unwrap();
//! let mut board = SimulatedBoard::new(&loaded.board, PlantParams::default());
//!
//! bank.submit(0, JointCommand::SetControlMode(ControlMode::Position)).unwrap();
//! bank.tick(&mut board);
//! assert_eq!(bank.status(0).unwrap().mode, ControlMode::Position);
//! ```

#![deny(clippy::disallowed_types)]

pub mod config;
pub mod control;
pub mod cycle;
pub mod safety;
pub mod sim;
pub mod state;
pub mod trajectory;
