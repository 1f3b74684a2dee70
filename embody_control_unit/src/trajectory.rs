//! Trajectory generation root.
//!
//! Position moves are delegated to a [`profile::TrajectoryStepper`];
//! velocity mode integrates a ramped velocity with sub-tick carry. The
//! result is clamped to the joint position limits.

pub mod desired;
pub mod limits;
pub mod profile;
pub mod velocity;
