//! Per-joint control mode state machine.
//!
//! External commands request a mode; the fault monitor and hard-stop
//! detection push internal events. `HandleHardStops` is a one-tick state
//! that always resolves to `Idle`.

use embody_common::control_unit::state::{BoardProfile, ControlMode};

/// Result of a mode transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition accepted, carrying the new mode.
    Ok(ControlMode),
    /// Transition rejected with a reason.
    Rejected(&'static str),
}

/// Event that can change the control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    /// External mode request.
    Command(ControlMode),
    /// A critical fault is latched.
    CriticalFault,
    /// Hard stop found during `CalibHardStops`.
    HardStopReached,
    /// The `HandleHardStops` tick completed.
    HardStopsHandled,
}

/// Board-level context needed to judge a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeGuard {
    pub profile: BoardProfile,
    /// A critical fault is latched on this joint.
    pub faulted: bool,
}

/// Holds the single active mode of a joint.
#[derive(Debug, Clone)]
pub struct ModeStateMachine {
    mode: ControlMode,
}

impl Default for ModeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeStateMachine {
    pub const fn new() -> Self {
        Self {
            mode: ControlMode::Idle,
        }
    }

    #[inline]
    pub const fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Attempt a transition.
    ///
    /// Returns `TransitionResult::Ok(new_mode)` on success (possibly the
    /// unchanged mode), `TransitionResult::Rejected(reason)` otherwise.
    pub fn handle_event(&mut self, event: ModeEvent, guard: ModeGuard) -> TransitionResult {
        use ControlMode::*;
        use ModeEvent::*;

        let next = match (self.mode, event) {
            // One-shot hard stop handling always lands in Idle.
            (HandleHardStops, HardStopsHandled) => Idle,
            (_, HardStopsHandled) => return TransitionResult::Rejected("no hard stop handling in progress"),

            // Fault escalation.
            (Idle, CriticalFault) => Idle,
            (_, CriticalFault) => HandleHardStops,

            (CalibHardStops, HardStopReached) => HandleHardStops,
            (_, HardStopReached) => return TransitionResult::Rejected("not calibrating hard stops"),

            (_, Command(req)) if !guard.profile.supports(req) => {
                return TransitionResult::Rejected("mode not supported by board profile");
            }
            (_, Command(req)) if guard.faulted && !req.allowed_while_faulted() => {
                return TransitionResult::Rejected("fault latched");
            }
            (HandleHardStops, Command(req)) if !req.allowed_while_faulted() => {
                return TransitionResult::Rejected("hard stop handling pending");
            }
            (_, Command(req)) => req,
        };

        self.mode = next;
        TransitionResult::Ok(next)
    }

    /// Force a mode without checks (initialization and tests).
    #[inline]
    pub fn force(&mut self, mode: ControlMode) {
        self.mode = mode;
    }
}

/// True when a transition from `from` to `to` leaves `Idle`.
#[inline]
pub const fn leaves_idle(from: ControlMode, to: ControlMode) -> bool {
    matches!(from, ControlMode::Idle) && !matches!(to, ControlMode::Idle)
}
