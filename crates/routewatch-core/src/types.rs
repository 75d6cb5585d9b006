//! Core types for the health watcher.
//!
//! Explicit state machines, no implicit transitions. All timestamps are
//! monotonic [`Instant`]s.

use tokio::time::Instant;

/// Committed health of the watched service.
///
/// ```text
///        contiguous `true` for >= rise_delay
///  Down ─────────────────────────────────────▶ Up
///   ▲                                          │
///   └──────────────────────────────────────────┘
///        contiguous `false` for >= fall_delay
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HealthState {
    /// Route withdrawn. Every process starts here.
    #[default]
    Down,
    /// Route advertised.
    Up,
}

impl HealthState {
    /// Returns true for [`HealthState::Up`].
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }

    /// Returns the state a check result argues for.
    #[must_use]
    pub const fn from_signal(success: bool) -> Self {
        if success { Self::Up } else { Self::Down }
    }

    /// Returns true if a check result agrees with this state.
    #[must_use]
    pub const fn agrees_with(self, success: bool) -> bool {
        self.is_up() == success
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Down => f.write_str("down"),
            Self::Up => f.write_str("up"),
        }
    }
}

/// Debounced service state: the committed value plus the start of the
/// current contrary streak, if any.
///
/// `pending_since` is `None` whenever the last observation agreed with
/// `committed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceState {
    /// Value the artifact reflects.
    pub committed: HealthState,
    /// First timestamp of the current contrary streak.
    pub pending_since: Option<Instant>,
}

impl ServiceState {
    /// The startup state: `Down`, nothing pending.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            committed: HealthState::Down,
            pending_since: None,
        }
    }

    /// Returns true if a contrary streak is in progress.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Whether the check command exited with status 0.
    pub success: bool,
    /// When the outcome was observed.
    pub observed_at: Instant,
}

impl CheckOutcome {
    /// Creates an outcome observed at `observed_at`.
    #[must_use]
    pub const fn new(success: bool, observed_at: Instant) -> Self {
        Self {
            success,
            observed_at,
        }
    }
}

/// Edge produced by a committed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Down → Up.
    Rose,
    /// Up → Down.
    Fell,
}

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Sleeping until the next tick; termination requests are honoured here.
    Waiting,
    /// Running check, debounce, render and write. Never interrupted.
    Evaluating,
}

/// Termination signals understood by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Interrupt (graceful shutdown).
    Int,
    /// Quit (graceful shutdown).
    Quit,
    /// Terminate (graceful shutdown).
    Term,
}

/// Reason the control loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Shutdown requested through [`crate::WatchContext::request_shutdown`].
    Graceful,
    /// Received a termination signal.
    Signal(Signal),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_health_state_default_is_down() {
        assert_eq!(HealthState::default(), HealthState::Down);
        assert!(!HealthState::Down.is_up());
        assert!(HealthState::Up.is_up());
    }

    #[test]
    fn test_health_state_agreement() {
        assert!(HealthState::Up.agrees_with(true));
        assert!(HealthState::Down.agrees_with(false));
        assert!(!HealthState::Up.agrees_with(false));
        assert!(!HealthState::Down.agrees_with(true));
        assert_eq!(HealthState::from_signal(true), HealthState::Up);
        assert_eq!(HealthState::from_signal(false), HealthState::Down);
    }

    #[test]
    fn test_health_state_display() {
        assert_eq!(HealthState::Up.to_string(), "up");
        assert_eq!(HealthState::Down.to_string(), "down");
    }

    #[test]
    fn test_service_state_initial() {
        let state = ServiceState::initial();
        assert_eq!(state.committed, HealthState::Down);
        assert!(!state.is_pending());
        assert_eq!(state, ServiceState::default());
    }

    #[test]
    fn test_service_state_pending() {
        let state = ServiceState {
            committed: HealthState::Down,
            pending_since: Some(Instant::now()),
        };
        assert!(state.is_pending());
    }

    #[test]
    fn test_check_outcome_new() {
        let now = Instant::now();
        let outcome = CheckOutcome::new(true, now + Duration::from_secs(1));
        assert!(outcome.success);
        assert_eq!(outcome.observed_at, now + Duration::from_secs(1));
    }
}
