//! Time-based hysteresis over the check signal.
//!
//! A transition commits only after a *contiguous* run of contrary signals has
//! lasted at least the rise (Down → Up) or fall (Up → Down) delay. One
//! agreeing observation cancels the run entirely; nothing carries over.
//!
//! ```text
//!   observe(s, now)
//!     s agrees with committed ─────────────▶ pending_since = None
//!     s contrary, nothing pending ─────────▶ pending_since = now
//!     s contrary, now - pending >= delay ──▶ committed = !committed, pending_since = None
//!     s contrary, now - pending <  delay ──▶ unchanged
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::config::HysteresisConfig;
use crate::types::{HealthState, ServiceState, Transition};

/// Debounce filter. Holds only the delays; the caller owns the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    rise_delay: Duration,
    fall_delay: Duration,
}

impl Debouncer {
    /// Creates a filter with explicit delays.
    #[must_use]
    pub const fn new(rise_delay: Duration, fall_delay: Duration) -> Self {
        Self {
            rise_delay,
            fall_delay,
        }
    }

    /// Creates a filter from validated timing parameters.
    #[must_use]
    pub const fn from_config(config: &HysteresisConfig) -> Self {
        Self::new(config.rise_delay, config.fall_delay)
    }

    /// Delay required to leave `from`.
    #[must_use]
    pub const fn delay_from(&self, from: HealthState) -> Duration {
        match from {
            HealthState::Down => self.rise_delay,
            HealthState::Up => self.fall_delay,
        }
    }

    /// Feeds one timestamped signal and returns the next state.
    ///
    /// Time that appears to run backwards counts as zero elapsed.
    #[must_use]
    pub fn observe(&self, state: ServiceState, success: bool, now: Instant) -> ServiceState {
        if state.committed.agrees_with(success) {
            return ServiceState {
                committed: state.committed,
                pending_since: None,
            };
        }

        let Some(since) = state.pending_since else {
            return ServiceState {
                committed: state.committed,
                pending_since: Some(now),
            };
        };

        if now.saturating_duration_since(since) >= self.delay_from(state.committed) {
            ServiceState {
                committed: HealthState::from_signal(success),
                pending_since: None,
            }
        } else {
            state
        }
    }

    /// Edge between two committed values, if any.
    #[must_use]
    pub const fn transition(before: HealthState, after: HealthState) -> Option<Transition> {
        match (before, after) {
            (HealthState::Down, HealthState::Up) => Some(Transition::Rose),
            (HealthState::Up, HealthState::Down) => Some(Transition::Fell),
            _ => None,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::from_config(&HysteresisConfig::default())
    }
}
