//! Control-loop counters.
//!
//! Owned by the scheduler alongside the service state, so plain integers are
//! enough. Reported in the shutdown summary.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::Transition;

/// Counters for ticks, check latency, failures and transitions.
#[derive(Debug, Clone)]
pub struct WatchMetrics {
    ticks_total: u64,
    check_failures_total: u64,
    write_failures_total: u64,
    rises_total: u64,
    falls_total: u64,
    check_duration_sum: Duration,
    check_duration_max: Duration,
    start_time: Instant,
}

impl WatchMetrics {
    /// Creates an empty collector starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticks_total: 0,
            check_failures_total: 0,
            write_failures_total: 0,
            rises_total: 0,
            falls_total: 0,
            check_duration_sum: Duration::ZERO,
            check_duration_max: Duration::ZERO,
            start_time: Instant::now(),
        }
    }

    /// Records one evaluated tick.
    pub fn record_tick(&mut self, success: bool, check_duration: Duration) {
        self.ticks_total += 1;
        if !success {
            self.check_failures_total += 1;
        }
        self.check_duration_sum += check_duration;
        self.check_duration_max = self.check_duration_max.max(check_duration);
    }

    /// Records a failed artifact write.
    pub fn record_write_failure(&mut self) {
        self.write_failures_total += 1;
    }

    /// Records a committed state change.
    pub fn record_transition(&mut self, transition: Transition) {
        match transition {
            Transition::Rose => self.rises_total += 1,
            Transition::Fell => self.falls_total += 1,
        }
    }

    /// Ticks evaluated so far.
    #[must_use]
    pub const fn ticks_total(&self) -> u64 {
        self.ticks_total
    }

    /// Ticks whose check reported unhealthy.
    #[must_use]
    pub const fn check_failures_total(&self) -> u64 {
        self.check_failures_total
    }

    /// Failed artifact writes.
    #[must_use]
    pub const fn write_failures_total(&self) -> u64 {
        self.write_failures_total
    }

    /// Down → Up transitions.
    #[must_use]
    pub const fn rises_total(&self) -> u64 {
        self.rises_total
    }

    /// Up → Down transitions.
    #[must_use]
    pub const fn falls_total(&self) -> u64 {
        self.falls_total
    }

    /// Mean check latency.
    #[must_use]
    pub fn check_duration_avg(&self) -> Duration {
        match u32::try_from(self.ticks_total) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.check_duration_sum / count,
            Err(_) => Duration::from_secs_f64(
                self.check_duration_sum.as_secs_f64() / self.ticks_total as f64,
            ),
        }
    }

    /// Slowest check seen.
    #[must_use]
    pub const fn check_duration_max(&self) -> Duration {
        self.check_duration_max
    }

    /// Time since the collector was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for WatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
