//! The control loop.
//!
//! One task owns the [`ServiceState`] and drives it at a fixed cadence:
//!
//! ```text
//!   Waiting ──(poll interval elapsed)──▶ Evaluating ──(check, debounce, render, write)──▶ Waiting
//!      │
//!      └──(termination request)──▶ exit
//! ```
//!
//! Termination requests are only looked at in `Waiting`, so a tick that has
//! started always finishes, including its write.

use std::time::Duration;

use tokio::time::Instant;

use crate::check::HealthCheck;
use crate::config::{HysteresisConfig, MAX_DURATION, WatchConfig};
use crate::context::WatchContext;
use crate::debounce::Debouncer;
use crate::metrics::WatchMetrics;
use crate::render::ConfigRenderer;
use crate::types::{CheckOutcome, ExitReason, HealthState, Phase, ServiceState, Transition};
use crate::writer::AtomicWriter;

/// Result of one evaluated tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Raw check result and when it was observed.
    pub outcome: CheckOutcome,
    /// State after debouncing.
    pub state: ServiceState,
    /// Committed edge, if this tick produced one.
    pub transition: Option<Transition>,
    /// Whether the artifact write succeeded.
    pub write_ok: bool,
}

/// Periodic check → debounce → render → write loop.
pub struct Scheduler<C> {
    service: String,
    check: C,
    debouncer: Debouncer,
    renderer: ConfigRenderer,
    writer: AtomicWriter,
    poll_interval: Duration,
    state: ServiceState,
    phase: Phase,
    metrics: WatchMetrics,
    write_failing: bool,
}

impl<C: HealthCheck> Scheduler<C> {
    /// Creates a scheduler starting in [`HealthState::Down`].
    ///
    /// Logs are labelled with the renderer's function name until
    /// [`Scheduler::with_service_name`] sets another label.
    #[must_use]
    pub fn new(
        check: C,
        timing: &HysteresisConfig,
        renderer: ConfigRenderer,
        writer: AtomicWriter,
    ) -> Self {
        Self {
            service: renderer.function_name().to_string(),
            check,
            debouncer: Debouncer::from_config(timing),
            renderer,
            writer,
            poll_interval: timing.poll_interval.min(MAX_DURATION),
            state: ServiceState::initial(),
            phase: Phase::Waiting,
            metrics: WatchMetrics::new(),
            write_failing: false,
        }
    }

    /// Creates a scheduler from a validated configuration.
    #[must_use]
    pub fn from_config(check: C, config: &WatchConfig) -> Self {
        Self::new(
            check,
            &config.hysteresis(),
            ConfigRenderer::new(config.function_name.clone()),
            AtomicWriter::new(&config.output_path),
        )
        .with_service_name(config.service_name())
    }

    /// Sets the label attached to log lines.
    #[must_use]
    pub fn with_service_name(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Label attached to log lines.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Current service state.
    #[must_use]
    pub const fn state(&self) -> ServiceState {
        self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Loop counters.
    #[must_use]
    pub const fn metrics(&self) -> &WatchMetrics {
        &self.metrics
    }

    /// Artifact writer.
    #[must_use]
    pub const fn writer(&self) -> &AtomicWriter {
        &self.writer
    }

    /// Renders and writes the committed state. Returns whether the write
    /// succeeded; failures are logged and counted, never propagated.
    pub fn publish(&mut self) -> bool {
        let text = self.renderer.render(self.state.committed);
        match self.writer.write(&text) {
            Ok(()) => {
                if self.write_failing {
                    tracing::info!(
                        service = %self.service,
                        path = %self.writer.path().display(),
                        "artifact write recovered"
                    );
                }
                self.write_failing = false;
                true
            }
            Err(e) => {
                tracing::warn!(
                    service = %self.service,
                    error = %e,
                    "artifact write failed, keeping previous file"
                );
                self.metrics.record_write_failure();
                self.write_failing = true;
                false
            }
        }
    }

    /// Runs one full tick: check, debounce, render, write.
    pub async fn tick(&mut self) -> TickReport {
        let started = Instant::now();
        let success = self.check.check().await;
        let observed_at = Instant::now();
        self.metrics
            .record_tick(success, observed_at.saturating_duration_since(started));

        self.evaluate(CheckOutcome::new(success, observed_at))
    }

    /// Feeds one observation through debounce, render and write.
    pub fn evaluate(&mut self, outcome: CheckOutcome) -> TickReport {
        let before = self.state.committed;
        let was_pending = self.state.is_pending();
        self.state = self
            .debouncer
            .observe(self.state, outcome.success, outcome.observed_at);

        let transition = Debouncer::transition(before, self.state.committed);
        match transition {
            Some(edge) => {
                self.metrics.record_transition(edge);
                tracing::info!(
                    service = %self.service,
                    from = %before,
                    to = %self.state.committed,
                    "service state changed"
                );
            }
            None if self.state.is_pending() && !was_pending => {
                tracing::debug!(
                    service = %self.service,
                    committed = %self.state.committed,
                    delay = ?self.debouncer.delay_from(self.state.committed),
                    "contrary signal, streak started"
                );
            }
            None if was_pending && !self.state.is_pending() => {
                tracing::debug!(
                    service = %self.service,
                    committed = %self.state.committed,
                    "streak broken"
                );
            }
            None => {}
        }

        let write_ok = self.publish();
        TickReport {
            outcome,
            state: self.state,
            transition,
            write_ok,
        }
    }

    /// Runs until a termination request arrives.
    ///
    /// The initial `Down` artifact is written before the first check, and the
    /// first tick runs immediately. Ticks start `poll_interval` apart; a tick
    /// that overruns is followed by the next one without any catch-up burst.
    pub async fn run(&mut self, ctx: &mut WatchContext) -> ExitReason {
        tracing::info!(
            service = %self.service,
            path = %self.writer.path().display(),
            poll_interval = ?self.poll_interval,
            rise_delay = ?self.debouncer.delay_from(HealthState::Down),
            fall_delay = ?self.debouncer.delay_from(HealthState::Up),
            "watch loop starting"
        );
        self.publish();

        let mut next_tick = Instant::now();
        let reason = loop {
            self.phase = Phase::Waiting;
            if ctx.should_shutdown() {
                break ExitReason::Graceful;
            }

            tokio::select! {
                biased;
                Some(signal) = ctx.recv_signal() => {
                    tracing::info!(service = %self.service, ?signal, "termination requested");
                    break ExitReason::Signal(signal);
                }
                () = tokio::time::sleep_until(next_tick) => {}
            }

            let started = Instant::now();
            next_tick = started + self.poll_interval;
            self.phase = Phase::Evaluating;
            self.tick().await;
        };

        self.phase = Phase::Waiting;
        tracing::info!(
            service = %self.service,
            committed = %self.state.committed,
            ticks = self.metrics.ticks_total(),
            check_failures = self.metrics.check_failures_total(),
            write_failures = self.metrics.write_failures_total(),
            rises = self.metrics.rises_total(),
            falls = self.metrics.falls_total(),
            check_avg = ?self.metrics.check_duration_avg(),
            check_max = ?self.metrics.check_duration_max(),
            uptime = ?self.metrics.uptime(),
            "watch loop stopped"
        );
        reason
    }
}

impl<C> std::fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("service", &self.service)
            .field("writer", &self.writer)
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
