// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # routewatch-core
//!
//! Debounced health watching for anycast route announcement.
//!
//! A [`Scheduler`] polls an external check command, filters the raw signal
//! through a time-based hysteresis ([`Debouncer`]) and atomically rewrites a
//! small boolean-function snippet ([`ConfigRenderer`], [`AtomicWriter`]) that
//! a routing daemon includes to decide whether to advertise a prefix.
//!
//! - [`WatchConfig`] / [`HysteresisConfig`] for startup configuration
//! - [`CommandCheck`] and the [`HealthCheck`] seam for the raw signal
//! - [`WatchContext`] for termination requests
//! - [`WatchMetrics`] for loop counters
//!
//! ## Example
//!
//! ```rust,ignore
//! use routewatch_core::{CommandCheck, Scheduler, WatchConfig, WatchContext};
//!
//! let config = WatchConfig::load("/etc/routewatch.toml")?;
//! config.validate()?;
//!
//! let mut scheduler = Scheduler::from_config(CommandCheck::from_config(&config), &config);
//! let (mut ctx, handle) = WatchContext::new();
//! let reason = scheduler.run(&mut ctx).await;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod check;
pub mod config;
pub mod context;
pub mod debounce;
pub mod error;
pub mod metrics;
pub mod render;
pub mod scheduler;
#[cfg(test)]
pub mod tests;
pub mod types;
pub mod writer;

pub use check::{CheckFailure, CommandCheck, HealthCheck};
pub use config::{DEFAULT_FUNCTION_NAME, HysteresisConfig, MAX_DURATION, WatchConfig};
pub use context::{WatchContext, WatchContextHandle};
pub use debounce::Debouncer;
pub use error::{Result, WatchError};
pub use metrics::WatchMetrics;
pub use render::ConfigRenderer;
pub use scheduler::{Scheduler, TickReport};
pub use types::{CheckOutcome, ExitReason, HealthState, Phase, ServiceState, Signal, Transition};
pub use writer::{AtomicWriter, probe_dir, write_atomic};
