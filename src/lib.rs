//! routewatch: debounced health watcher for anycast route announcement.
//!
//! Polls a check command, applies rise/fall hysteresis and atomically
//! rewrites a boolean function that a routing daemon includes in its
//! configuration.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use routewatch::prelude::*;
//!
//! # async fn watch() -> routewatch::core::Result<()> {
//! let config = WatchConfig::load("/etc/routewatch.toml")?;
//! AtomicWriter::new(&config.output_path).probe()?;
//!
//! let mut scheduler = Scheduler::from_config(CommandCheck::from_config(&config), &config);
//! let (mut ctx, _handle) = WatchContext::new();
//! let _reason: ExitReason = scheduler.run(&mut ctx).await;
//! # Ok(())
//! # }
//! ```

pub use routewatch_core as core;

/// Prelude module for common imports.
pub mod prelude {
    pub use routewatch_core::{
        AtomicWriter, CommandCheck, ConfigRenderer, Debouncer, ExitReason, HealthCheck,
        HealthState, HysteresisConfig, Scheduler, ServiceState, Signal, WatchConfig,
        WatchContext, WatchContextHandle, WatchError,
    };
}
