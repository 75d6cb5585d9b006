// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! routewatch binary.
//!
//! ```bash
//! # Run from a config file
//! routewatch --config /etc/routewatch.toml
//!
//! # Run without a config file
//! routewatch --check-command /usr/local/bin/service-ok --output /etc/bird/service.conf
//!
//! # Validate configuration and the output directory, then exit
//! routewatch --config /etc/routewatch.toml --check-config
//! ```
//!
//! Exit codes: `0` after a termination signal, `2` for configuration errors
//! (nothing is written), `1` for anything else.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use routewatch::core::Result;
use routewatch::prelude::*;

/// Exit code for configuration errors.
const EXIT_CONFIG: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "routewatch")]
#[command(about = "Debounced health watcher that publishes anycast route state", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Health check executable (overrides `check_command`).
    #[arg(long)]
    check_command: Option<PathBuf>,

    /// Generated snippet path (overrides `output_path`).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Time between checks, e.g. `1s` (overrides `poll_interval`).
    #[arg(long, value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,

    /// Healthy time before advertising, e.g. `3s` (overrides `rise_delay`).
    #[arg(long, value_parser = humantime::parse_duration)]
    rise_delay: Option<Duration>,

    /// Unhealthy time before withdrawing (overrides `fall_delay`).
    #[arg(long, value_parser = humantime::parse_duration)]
    fall_delay: Option<Duration>,

    /// Limit on a single check run (overrides `check_timeout`).
    #[arg(long, value_parser = humantime::parse_duration)]
    check_timeout: Option<Duration>,

    /// Validate configuration and the output directory, then exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    exit_code(run(cli).await)
}

/// Maps the outcome of [`run`] to the process exit code.
fn exit_code(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            error!(error = %e, "invalid configuration");
            ExitCode::from(EXIT_CONFIG)
        }
        Err(e) => {
            error!(error = %e, "routewatch failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let check_only = cli.check_config;
    let config = build_config(cli)?;

    let mut scheduler = Scheduler::from_config(CommandCheck::from_config(&config), &config);
    scheduler.writer().probe()?;

    if check_only {
        info!(
            check_command = %config.check_command.display(),
            output = %config.output_path.display(),
            output_dir = %config.output_dir().display(),
            "configuration ok"
        );
        return Ok(());
    }

    let (mut ctx, handle) = WatchContext::new();
    forward_signals(handle)?;

    let reason = scheduler.run(&mut ctx).await;
    info!(?reason, "routewatch exiting");
    Ok(())
}

/// Merges the config file (if any) with command-line overrides.
fn build_config(cli: Cli) -> Result<WatchConfig> {
    let mut config = match (&cli.config, &cli.check_command, &cli.output) {
        (Some(path), _, _) => WatchConfig::load(path)?,
        (None, Some(command), Some(output)) => WatchConfig::new(command, output),
        (None, _, _) => {
            return Err(WatchError::config(
                "either --config or both --check-command and --output are required",
            ));
        }
    };

    if let Some(command) = cli.check_command {
        config.check_command = command;
    }
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if let Some(interval) = cli.poll_interval {
        config.poll_interval = interval;
    }
    if let Some(delay) = cli.rise_delay {
        config.rise_delay = delay;
    }
    if let Some(delay) = cli.fall_delay {
        config.fall_delay = Some(delay);
    }
    if let Some(timeout) = cli.check_timeout {
        config.check_timeout = timeout;
    }

    config.validate()?;
    Ok(config)
}

/// Forwards SIGINT, SIGTERM and SIGQUIT to the watch loop.
#[cfg(unix)]
fn forward_signals(handle: WatchContextHandle) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let listen = |kind: SignalKind| {
        signal(kind)
            .map_err(|e| WatchError::runtime(format!("failed to install signal handler: {e}")))
    };
    let mut interrupt = listen(SignalKind::interrupt())?;
    let mut terminate = listen(SignalKind::terminate())?;
    let mut quit = listen(SignalKind::quit())?;

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = interrupt.recv() => Signal::Int,
                _ = terminate.recv() => Signal::Term,
                _ = quit.recv() => Signal::Quit,
            };
            info!(signal = ?received, "received signal, finishing current tick");
            if handle.send_signal(received).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_signals(handle: WatchContextHandle) -> Result<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl+C");
                break;
            }
            info!("received Ctrl+C, finishing current tick");
            if handle.send_signal(Signal::Int).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("routewatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_without_config_file() {
        let config = build_config(parse(&[
            "--check-command",
            "/usr/local/bin/ok",
            "--output",
            "/tmp/out.conf",
            "--rise-delay",
            "5s",
            "--fall-delay",
            "500ms",
        ]))
        .unwrap();

        assert_eq!(config.check_command, PathBuf::from("/usr/local/bin/ok"));
        assert_eq!(config.rise_delay, Duration::from_secs(5));
        assert_eq!(config.hysteresis().fall_delay, Duration::from_millis(500));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_missing_required_paths_is_config_error() {
        let err = build_config(parse(&["--output", "/tmp/out.conf"])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routewatch.toml");
        std::fs::write(
            &file,
            "check_command = \"/bin/true\"\noutput_path = \"/tmp/a.conf\"\nrise_delay = \"10s\"\n",
        )
        .unwrap();

        let config = build_config(parse(&[
            "-c",
            file.to_str().unwrap(),
            "--output",
            "/tmp/b.conf",
        ]))
        .unwrap();

        assert_eq!(config.output_path, PathBuf::from("/tmp/b.conf"));
        assert_eq!(config.rise_delay, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_output_dir_fails_before_loop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let output = missing.join("out.conf");

        let result = run(parse(&[
            "--check-command",
            "/bin/true",
            "--output",
            output.to_str().unwrap(),
        ]))
        .await;

        assert!(matches!(&result, Err(e) if e.is_fatal()));
        assert_eq!(exit_code(result), ExitCode::from(EXIT_CONFIG));
        assert!(!output.exists());
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_directory_at_output_path_fails_before_loop() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.conf");
        std::fs::create_dir(&output).unwrap();

        let result = run(parse(&[
            "--check-command",
            "/bin/true",
            "--output",
            output.to_str().unwrap(),
        ]))
        .await;

        assert!(matches!(&result, Err(e) if e.is_fatal()));
        assert!(output.is_dir());
        assert_eq!(std::fs::read_dir(&output).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_timing_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.conf");

        let result = run(parse(&[
            "--check-command",
            "/bin/true",
            "--output",
            output.to_str().unwrap(),
            "--rise-delay",
            "0s",
        ]))
        .await;

        assert_eq!(exit_code(result), ExitCode::from(EXIT_CONFIG));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_check_config_succeeds_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.conf");

        let result = run(parse(&[
            "--check-command",
            "/bin/true",
            "--output",
            output.to_str().unwrap(),
            "--check-config",
        ]))
        .await;

        assert_eq!(exit_code(result), ExitCode::SUCCESS);
        assert!(!output.exists());
    }

    #[test]
    fn test_runtime_error_exit_code() {
        let result = Err(WatchError::runtime("failed to install signal handler"));
        assert_eq!(exit_code(result), ExitCode::FAILURE);
    }

    #[test]
    fn test_zero_duration_override_rejected() {
        let err = build_config(parse(&[
            "--check-command",
            "/bin/true",
            "--output",
            "/tmp/out.conf",
            "--poll-interval",
            "0s",
        ]))
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
