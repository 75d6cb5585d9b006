//! External health check execution.
//!
//! Every failure mode of the check command collapses to `false`. A missing or
//! broken script means "not ready yet", never an operational error, so
//! nothing here can stop the control loop.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::WatchConfig;

/// Longest stderr excerpt kept for diagnostics.
const STDERR_EXCERPT: usize = 512;

/// Source of the raw health signal.
///
/// Implementations must be cancel-safe between calls and must bound their own
/// running time; the scheduler awaits exactly one check at a time.
#[async_trait]
pub trait HealthCheck: Send {
    /// Runs one probe. `true` means healthy.
    async fn check(&mut self) -> bool;
}

/// Why a check command did not report success. Used for logging only.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailure {
    /// The command could not be started (missing, not executable, ...).
    #[error("could not launch {}: {source}", command.display())]
    Spawn {
        /// Command that was attempted.
        command: PathBuf,
        /// Error from the spawn.
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("check {status}")]
    Exit {
        /// Exit status of the command.
        status: ExitStatus,
        /// Leading part of the command's stderr.
        stderr: String,
    },

    /// The command did not finish in time and was killed.
    #[error("check timed out after {0:?}")]
    Timeout(Duration),

    /// Waiting on the child failed.
    #[error("failed to wait for check: {0}")]
    Wait(#[source] std::io::Error),
}

/// Runs an executable and treats exit status 0 as healthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCheck {
    command: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCheck {
    /// Creates a check running `command` without arguments.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            timeout,
        }
    }

    /// Creates the check described by a validated configuration.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(&config.check_command, config.check_timeout).with_args(config.check_args.clone())
    }

    /// Sets the arguments passed to the command.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Command being run.
    #[must_use]
    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Upper bound on a single invocation.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the command once, bounded by the timeout.
    ///
    /// The child is killed if the timeout elapses.
    ///
    /// # Errors
    /// Returns the reason the check did not pass.
    pub async fn run(&self) -> Result<(), CheckFailure> {
        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CheckFailure::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CheckFailure::Timeout(self.timeout))?
            .map_err(CheckFailure::Wait)?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CheckFailure::Exit {
                status: output.status,
                stderr: excerpt(&output.stderr),
            })
        }
    }
}

#[async_trait]
impl HealthCheck for CommandCheck {
    async fn check(&mut self) -> bool {
        match self.run().await {
            Ok(()) => {
                tracing::trace!(command = %self.command.display(), "check passed");
                true
            }
            Err(CheckFailure::Exit { status, stderr }) => {
                tracing::debug!(
                    command = %self.command.display(),
                    %status,
                    stderr = %stderr,
                    "check failed"
                );
                false
            }
            Err(failure @ CheckFailure::Timeout(_)) => {
                tracing::warn!(command = %self.command.display(), error = %failure, "check failed");
                false
            }
            Err(failure) => {
                tracing::debug!(
                    command = %self.command.display(),
                    error = %failure,
                    "check failed"
                );
                false
            }
        }
    }
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().nth(STDERR_EXCERPT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandCheck {
        CommandCheck::new("/bin/sh", Duration::from_secs(5))
            .with_args(vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_exit_zero_is_healthy() {
        let mut check = sh("exit 0");
        assert!(check.run().await.is_ok());
        assert!(check.check().await);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_unhealthy() {
        let mut check = sh("echo broken >&2; exit 3");
        match check.run().await {
            Err(CheckFailure::Exit { status, stderr }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
        assert!(!check.check().await);
    }

    #[tokio::test]
    async fn test_missing_command_is_unhealthy() {
        let mut check = CommandCheck::new("/nonexistent/service.sh", Duration::from_secs(1));
        match check.run().await {
            Err(CheckFailure::Spawn { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected spawn failure, got {other:?}"),
        }
        assert!(!check.check().await);
    }

    #[tokio::test]
    async fn test_non_executable_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("service.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();

        let mut check = CommandCheck::new(&script, Duration::from_secs(1));
        assert!(matches!(
            check.run().await,
            Err(CheckFailure::Spawn { .. })
        ));
        assert!(!check.check().await);
    }

    #[tokio::test]
    async fn test_timeout_is_unhealthy() {
        let mut check = CommandCheck::new("/bin/sh", Duration::from_millis(100))
            .with_args(vec!["-c".to_string(), "sleep 5".to_string()]);

        let started = std::time::Instant::now();
        assert!(matches!(check.run().await, Err(CheckFailure::Timeout(_))));
        assert!(!check.check().await);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_args_are_passed() {
        let mut check = CommandCheck::new("/bin/sh", Duration::from_secs(5)).with_args(vec![
            "-c".to_string(),
            "test \"$1\" = expected".to_string(),
            "sh".to_string(),
            "expected".to_string(),
        ]);
        assert!(check.check().await);
    }

    #[test]
    fn test_from_config() {
        let mut config = WatchConfig::new("/tmp/service.sh", "/tmp/out.conf");
        config.check_timeout = Duration::from_millis(750);
        config.check_args = vec!["--fast".to_string()];

        let check = CommandCheck::from_config(&config);
        assert_eq!(check.command(), Path::new("/tmp/service.sh"));
        assert_eq!(check.timeout(), Duration::from_millis(750));
        assert_eq!(check.args, vec!["--fast".to_string()]);
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(STDERR_EXCERPT + 10);
        let text = excerpt(long.as_bytes());
        assert!(text.ends_with("..."));
        assert_eq!(text.len(), STDERR_EXCERPT + 3);
        assert_eq!(excerpt(b"  short\n"), "short");
    }
}
