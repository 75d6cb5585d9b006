//! Watcher configuration.
//!
//! Loaded once from TOML at startup and validated before the scheduler
//! starts. Anything rejected here is fatal; nothing is written on failure.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, WatchError};

/// Function name emitted when the configuration does not set one.
pub const DEFAULT_FUNCTION_NAME: &str = "my_service_fn";

/// Longest accepted timing parameter.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Complete watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Executable probed on every tick.
    pub check_command: PathBuf,

    /// Arguments passed to `check_command`.
    #[serde(default)]
    pub check_args: Vec<String>,

    /// Where the generated snippet is written.
    pub output_path: PathBuf,

    /// Name of the generated function.
    #[serde(default = "default_function_name")]
    pub function_name: String,

    /// Label attached to log lines. Defaults to `function_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Time between the starts of consecutive ticks.
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Contiguous healthy time required for Down → Up.
    #[serde(default = "default_rise_delay", with = "duration_serde")]
    pub rise_delay: Duration,

    /// Contiguous unhealthy time required for Up → Down.
    /// Falls back to `rise_delay` when unset.
    #[serde(
        default,
        with = "duration_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub fall_delay: Option<Duration>,

    /// Upper bound on a single check invocation.
    #[serde(default = "default_check_timeout", with = "duration_serde")]
    pub check_timeout: Duration,
}

fn default_function_name() -> String {
    DEFAULT_FUNCTION_NAME.to_string()
}

impl WatchConfig {
    /// Creates a configuration with default timings.
    #[must_use]
    pub fn new(check_command: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            check_command: check_command.into(),
            check_args: vec![],
            output_path: output_path.into(),
            function_name: default_function_name(),
            service_name: None,
            poll_interval: default_poll_interval(),
            rise_delay: default_rise_delay(),
            fall_delay: None,
            check_timeout: default_check_timeout(),
        }
    }

    /// Validates the configuration without touching the filesystem.
    ///
    /// # Errors
    /// Returns an error if any field is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.check_command.as_os_str().is_empty() {
            return Err(WatchError::config("check_command cannot be empty"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(WatchError::config("output_path cannot be empty"));
        }
        if self.output_path.file_name().is_none() {
            return Err(WatchError::config(format!(
                "output_path {} does not name a file",
                self.output_path.display()
            )));
        }
        if !is_identifier(&self.function_name) {
            return Err(WatchError::config(format!(
                "function_name {:?} must match [A-Za-z_][A-Za-z0-9_]*",
                self.function_name
            )));
        }

        self.hysteresis().validate()
    }

    /// Label used in logs for the watched service.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.service_name.as_deref().unwrap_or(&self.function_name)
    }

    /// Timing parameters with `fall_delay` resolved.
    #[must_use]
    pub fn hysteresis(&self) -> HysteresisConfig {
        HysteresisConfig {
            poll_interval: self.poll_interval,
            rise_delay: self.rise_delay,
            fall_delay: self.fall_delay.unwrap_or(self.rise_delay),
            check_timeout: self.check_timeout,
        }
    }

    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WatchError::config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| WatchError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Directory that receives the artifact and its temporary siblings.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        match self.output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

/// Timing parameters of the poll loop and the debounce filter.
///
/// Immutable after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HysteresisConfig {
    /// Time between the starts of consecutive ticks.
    pub poll_interval: Duration,
    /// Contiguous healthy time required for Down → Up.
    pub rise_delay: Duration,
    /// Contiguous unhealthy time required for Up → Down.
    pub fall_delay: Duration,
    /// Upper bound on a single check invocation.
    pub check_timeout: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_rise_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(1)
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            rise_delay: default_rise_delay(),
            fall_delay: default_rise_delay(),
            check_timeout: default_check_timeout(),
        }
    }
}

impl HysteresisConfig {
    /// Validates that every duration is positive and at most [`MAX_DURATION`].
    ///
    /// # Errors
    /// Returns an error naming the first out-of-range duration.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("poll_interval", self.poll_interval),
            ("rise_delay", self.rise_delay),
            ("fall_delay", self.fall_delay),
            ("check_timeout", self.check_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(WatchError::config(format!("{name} must be positive")));
            }
            if value > MAX_DURATION {
                return Err(WatchError::config(format!(
                    "{name} must not exceed {}",
                    humantime::format_duration(MAX_DURATION)
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Serde helper for durations.
///
/// Accepts a humantime string (`"3s"`, `"250ms"`) or a bare number of seconds
/// (`3`, `0.5`). Serializes as a humantime string.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Secs(f64),
    }

    fn from_raw<E: serde::de::Error>(raw: Raw) -> Result<Duration, E> {
        match raw {
            Raw::Text(s) => humantime::parse_duration(s.trim()).map_err(E::custom),
            Raw::Secs(secs) => Duration::try_from_secs_f64(secs).map_err(E::custom),
        }
    }

    /// Serializes a duration as a human-readable string.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Deserializes a duration from a string or a number of seconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        from_raw(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::{Raw, from_raw};
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<Raw>::deserialize(deserializer)?
                .map(from_raw)
                .transpose()
        }
    }
}
