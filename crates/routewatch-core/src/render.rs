//! Generated routing-daemon snippet.
//!
//! The consumer parses this text, so every byte is fixed: a leading blank
//! line, the signature, brace placement, four-space indent and a trailing
//! newline. The only variable token is the returned boolean.

use crate::config::DEFAULT_FUNCTION_NAME;
use crate::types::HealthState;

/// Renders the boolean function for a committed [`HealthState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRenderer {
    function_name: String,
}

impl ConfigRenderer {
    /// Creates a renderer for a function name already validated as an
    /// identifier (see [`crate::WatchConfig::validate`]).
    #[must_use]
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
        }
    }

    /// Name of the generated function.
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Renders the snippet. Identical input always yields identical bytes.
    #[must_use]
    pub fn render(&self, state: HealthState) -> String {
        let value = if state.is_up() { "true" } else { "false" };
        format!(
            "\nfunction {}() -> bool\n{{\n    return {value};\n}}\n",
            self.function_name
        )
    }
}

impl Default for ConfigRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_FUNCTION_NAME)
    }
}
