//! Bridge configuration
//!
//! Read from a TOML document or from `PYCAPI_*` environment variables.
//! Every key is optional; missing keys keep their defaults.
//!
//! ```toml
//! trace_calls = true
//! check_return_types = false
//! ```

use serde::Deserialize;

use crate::error::{CApiError, CApiResult};

/// Environment variable enabling per-call tracing
pub const ENV_TRACE_CALLS: &str = "PYCAPI_TRACE_CALLS";

/// Environment variable toggling return type checks
pub const ENV_CHECK_RETURN_TYPES: &str = "PYCAPI_CHECK_RETURN_TYPES";

/// Runtime switches of the dispatch core
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Log every dispatched call at trace level
    pub trace_calls: bool,
    /// Verify specialized return descriptors (frame, code) on the way out
    pub check_return_types: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            trace_calls: false,
            check_return_types: true,
        }
    }
}

impl BridgeConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> CApiResult<Self> {
        toml::from_str(source).map_err(|e| CApiError::Config(e.to_string()))
    }

    /// Read from the process environment
    pub fn from_env() -> CApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read from an arbitrary key lookup, starting from the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CApiResult<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_TRACE_CALLS) {
            config.trace_calls = parse_flag(ENV_TRACE_CALLS, &value)?;
        }
        if let Some(value) = lookup(ENV_CHECK_RETURN_TYPES) {
            config.check_return_types = parse_flag(ENV_CHECK_RETURN_TYPES, &value)?;
        }
        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> CApiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(CApiError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
