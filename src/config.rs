//! Container configuration.
//!
//! Settings can be built in code, read from `WIREBOX_*` environment
//! variables, or (with the `config` feature) deserialized from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::internal::path::MAX_DEPTH;

/// Environment variable prefix read by [`ContainerConfig::from_env`].
pub const ENV_PREFIX: &str = "WIREBOX";

/// What registering an already-registered key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum DuplicatePolicy {
    /// The new definition silently replaces the old one.
    #[default]
    Replace,
    /// Registration fails with [`DiError::DuplicateRegistration`](crate::DiError::DuplicateRegistration).
    Reject,
}

impl DuplicatePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Some(DuplicatePolicy::Replace),
            "reject" => Some(DuplicatePolicy::Reject),
            _ => None,
        }
    }
}

/// Container behaviour settings.
///
/// # Examples
///
/// ```rust
/// use wirebox::{ContainerBuilder, ContainerConfig, DuplicatePolicy};
///
/// let config = ContainerConfig {
///     on_duplicate: DuplicatePolicy::Reject,
///     ..ContainerConfig::default()
/// };
///
/// let result = ContainerBuilder::new()
///     .with_config(config)
///     .add_instance("port", 80u16)
///     .add_instance("port", 8080u16)
///     .build();
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Policy for re-registering a key.
    pub on_duplicate: DuplicatePolicy,
    /// Maximum length of a dependency chain before resolution fails with
    /// [`DiError::DepthExceeded`](crate::DiError::DepthExceeded).
    pub max_depth: usize,
    /// When true, `close()` runs teardown at most once per container and
    /// later calls return immediately.
    pub idempotent_close: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            on_duplicate: DuplicatePolicy::Replace,
            max_depth: MAX_DEPTH,
            idempotent_close: true,
        }
    }
}

impl ContainerConfig {
    /// Reads `WIREBOX_ON_DUPLICATE`, `WIREBOX_MAX_DEPTH` and
    /// `WIREBOX_IDEMPOTENT_CLOSE`, keeping the default for anything unset or
    /// unparsable.
    pub fn from_env() -> Self {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// As [`from_env`](Self::from_env) with a custom variable prefix.
    pub fn from_env_with_prefix(prefix: &str) -> Self {
        let defaults = Self::default();
        Self {
            on_duplicate: read_var(prefix, "ON_DUPLICATE", DuplicatePolicy::parse)
                .unwrap_or(defaults.on_duplicate),
            max_depth: read_var(prefix, "MAX_DEPTH", |v| v.trim().parse::<usize>().ok().filter(|d| *d > 0))
                .unwrap_or(defaults.max_depth),
            idempotent_close: read_var(prefix, "IDEMPOTENT_CLOSE", parse_bool)
                .unwrap_or(defaults.idempotent_close),
        }
    }

    /// Parses a JSON object; missing fields take their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> crate::DiResult<Self> {
        serde_json::from_str(json).map_err(|e| crate::DiError::Config(e.to_string()))
    }
}

fn read_var<T>(prefix: &str, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let var = format!("{}_{}", prefix.to_uppercase(), name);
    let raw = env::var(&var).ok()?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::warn!(variable = %var, value = %raw, "ignoring unparsable configuration value");
    }
    parsed
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
