//! Worker pool settings read from code, environment variables or TOML.
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `FOUNDATION_POOL_NAME` | `name` | `"WorkerPool"` |
//! | `FOUNDATION_POOL_THREADS` | `threads` | available parallelism |
//! | `FOUNDATION_POOL_MAX_QUEUE` | `max_queue_size` | `0` (unbounded) |

use std::env;
use std::str::FromStr;

use derive_more::derive::From;
use serde::Deserialize;

pub const POOL_NAME_ENV: &str = "FOUNDATION_POOL_NAME";
pub const POOL_THREADS_ENV: &str = "FOUNDATION_POOL_THREADS";
pub const POOL_MAX_QUEUE_ENV: &str = "FOUNDATION_POOL_MAX_QUEUE";

pub const DEFAULT_POOL_NAME: &str = "WorkerPool";

#[derive(Debug, From)]
pub enum ConfigError {
    /// An environment variable held a value that does not parse.
    #[from(ignore)]
    InvalidValue { variable: String, value: String },

    #[from(ignore)]
    DeserializationFailed(toml::de::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::DeserializationFailed(value)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DeserializationFailed(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// [`available_threads`] returns the parallelism reported by the platform,
/// falling back to 1 when it cannot be determined.
#[must_use]
pub fn available_threads() -> usize {
    match std::thread::available_parallelism().ok().map(|n| n.get()) {
        Some(system_value) => {
            tracing::debug!("thread::available_parallelism() reported: {}", system_value);
            system_value
        }
        None => 1,
    }
}

fn default_name() -> String {
    String::from(DEFAULT_POOL_NAME)
}

/// Settings for building a [`crate::WorkerPool`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub name: String,
    pub threads: usize,
    pub max_queue_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            threads: available_threads(),
            max_queue_size: 0,
        }
    }
}

impl WorkerPoolConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::default().with_name(name)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Builds a config from the `FOUNDATION_POOL_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a numeric variable does not
    /// parse as an unsigned integer.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var(POOL_NAME_ENV) {
            config.name = name;
        }
        if let Some(threads) = parse_env(POOL_THREADS_ENV)? {
            config.threads = threads;
        }
        if let Some(max_queue_size) = parse_env(POOL_MAX_QUEUE_ENV)? {
            config.max_queue_size = max_queue_size;
        }

        tracing::debug!(
            name = %config.name,
            threads = config.threads,
            max_queue_size = config.max_queue_size,
            "worker pool config read from environment"
        );
        Ok(config)
    }

    /// Parses a config from TOML; missing keys keep their defaults.
    ///
    /// ```
    /// use foundation_sync::WorkerPoolConfig;
    ///
    /// let config = WorkerPoolConfig::from_toml_str(r#"
    ///     name = "Ingest"
    ///     threads = 4
    /// "#).unwrap();
    ///
    /// assert_eq!(config.name, "Ingest");
    /// assert_eq!(config.threads, 4);
    /// assert_eq!(config.max_queue_size, 0);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationFailed`] for malformed input.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

fn parse_env<T: FromStr>(variable: &str) -> ConfigResult<Option<T>> {
    let Ok(value) = env::var(variable) else {
        return Ok(None);
    };

    match T::from_str(value.trim()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::InvalidValue {
            variable: variable.to_owned(),
            value,
        }),
    }
}
