//! Configuration types for record stores

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::storage::{CleanupPolicy, DEFAULT_DEBOUNCE, DEFAULT_PREALLOCATION};

/// Record store configuration
///
/// Loadable from `loglater.toml` and `LOGLATER_*` environment variables:
///
/// ```toml
/// preallocation = 64
/// max_size = 1000
/// max_age = "5m"
/// async_cleanup = true
/// debounce = "250ms"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Initial capacity of the record list
    pub preallocation: usize,

    /// Maximum number of records to keep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,

    /// Maximum age of records to keep
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_age: Option<Duration>,

    /// Run cleanup on a debounced background worker
    pub async_cleanup: bool,

    /// Quiet period before the background worker cleans up
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            preallocation: DEFAULT_PREALLOCATION,
            max_size: None,
            max_age: None,
            async_cleanup: false,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl StoreConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial capacity
    pub fn with_preallocation(mut self, preallocation: usize) -> Self {
        self.preallocation = preallocation;
        self
    }

    /// Set the maximum record count
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Set the maximum record age
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Enable or disable asynchronous cleanup
    pub fn with_async_cleanup(mut self, enabled: bool) -> Self {
        self.async_cleanup = enabled;
        self
    }

    /// Set the debounce duration; zero is ignored
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        if !debounce.is_zero() {
            self.debounce = debounce;
        }
        self
    }

    /// The cleanup policy described by this configuration
    ///
    /// With both limits set, age is applied before count.
    pub fn cleanup_policy(&self) -> Option<CleanupPolicy> {
        let by_age = self.max_age.map(CleanupPolicy::max_age);
        let by_count = self.max_size.map(CleanupPolicy::max_count);
        match (by_age, by_count) {
            (Some(age), Some(count)) => Some(age.then(count)),
            (age, count) => age.or(count),
        }
    }

    /// Load configuration from `loglater.toml` and the environment.
    ///
    /// Environment variables use the `LOGLATER_` prefix, e.g.
    /// `LOGLATER_MAX_SIZE=500`. `LOGLATER_CONFIG_PATH` names an extra TOML
    /// file merged last.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(StoreConfig::default()))
            .merge(Toml::file("loglater.toml"))
            .merge(Env::prefixed("LOGLATER_").ignore(&["CONFIG_PATH"]));

        if let Ok(path) = std::env::var("LOGLATER_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: StoreConfig = figment.extract().map_err(|e| {
            crate::error::LogLaterError::Configuration(format!(
                "Failed to load configuration: {}",
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: StoreConfig = Figment::from(Serialized::defaults(StoreConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(|e| {
                crate::error::LogLaterError::Configuration(format!(
                    "Failed to load configuration file: {}",
                    e
                ))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the debounce is zero.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.debounce.is_zero() {
            return Err(crate::error::LogLaterError::Configuration(
                "debounce must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
