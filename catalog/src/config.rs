//! Catalog configuration.
//!
//! Values come from [`CatalogConfig::default`], from serde, or from the
//! process environment via [`CatalogConfig::from_env`]. Either way the
//! result should go through [`CatalogConfig::validate`] before use.

use crate::error::ConfigError;
use loadstate_core::signal::SEPARATOR;
use loadstate_runtime::StoreConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable for [`CatalogConfig::namespace`]
pub const ENV_NAMESPACE: &str = "CATALOG_NAMESPACE";
/// Environment variable for [`CatalogConfig::details_for_unknown_ids`]
pub const ENV_DETAILS_FOR_UNKNOWN_IDS: &str = "CATALOG_DETAILS_FOR_UNKNOWN_IDS";
/// Environment variable for [`CatalogConfig::shutdown_timeout_secs`]
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "CATALOG_SHUTDOWN_TIMEOUT_SECS";
/// Environment variable for [`CatalogConfig::broadcast_capacity`]
pub const ENV_BROADCAST_CAPACITY: &str = "CATALOG_BROADCAST_CAPACITY";

/// Plugin catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Prefix of every operation name, e.g. `plugins` for `plugins/fetchAll`.
    ///
    /// Default: `plugins`
    pub namespace: String,

    /// Fetch details for ids that are not in the store yet.
    ///
    /// Off by default: details are only fetched for known plugins that lack
    /// them. Turning it on also fetches for ids the bulk load has not
    /// delivered (yet).
    pub details_for_unknown_ids: bool,

    /// How long [`crate::PluginCatalog::shutdown`] waits for running calls.
    ///
    /// Default: 5 seconds
    pub shutdown_timeout_secs: u64,

    /// Buffered actions per settle-event subscriber.
    ///
    /// Default: 64
    pub broadcast_capacity: usize,
}

impl CatalogConfig {
    /// Configuration with the given namespace and defaults otherwise
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Enable or disable fetching details for unknown ids
    #[must_use]
    pub const fn with_details_for_unknown_ids(mut self, enabled: bool) -> Self {
        self.details_for_unknown_ids = enabled;
        self
    }

    /// Set the shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.shutdown_timeout_secs = secs;
        self
    }

    /// Set the broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Read overrides from the process environment.
    ///
    /// Unset variables keep their default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but does
    /// not parse, or any error from [`Self::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            config.namespace = namespace;
        }
        if let Some(value) = lookup(ENV_DETAILS_FOR_UNKNOWN_IDS) {
            config.details_for_unknown_ids = parse(ENV_DETAILS_FOR_UNKNOWN_IDS, value)?;
        }
        if let Some(value) = lookup(ENV_SHUTDOWN_TIMEOUT_SECS) {
            config.shutdown_timeout_secs = parse(ENV_SHUTDOWN_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_BROADCAST_CAPACITY) {
            config.broadcast_capacity = parse(ENV_BROADCAST_CAPACITY, value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the catalog cannot work with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyNamespace`]
    /// - [`ConfigError::TrailingSeparator`]
    /// - [`ConfigError::ZeroCapacity`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.namespace.ends_with(SEPARATOR) {
            return Err(ConfigError::TrailingSeparator(self.namespace.clone()));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Shutdown timeout as a [`Duration`]
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Store configuration derived from this one
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.broadcast_capacity, self.shutdown_timeout())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            namespace: "plugins".to_string(),
            details_for_unknown_ids: false,
            shutdown_timeout_secs: 5,
            broadcast_capacity: 64,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
