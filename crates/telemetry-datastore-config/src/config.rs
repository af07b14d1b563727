// crates/telemetry-datastore-config/src/config.rs
// ============================================================================
// Module: Telemetry Datastore Configuration
// Description: Configuration loading and validation for the datastore.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: telemetry-datastore-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits.
//! Resolution order is explicit path, then the `TELEMETRY_DATASTORE_CONFIG`
//! environment variable, then `telemetry-datastore.toml` in the working
//! directory. Every field has a documented default and a hard min/max
//! limit; a value outside its limits fails validation rather than being
//! clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use telemetry_datastore_core::InMemoryStorageClient;
use telemetry_datastore_core::MediatorConfig;
use telemetry_datastore_core::SharedStorageClient;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "telemetry-datastore.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "TELEMETRY_DATASTORE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total config path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Default per-call query timeout in milliseconds.
pub(crate) const DEFAULT_QUERY_TIMEOUT_MS: u64 = 15_000;
/// Minimum allowed query timeout in milliseconds.
pub(crate) const MIN_QUERY_TIMEOUT_MS: u64 = 1_000;
/// Maximum allowed query timeout in milliseconds.
pub(crate) const MAX_QUERY_TIMEOUT_MS: u64 = 120_000;
/// Default scroll cursor keep-alive in milliseconds.
pub(crate) const DEFAULT_SCROLL_TIMEOUT_MS: u64 = 60_000;
/// Minimum allowed scroll keep-alive in milliseconds.
pub(crate) const MIN_SCROLL_TIMEOUT_MS: u64 = 1_000;
/// Maximum allowed scroll keep-alive in milliseconds.
pub(crate) const MAX_SCROLL_TIMEOUT_MS: u64 = 600_000;
/// Default page size of scrolling operations.
pub(crate) const DEFAULT_SCROLL_PAGE_SIZE: u64 = 100;
/// Maximum allowed scroll page size.
pub(crate) const MAX_SCROLL_PAGE_SIZE: u64 = 10_000;
/// Default enrichment worker pool size.
pub(crate) const DEFAULT_ENRICHMENT_WORKERS: usize = 4;
/// Maximum allowed enrichment worker pool size.
pub(crate) const MAX_ENRICHMENT_WORKERS: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Backend Selection
// ============================================================================

/// Closed set of storage backends the datastore can be built against.
///
/// # Invariants
/// - Selection is explicit; no backend is discovered or loaded dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    /// In-process storage, for tests and demos.
    #[default]
    InMemory,
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend the datastore is built against.
    #[serde(default)]
    pub backend: StorageBackendKind,
    /// Per-call query timeout in milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Scroll cursor keep-alive in milliseconds.
    #[serde(default = "default_scroll_timeout_ms")]
    pub scroll_timeout_ms: u64,
    /// Page size of scrolling operations.
    #[serde(default = "default_scroll_page_size")]
    pub scroll_page_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::InMemory,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            scroll_timeout_ms: DEFAULT_SCROLL_TIMEOUT_MS,
            scroll_page_size: DEFAULT_SCROLL_PAGE_SIZE,
        }
    }
}

impl StorageConfig {
    /// Validates the storage configuration against its hard limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the violated limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_QUERY_TIMEOUT_MS..=MAX_QUERY_TIMEOUT_MS).contains(&self.query_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "storage.query_timeout_ms must be between {MIN_QUERY_TIMEOUT_MS} and {MAX_QUERY_TIMEOUT_MS}"
            )));
        }
        if !(MIN_SCROLL_TIMEOUT_MS..=MAX_SCROLL_TIMEOUT_MS).contains(&self.scroll_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "storage.scroll_timeout_ms must be between {MIN_SCROLL_TIMEOUT_MS} and {MAX_SCROLL_TIMEOUT_MS}"
            )));
        }
        if self.scroll_timeout_ms < self.query_timeout_ms {
            return Err(ConfigError::Invalid(
                "storage.scroll_timeout_ms must not be below storage.query_timeout_ms"
                    .to_string(),
            ));
        }
        if !(1..=MAX_SCROLL_PAGE_SIZE).contains(&self.scroll_page_size) {
            return Err(ConfigError::Invalid(format!(
                "storage.scroll_page_size must be between 1 and {MAX_SCROLL_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Registry mediator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Enrichment worker pool size.
    #[serde(default = "default_enrichment_workers")]
    pub enrichment_workers: usize,
    /// Whether registry mappings are ensured before registry writes.
    #[serde(default = "default_refresh_mappings")]
    pub refresh_mappings: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enrichment_workers: DEFAULT_ENRICHMENT_WORKERS,
            refresh_mappings: true,
        }
    }
}

impl RegistryConfig {
    /// Validates the registry configuration against its hard limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the violated limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ENRICHMENT_WORKERS).contains(&self.enrichment_workers) {
            return Err(ConfigError::Invalid(format!(
                "registry.enrichment_workers must be between 1 and {MAX_ENRICHMENT_WORKERS}"
            )));
        }
        Ok(())
    }
}

/// Telemetry datastore configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Registry mediator configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl DatastoreConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        self.registry.validate()?;
        Ok(())
    }

    /// Returns the mediator configuration this config describes.
    #[must_use]
    pub const fn mediator_config(&self) -> MediatorConfig {
        MediatorConfig {
            enrichment_workers: self.registry.enrichment_workers,
            ensure_mappings: self.registry.refresh_mappings,
        }
    }

    /// Builds the storage client the configuration selects. The backend
    /// set is closed; each variant maps to one concrete constructor.
    #[must_use]
    pub fn build_storage_client(&self) -> SharedStorageClient {
        match self.storage.backend {
            StorageBackendKind::InMemory => Arc::new(InMemoryStorageClient::new()),
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Serde default for the query timeout.
const fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

/// Serde default for the scroll keep-alive.
const fn default_scroll_timeout_ms() -> u64 {
    DEFAULT_SCROLL_TIMEOUT_MS
}

/// Serde default for the scroll page size.
const fn default_scroll_page_size() -> u64 {
    DEFAULT_SCROLL_PAGE_SIZE
}

/// Serde default for the enrichment worker pool size.
const fn default_enrichment_workers() -> usize {
    DEFAULT_ENRICHMENT_WORKERS
}

/// Serde default for the mapping refresh toggle.
const fn default_refresh_mappings() -> bool {
    true
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_validate_and_carry_documented_values() {
        let config = DatastoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.query_timeout_ms, 15_000);
        assert_eq!(config.storage.scroll_timeout_ms, 60_000);
        assert_eq!(config.storage.scroll_page_size, 100);
        assert_eq!(config.registry.enrichment_workers, 4);
        assert!(config.registry.refresh_mappings);
        assert_eq!(config.storage.backend, StorageBackendKind::InMemory);
    }

    #[test]
    fn load_reads_partial_file_and_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[storage]\nquery_timeout_ms = 2000").expect("write config");
        let config = DatastoreConfig::load(Some(file.path())).expect("load config");
        assert_eq!(config.storage.query_timeout_ms, 2_000);
        assert_eq!(config.storage.scroll_timeout_ms, DEFAULT_SCROLL_TIMEOUT_MS);
        assert_eq!(config.registry.enrichment_workers, DEFAULT_ENRICHMENT_WORKERS);
    }

    #[test]
    fn load_rejects_unparseable_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "not toml at all [").expect("write config");
        let result = DatastoreConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn validate_rejects_query_timeout_below_minimum() {
        let config = DatastoreConfig {
            storage: StorageConfig {
                query_timeout_ms: MIN_QUERY_TIMEOUT_MS - 1,
                ..StorageConfig::default()
            },
            ..DatastoreConfig::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("query_timeout_ms"));
    }

    #[test]
    fn validate_rejects_scroll_timeout_below_query_timeout() {
        let config = DatastoreConfig {
            storage: StorageConfig {
                query_timeout_ms: 30_000,
                scroll_timeout_ms: 20_000,
                ..StorageConfig::default()
            },
            ..DatastoreConfig::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("scroll_timeout_ms"));
    }

    #[test]
    fn validate_rejects_zero_scroll_page() {
        let config = DatastoreConfig {
            storage: StorageConfig { scroll_page_size: 0, ..StorageConfig::default() },
            ..DatastoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_worker_pool() {
        let config = DatastoreConfig {
            registry: RegistryConfig {
                enrichment_workers: MAX_ENRICHMENT_WORKERS + 1,
                ..RegistryConfig::default()
            },
            ..DatastoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn mediator_config_mirrors_registry_section() {
        let config = DatastoreConfig {
            registry: RegistryConfig { enrichment_workers: 8, refresh_mappings: false },
            ..DatastoreConfig::default()
        };
        let mediator = config.mediator_config();
        assert_eq!(mediator.enrichment_workers, 8);
        assert!(!mediator.ensure_mappings);
    }
}
