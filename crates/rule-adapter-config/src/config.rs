// crates/rule-adapter-config/src/config.rs
// ============================================================================
// Module: Rule Adapter Configuration
// Description: Configuration loading and validation for the rule adapter.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rule-adapter-core, rule-adapter-sqlite, rule-adapter-postgres, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed; no adapter is opened from
//! a configuration that did not validate.
//!
//! ```toml
//! [adapter]
//! table_name = "casbin_rule"
//!
//! [retry]
//! max_attempts = 3
//! delay_ms = 1000
//!
//! [database]
//! backend = "sqlite"
//! path = "data/policy.db"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use rule_adapter_core::Adapter;
use rule_adapter_core::AdapterError;
use rule_adapter_core::AdapterOptions;
use rule_adapter_core::DEFAULT_BATCH_SIZE;
use rule_adapter_core::DEFAULT_TABLE_NAME;
use rule_adapter_core::RetryPolicy;
use rule_adapter_core::RuleAdapter;
use rule_adapter_postgres::PostgresSource;
use rule_adapter_postgres::PostgresSourceConfig;
use rule_adapter_sqlite::SqliteSource;
use rule_adapter_sqlite::SqliteSourceConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "rule-adapter.toml";
/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "RULE_ADAPTER_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Complete rule adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleAdapterConfig {
    /// Adapter behavior options.
    #[serde(default)]
    pub adapter: AdapterSection,
    /// Retry budget for storage operations.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Storage backend.
    pub database: DatabaseConfig,
}

/// `[adapter]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterSection {
    /// Rule table name.
    pub table_name: String,
    /// Create the table on open when missing.
    pub auto_create_table: bool,
    /// Fail removals that affect no rows.
    pub remove_policy_failed: bool,
    /// Quote values when building policy lines.
    pub escape_values: bool,
    /// Rows per insert batch.
    pub batch_size: usize,
}

impl Default for AdapterSection {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            auto_create_table: true,
            remove_policy_failed: false,
            escape_values: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// `[database]` section, selected by its `backend` key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum DatabaseConfig {
    /// Embedded `SQLite` database file.
    Sqlite(SqliteSourceConfig),
    /// Pooled `PostgreSQL` server.
    Postgres(PostgresSourceConfig),
}

impl DatabaseConfig {
    /// Returns the backend label used in logs.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Validates backend settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Sqlite(config) => {
                validate_path_string("database.path", &config.path.to_string_lossy())?;
                if config.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "database.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Postgres(config) => {
                config.validate().map_err(|err| ConfigError::Invalid(err.to_string()))
            }
        }
    }
}

impl RuleAdapterConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// An explicit `path` wins, then [`CONFIG_ENV_VAR`], then
    /// `rule-adapter.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml(content)?;
        debug!(
            path = %resolved.display(),
            backend = config.database.backend(),
            "loaded rule adapter config"
        );
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.adapter_options().validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        self.database.validate()
    }

    /// Returns the adapter options described by `[adapter]` and `[retry]`.
    #[must_use]
    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions {
            table_name: self.adapter.table_name.clone(),
            auto_create_table: self.adapter.auto_create_table,
            remove_policy_failed: self.adapter.remove_policy_failed,
            escape_values: self.adapter.escape_values,
            batch_size: self.adapter.batch_size,
            retry: self.retry,
        }
    }

    /// Validates the configuration and opens an adapter for its backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration is invalid and
    /// [`ConfigError::Adapter`] when the backend cannot be opened.
    pub fn open_adapter(&self) -> Result<Box<dyn Adapter>, ConfigError> {
        self.validate()?;
        let options = self.adapter_options();
        let adapter: Box<dyn Adapter> = match &self.database {
            DatabaseConfig::Sqlite(config) => {
                let source = SqliteSource::new(config.clone()).map_err(AdapterError::from)?;
                Box::new(RuleAdapter::with_options(source, options)?)
            }
            DatabaseConfig::Postgres(config) => {
                let source = PostgresSource::from_config(config).map_err(AdapterError::from)?;
                Box::new(RuleAdapter::with_options(source, options)?)
            }
        };
        debug!(backend = self.database.backend(), "opened configured rule adapter");
        Ok(adapter)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
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
    /// The configured adapter could not be opened.
    #[error("config adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
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

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
