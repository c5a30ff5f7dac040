// crates/rule-adapter-sqlite/src/source.rs
// ============================================================================
// Module: SQLite Connection Source
// Description: rusqlite-backed RuleConnection and ConnectionSource.
// Purpose: Run rendered rule-table statements against a SQLite file.
// Dependencies: rule-adapter-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteSource`] validates the database path once and opens a fresh
//! [`SqliteConnection`] on every `connect`. Busy, locked, and I/O failures
//! surface as [`AdapterError::Storage`] so the adapter's retry session may
//! replace the connection. Every other engine failure (constraints, trigger
//! aborts, malformed SQL) is deterministic and surfaces as
//! [`AdapterError::Rejected`]; invalid configuration surfaces as
//! [`AdapterError::Invalid`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use rule_adapter_core::AdapterError;
use rule_adapter_core::ConnectionSource;
use rule_adapter_core::Dialect;
use rule_adapter_core::RowVisitor;
use rule_adapter_core::RuleConnection;
use rule_adapter_core::StoredRow;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::params_from_iter;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default busy timeout for `SQLite` connections.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` rule storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteSourceConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteSourceConfig {
    /// Creates a configuration for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` backend errors.
#[derive(Debug, Error)]
pub enum SqliteSourceError {
    /// Filesystem error preparing the database location.
    #[error("sqlite rule storage io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite rule storage db error: {0}")]
    Db(String),
    /// Invalid backend configuration.
    #[error("sqlite rule storage invalid config: {0}")]
    Invalid(String),
}

impl From<SqliteSourceError> for AdapterError {
    fn from(error: SqliteSourceError) -> Self {
        match error {
            SqliteSourceError::Io(message) | SqliteSourceError::Db(message) => {
                Self::Storage(message)
            }
            SqliteSourceError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps a driver error onto a storage fault, retryable only when transient.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err function pointer.")]
fn storage(err: rusqlite::Error) -> AdapterError {
    if is_transient(&err) {
        AdapterError::Storage(err.to_string())
    } else {
        AdapterError::Rejected(err.to_string())
    }
}

/// Returns true for engine failures a fresh connection may not repeat.
const fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if matches!(
            failure.code,
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
        )
    )
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// Connection source opening a `SQLite` database file.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    /// Backend configuration.
    config: SqliteSourceConfig,
}

impl SqliteSource {
    /// Validates the configuration and prepares the database directory.
    ///
    /// No connection is opened until the adapter asks for one.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSourceError`] when the path is unusable.
    pub fn new(config: SqliteSourceConfig) -> Result<Self, SqliteSourceError> {
        validate_database_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        Ok(Self {
            config,
        })
    }

    /// Returns the backend configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteSourceConfig {
        &self.config
    }
}

impl ConnectionSource for SqliteSource {
    type Connection = SqliteConnection;

    fn connect(&self) -> Result<Self::Connection, AdapterError> {
        let connection = open_connection(&self.config)?;
        debug!(path = %self.config.path.display(), "opened sqlite rule storage connection");
        Ok(SqliteConnection {
            connection,
        })
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// One open `SQLite` connection.
#[derive(Debug)]
pub struct SqliteConnection {
    /// Underlying rusqlite connection.
    connection: Connection,
}

impl SqliteConnection {
    /// Wraps an already opened rusqlite connection.
    #[must_use]
    pub const fn from_connection(connection: Connection) -> Self {
        Self {
            connection,
        }
    }
}

impl RuleConnection for SqliteConnection {
    fn product_name(&mut self) -> Result<String, AdapterError> {
        let version: String = self
            .connection
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(storage)?;
        debug!(version = %version, "sqlite engine version");
        Ok(Dialect::Sqlite.product_name().to_string())
    }

    fn execute_statement(&mut self, sql: &str) -> Result<(), AdapterError> {
        self.connection.execute_batch(sql).map_err(storage)
    }

    fn query_exists(&mut self, sql: &str) -> Result<bool, AdapterError> {
        let mut statement = self.connection.prepare(sql).map_err(storage)?;
        statement.exists([]).map_err(storage)
    }

    fn execute(&mut self, sql: &str, params: &[Option<&str>]) -> Result<u64, AdapterError> {
        let mut statement = self.connection.prepare_cached(sql).map_err(storage)?;
        let affected = statement.execute(params_from_iter(params)).map_err(storage)?;
        Ok(u64::try_from(affected).unwrap_or(u64::MAX))
    }

    fn execute_batch(&mut self, sql: &str, rows: &[StoredRow]) -> Result<(), AdapterError> {
        let mut statement = self.connection.prepare_cached(sql).map_err(storage)?;
        for row in rows {
            statement.execute(params_from_iter(row.params())).map_err(storage)?;
        }
        Ok(())
    }

    fn scan_rows(&mut self, sql: &str, visit: &mut RowVisitor<'_>) -> Result<(), AdapterError> {
        let mut statement = self.connection.prepare(sql).map_err(storage)?;
        let mut records = statement.query([]).map_err(storage)?;
        let mut row = StoredRow::default();
        while let Some(record) = records.next().map_err(storage)? {
            row.ptype = record.get(0).map_err(storage)?;
            for (offset, slot) in row.values.iter_mut().enumerate() {
                *slot = record.get(offset + 1).map_err(storage)?;
            }
            visit(&row)?;
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<(), AdapterError> {
        self.connection.execute_batch("BEGIN").map_err(storage)
    }

    fn commit(&mut self) -> Result<(), AdapterError> {
        self.connection.execute_batch("COMMIT").map_err(storage)
    }

    fn rollback(&mut self) -> Result<(), AdapterError> {
        self.connection.execute_batch("ROLLBACK").map_err(storage)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteSourceError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteSourceError::Io("database path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteSourceError::Io(err.to_string()))
}

/// Validates database paths for safety limits.
fn validate_database_path(path: &Path) -> Result<(), SqliteSourceError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteSourceError::Invalid("database path is empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteSourceError::Invalid("database path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteSourceError::Invalid(
                "database path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteSourceError::Invalid(
            "database path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteSourceConfig) -> Result<Connection, SqliteSourceError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteSourceError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteSourceConfig,
) -> Result<(), SqliteSourceError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteSourceError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteSourceError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteSourceError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_apply_when_omitted() {
        let config = SqliteSourceConfig::new("rules.db");
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.journal_mode.pragma_value(), "wal");
        assert_eq!(config.sync_mode.pragma_value(), "full");
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = SqliteSource::new(SqliteSourceConfig::new("")).unwrap_err();
        assert!(matches!(AdapterError::from(err), AdapterError::Invalid(_)));
    }

    #[test]
    fn overlong_component_is_rejected() {
        let path = PathBuf::from("x".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        let err = validate_database_path(&path).unwrap_err();
        assert!(matches!(err, SqliteSourceError::Invalid(_)));
    }

    fn engine_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_io_failures_are_retryable() {
        for code in [
            rusqlite::ffi::SQLITE_BUSY,
            rusqlite::ffi::SQLITE_LOCKED,
            rusqlite::ffi::SQLITE_CANTOPEN,
            rusqlite::ffi::SQLITE_IOERR,
        ] {
            assert!(storage(engine_failure(code)).is_retryable(), "code {code}");
        }
        assert!(AdapterError::from(SqliteSourceError::Db("locked".to_string())).is_retryable());
    }

    #[test]
    fn deterministic_failures_are_rejected() {
        for err in [
            engine_failure(rusqlite::ffi::SQLITE_CONSTRAINT),
            engine_failure(rusqlite::ffi::SQLITE_ERROR),
            engine_failure(rusqlite::ffi::SQLITE_READONLY),
            rusqlite::Error::InvalidQuery,
        ] {
            let mapped = storage(err);
            assert!(matches!(mapped, AdapterError::Rejected(_)), "{mapped:?}");
            assert!(!mapped.is_retryable());
        }
    }
}
