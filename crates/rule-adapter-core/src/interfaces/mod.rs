// crates/rule-adapter-core/src/interfaces/mod.rs
// ============================================================================
// Module: Rule Adapter Interfaces
// Description: Backend-agnostic seams for storage, models, and adapters.
// Purpose: Define the contracts backends and policy engines plug into.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Interfaces define the connection, model, and adapter contracts. Backends
//! implement [`ConnectionSource`] and [`RuleConnection`]; policy engines
//! implement [`PolicyModel`]; callers drive everything through [`Adapter`].
//!
//! Security posture: rule values are untrusted input and are only ever bound
//! as statement parameters, never interpolated into SQL text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::filter::Filter;
use crate::core::rule::StoredRow;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rule adapter errors.
///
/// Only [`AdapterError::Storage`] is retried; every other variant surfaces
/// on the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Transient storage fault (connection drop, timeout, busy database).
    #[error("rule storage error: {0}")]
    Storage(String),
    /// The database rejected a statement (constraint, syntax, permission).
    #[error("rule storage rejected statement: {0}")]
    Rejected(String),
    /// Storage kept failing after the retry budget was spent.
    #[error("rule storage failed after {attempts} attempts: {message}")]
    RetryExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Last observed failure.
        message: String,
    },
    /// The connected database product is unsupported or rejected the schema.
    #[error("rule dialect error: {0}")]
    Dialect(String),
    /// A filtered-load argument was not filter-shaped.
    #[error("invalid rule filter: {0}")]
    InvalidFilter(String),
    /// A caller argument was rejected before any I/O.
    #[error("invalid rule adapter argument: {0}")]
    Invalid(String),
    /// A removal affected fewer rows than required.
    #[error("{operation} error, removed {actual} rows, expected at least {expected}")]
    RowCount {
        /// Operation that observed the shortfall.
        operation: &'static str,
        /// Minimum rows expected.
        expected: u64,
        /// Rows actually affected.
        actual: u64,
    },
    /// The policy model rejected a loaded line.
    #[error("policy model error: {0}")]
    Model(String),
    /// The adapter was closed.
    #[error("rule adapter is closed")]
    Closed,
}

impl AdapterError {
    /// Returns true when the failure may succeed on a fresh connection.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true when the failure was caused by caller input.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidFilter(_) | Self::Invalid(_))
    }
}

// ============================================================================
// SECTION: Connections
// ============================================================================

/// Callback receiving each scanned row.
pub type RowVisitor<'a> = dyn FnMut(&StoredRow) -> Result<(), AdapterError> + 'a;

/// A live database connection able to run rule-table statements.
///
/// Statements arrive already rendered for the connection's dialect. Values
/// are positional parameters where `None` binds SQL `NULL`.
pub trait RuleConnection {
    /// Returns the product name reported by the database driver.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Storage`] when the connection cannot be queried.
    fn product_name(&mut self) -> Result<String, AdapterError>;

    /// Executes one parameterless statement (DDL or transaction control).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when execution fails.
    fn execute_statement(&mut self, sql: &str) -> Result<(), AdapterError>;

    /// Runs a query and reports whether it produced at least one row.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the query fails.
    fn query_exists(&mut self, sql: &str) -> Result<bool, AdapterError>;

    /// Executes a parameterized statement and returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when execution fails.
    fn execute(&mut self, sql: &str, params: &[Option<&str>]) -> Result<u64, AdapterError>;

    /// Executes a prepared insert once per row as a single batch.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when any row fails to insert.
    fn execute_batch(&mut self, sql: &str, rows: &[StoredRow]) -> Result<(), AdapterError> {
        for row in rows {
            self.execute(sql, &row.params())?;
        }
        Ok(())
    }

    /// Streams rows selected by `sql` (`ptype, v0..v5`) to `visit`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the query fails or `visit` fails.
    fn scan_rows(&mut self, sql: &str, visit: &mut RowVisitor<'_>) -> Result<(), AdapterError>;

    /// Starts a transaction, leaving auto-commit mode.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the transaction cannot start.
    fn begin(&mut self) -> Result<(), AdapterError>;

    /// Commits the open transaction and restores auto-commit mode.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the commit fails.
    fn commit(&mut self) -> Result<(), AdapterError>;

    /// Rolls back the open transaction and restores auto-commit mode.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the rollback fails.
    fn rollback(&mut self) -> Result<(), AdapterError>;
}

/// Produces connections; consulted again whenever a connection is replaced.
pub trait ConnectionSource {
    /// Connection type produced by this source.
    type Connection: RuleConnection;

    /// Acquires a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Storage`] when no connection can be acquired.
    fn connect(&self) -> Result<Self::Connection, AdapterError>;
}

// ============================================================================
// SECTION: Policy Model
// ============================================================================

/// Rules of one type held by a model section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyGroup<'a> {
    /// Rule type tag.
    pub ptype: &'a str,
    /// Rules of that type, values only.
    pub rules: &'a [Vec<String>],
}

/// In-memory policy model an adapter loads into and saves from.
pub trait PolicyModel {
    /// Parses one textual policy line into the model.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Model`] when the line is rejected.
    fn load_policy_line(&mut self, line: &str) -> Result<(), AdapterError>;

    /// Returns the rule groups of a section (`p` or `g`) in a stable order.
    fn policy_groups(&self, section: &str) -> Vec<PolicyGroup<'_>>;
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Persistence contract between a policy engine and rule storage.
///
/// Every call either completes or fails as a unit: multi-step operations
/// run inside one transaction that is rolled back on any failure.
pub trait Adapter {
    /// Adds every stored rule to the model.
    ///
    /// Rules already in the model are kept; clear the model first to
    /// replace its contents.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage or the model fails.
    fn load_policy(&mut self, model: &mut dyn PolicyModel) -> Result<(), AdapterError>;

    /// Adds only rules matching `filter` to the model; `None` adds
    /// everything. Existing model rules are kept.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage or the model fails.
    fn load_filtered_policy(
        &mut self,
        model: &mut dyn PolicyModel,
        filter: Option<&Filter>,
    ) -> Result<(), AdapterError>;

    /// Returns true when the last successful load was filtered.
    fn is_filtered(&self) -> bool;

    /// Replaces all stored rules with the model's `p` then `g` rules.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails; nothing is replaced then.
    fn save_policy(&mut self, model: &dyn PolicyModel) -> Result<(), AdapterError>;

    /// Stores one rule.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails.
    fn add_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> Result<(), AdapterError>;

    /// Stores several rules atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails; nothing is stored then.
    fn add_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError>;

    /// Removes rows exactly equal to one rule.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails or a required row is missing.
    fn remove_policy(&mut self, sec: &str, ptype: &str, rule: &[String])
    -> Result<(), AdapterError>;

    /// Removes several rules atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails or a required row is missing.
    fn remove_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError>;

    /// Removes rows whose columns from `field_index` on match `values`.
    ///
    /// Empty strings in `values` leave their column unconstrained.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when arguments are out of range or storage fails.
    fn remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        values: &[String],
    ) -> Result<(), AdapterError>;

    /// Replaces one rule with another atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails; nothing changes then.
    fn update_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<(), AdapterError>;

    /// Releases the connection. Later calls fail with [`AdapterError::Closed`].
    fn close(&mut self);
}
