// crates/rule-adapter-core/src/core/statements.rs
// ============================================================================
// Module: Rule Statements
// Description: Parameterized DML for the rule table.
// Purpose: Render rule-table statements for one dialect and table name.
// Dependencies: none
// ============================================================================

//! ## Overview
//! [`RuleStatements`] renders every data statement the adapter issues. Rule
//! values are always bound as parameters; only the validated table name and
//! column names appear in the SQL text.
//!
//! Exact deletes pin every column: supplied positions compare by equality
//! and the remaining positions must be `NULL`. Filtered deletes compare only
//! the non-empty supplied positions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use crate::core::dialect::Dialect;
use crate::core::rule::MAX_RULE_VALUES;

// ============================================================================
// SECTION: Statements
// ============================================================================

/// Pre-rendered statements for one rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleStatements {
    /// Target dialect.
    dialect: Dialect,
    /// Rule table name.
    table: String,
    /// Full scan projection.
    select_all: String,
    /// Unconditional delete.
    delete_all: String,
    /// Seven-parameter insert.
    insert: String,
}

impl RuleStatements {
    /// Renders the fixed statements for `table` in `dialect`.
    #[must_use]
    pub fn new(dialect: Dialect, table: &str) -> Self {
        let placeholders = (1 ..= MAX_RULE_VALUES + 1)
            .map(|index| dialect.placeholder(index))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            dialect,
            table: table.to_string(),
            select_all: format!("SELECT ptype, v0, v1, v2, v3, v4, v5 FROM {table}"),
            delete_all: format!("DELETE FROM {table}"),
            insert: format!(
                "INSERT INTO {table} (ptype, v0, v1, v2, v3, v4, v5) VALUES ({placeholders})"
            ),
        }
    }

    /// Returns the target dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the rule table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Selects `ptype, v0..v5` for every row.
    #[must_use]
    pub fn select_all(&self) -> &str {
        &self.select_all
    }

    /// Deletes every row.
    #[must_use]
    pub fn delete_all(&self) -> &str {
        &self.delete_all
    }

    /// Inserts one row binding `ptype, v0..v5`.
    #[must_use]
    pub fn insert(&self) -> &str {
        &self.insert
    }

    /// Deletes rows equal to a rule with `supplied` values.
    ///
    /// Binds `ptype` then the supplied values; columns past them must be
    /// `NULL`.
    #[must_use]
    pub fn delete_exact(&self, supplied: usize) -> String {
        let supplied = supplied.min(MAX_RULE_VALUES);
        let mut sql = self.delete_prefix();
        for column in 0 .. MAX_RULE_VALUES {
            if column < supplied {
                let _ = write!(sql, " AND v{column} = {}", self.dialect.placeholder(column + 2));
            } else {
                let _ = write!(sql, " AND v{column} IS NULL");
            }
        }
        sql
    }

    /// Deletes rows matching the non-empty `values` anchored at `field_index`.
    ///
    /// Binds `ptype` then each non-empty value in order.
    #[must_use]
    pub fn delete_filtered<S: AsRef<str>>(&self, field_index: usize, values: &[S]) -> String {
        let mut sql = self.delete_prefix();
        let mut parameter = 2;
        for (offset, value) in values.iter().enumerate() {
            if value.as_ref().is_empty() {
                continue;
            }
            let column = field_index + offset;
            let _ = write!(sql, " AND v{column} = {}", self.dialect.placeholder(parameter));
            parameter += 1;
        }
        sql
    }

    /// Shared `DELETE ... WHERE ptype = ?` prefix.
    fn delete_prefix(&self) -> String {
        format!("DELETE FROM {} WHERE ptype = {}", self.table, self.dialect.placeholder(1))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
