// crates/rule-adapter-core/src/runtime/adapter.rs
// ============================================================================
// Module: Rule Adapter
// Description: The persistence adapter over any connection source.
// Purpose: Bind schema, sync, mutation, and retry into the Adapter contract.
// Dependencies: crate::{core, interfaces, runtime}, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`RuleAdapter`] provisions the rule table on construction, then executes
//! every load and mutation through its retrying [`Session`]. Arguments are
//! validated before any I/O so caller errors never consume retry budget.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::core::dialect::Dialect;
use crate::core::filter::Filter;
use crate::core::rule::DEFAULT_TABLE_NAME;
use crate::core::rule::GROUPING_SECTION;
use crate::core::rule::MAX_RULE_VALUES;
use crate::core::rule::POLICY_SECTION;
use crate::core::rule::PolicyRule;
use crate::core::statements::RuleStatements;
use crate::interfaces::Adapter;
use crate::interfaces::AdapterError;
use crate::interfaces::ConnectionSource;
use crate::interfaces::PolicyModel;
use crate::runtime::mutation;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::Session;
use crate::runtime::schema;
use crate::runtime::sync;
use crate::runtime::sync::RuleRef;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of rows per insert batch.
pub const DEFAULT_BATCH_SIZE: usize = 1_000;
/// Maximum accepted table name length.
pub const MAX_TABLE_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Adapter behavior options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterOptions {
    /// Rule table name.
    pub table_name: String,
    /// Create the table on construction when missing.
    pub auto_create_table: bool,
    /// Fail removals that affect no rows.
    pub remove_policy_failed: bool,
    /// Quote values when building policy lines.
    pub escape_values: bool,
    /// Rows per insert batch.
    pub batch_size: usize,
    /// Retry budget for storage operations.
    pub retry: RetryPolicy,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            auto_create_table: true,
            remove_policy_failed: false,
            escape_values: true,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl AdapterOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Invalid`] when any option is out of range.
    pub fn validate(&self) -> Result<(), AdapterError> {
        validate_table_name(&self.table_name)?;
        if self.batch_size == 0 {
            return Err(AdapterError::Invalid("batch_size must be greater than zero".to_string()));
        }
        self.retry.validate()
    }
}

/// Checks that a table name is a plain SQL identifier.
///
/// # Errors
///
/// Returns [`AdapterError::Invalid`] unless the name matches
/// `[A-Za-z_][A-Za-z0-9_]*` and fits [`MAX_TABLE_NAME_LENGTH`].
pub fn validate_table_name(name: &str) -> Result<(), AdapterError> {
    if name.is_empty() || name.len() > MAX_TABLE_NAME_LENGTH {
        return Err(AdapterError::Invalid(format!(
            "table_name must be 1 to {MAX_TABLE_NAME_LENGTH} characters"
        )));
    }
    let mut chars = name.chars();
    let leading_ok = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    if !leading_ok || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(AdapterError::Invalid(format!("table_name is not a plain identifier: {name}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Policy rule adapter over a [`ConnectionSource`].
///
/// # Invariants
/// - The rule table existed when construction returned, unless
///   `auto_create_table` was disabled.
/// - `filtered` reflects the last load that completed without error.
pub struct RuleAdapter<S: ConnectionSource> {
    /// Retrying connection owner.
    session: Session<S>,
    /// Rendered statements for the detected dialect.
    statements: RuleStatements,
    /// Behavior options.
    options: AdapterOptions,
    /// Whether the last successful load was filtered.
    filtered: bool,
}

impl<S: ConnectionSource> RuleAdapter<S> {
    /// Opens an adapter with default options.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when connecting, dialect detection, or table
    /// provisioning fails.
    pub fn new(source: S) -> Result<Self, AdapterError> {
        Self::with_options(source, AdapterOptions::default())
    }

    /// Opens an adapter with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when options are invalid, or when connecting,
    /// dialect detection, or table provisioning fails.
    pub fn with_options(source: S, options: AdapterOptions) -> Result<Self, AdapterError> {
        options.validate()?;
        let mut session = Session::open(source, options.retry)?;
        let dialect = session.run(schema::detect_dialect)?;
        let table = options.table_name.as_str();
        if options.auto_create_table {
            session.run(|conn| schema::ensure_table(conn, dialect, table))?;
        }
        debug!(%dialect, table, "rule adapter ready");
        let statements = RuleStatements::new(dialect, table);
        Ok(Self {
            session,
            statements,
            options,
            filtered: false,
        })
    }

    /// Returns the detected dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.statements.dialect()
    }

    /// Returns the adapter options.
    #[must_use]
    pub const fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Returns the connection source.
    #[must_use]
    pub const fn source(&self) -> &S {
        self.session.source()
    }

    /// Returns true once the adapter has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Creates the rule table when missing.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when provisioning fails.
    pub fn ensure_table(&mut self) -> Result<(), AdapterError> {
        let statements = &self.statements;
        self.session
            .run(|conn| schema::ensure_table(conn, statements.dialect(), statements.table()))
    }

    /// Drops the rule table and provisions it again, discarding all rules.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when a drop or create step fails.
    pub fn recreate_table(&mut self) -> Result<(), AdapterError> {
        let statements = &self.statements;
        self.session.run(|conn| {
            schema::drop_table(conn, statements.dialect(), statements.table())?;
            schema::ensure_table(conn, statements.dialect(), statements.table())
        })
    }

    /// Returns every stored rule.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails.
    pub fn load_rules(&mut self) -> Result<Vec<PolicyRule>, AdapterError> {
        let statements = &self.statements;
        self.session.run(|conn| sync::load_rules(conn, statements, None))
    }

    /// Returns the stored rules matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails.
    pub fn load_filtered_rules(
        &mut self,
        filter: &Filter,
    ) -> Result<Vec<PolicyRule>, AdapterError> {
        let statements = &self.statements;
        self.session.run(|conn| sync::load_rules(conn, statements, Some(filter)))
    }

    /// Atomically replaces every stored rule with `rules`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when storage fails; nothing is replaced then.
    pub fn save_rules(&mut self, rules: &[PolicyRule]) -> Result<usize, AdapterError> {
        let refs: Vec<RuleRef<'_>> =
            rules.iter().map(|rule| (rule.ptype.as_str(), rule.values.as_slice())).collect();
        self.replace_all(&refs)
    }

    /// Loads with a loosely typed filter argument; `None` or JSON `null`
    /// loads everything.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidFilter`] before any I/O when the value
    /// is not filter-shaped, otherwise as [`Adapter::load_filtered_policy`].
    pub fn load_filtered_policy_value(
        &mut self,
        model: &mut dyn PolicyModel,
        filter: Option<&Value>,
    ) -> Result<(), AdapterError> {
        let filter = match filter {
            None | Some(Value::Null) => None,
            Some(value) => Some(Filter::from_json(value)?),
        };
        self.load_filtered_policy(model, filter.as_ref())
    }

    /// Loads matching rows into `model` and returns the number loaded.
    fn load_into(
        &mut self,
        model: &mut dyn PolicyModel,
        filter: Option<&Filter>,
    ) -> Result<usize, AdapterError> {
        let statements = &self.statements;
        let escape = self.options.escape_values;
        self.session
            .run(|conn| sync::load_into_model(conn, statements, escape, filter, &mut *model))
    }

    /// Replaces the table contents under the retry policy.
    fn replace_all(&mut self, rules: &[RuleRef<'_>]) -> Result<usize, AdapterError> {
        let statements = &self.statements;
        let batch_size = self.options.batch_size;
        self.session.run(|conn| sync::replace_all(conn, statements, batch_size, rules))
    }

    /// Rejects work on a closed adapter before argument handling.
    const fn ensure_open(&self) -> Result<(), AdapterError> {
        if self.session.is_closed() {
            return Err(AdapterError::Closed);
        }
        Ok(())
    }
}

impl<S: ConnectionSource> Adapter for RuleAdapter<S> {
    fn load_policy(&mut self, model: &mut dyn PolicyModel) -> Result<(), AdapterError> {
        self.load_into(model, None)?;
        self.filtered = false;
        Ok(())
    }

    fn load_filtered_policy(
        &mut self,
        model: &mut dyn PolicyModel,
        filter: Option<&Filter>,
    ) -> Result<(), AdapterError> {
        self.load_into(model, filter)?;
        self.filtered = filter.is_some();
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    fn save_policy(&mut self, model: &dyn PolicyModel) -> Result<(), AdapterError> {
        let mut refs: Vec<RuleRef<'_>> = Vec::new();
        for section in [POLICY_SECTION, GROUPING_SECTION] {
            for group in model.policy_groups(section) {
                refs.extend(group.rules.iter().map(|rule| (group.ptype, rule.as_slice())));
            }
        }
        self.replace_all(&refs)?;
        Ok(())
    }

    fn add_policy(&mut self, _sec: &str, ptype: &str, rule: &[String]) -> Result<(), AdapterError> {
        let statements = &self.statements;
        self.session.run(|conn| mutation::insert_one(conn, statements, ptype, rule))
    }

    fn add_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        self.ensure_open()?;
        if rules.is_empty() {
            return Ok(());
        }
        let statements = &self.statements;
        let batch_size = self.options.batch_size;
        self.session.run(|conn| mutation::insert_many(conn, statements, batch_size, ptype, rules))
    }

    fn remove_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), AdapterError> {
        self.ensure_open()?;
        if rule.is_empty() {
            return Ok(());
        }
        let statements = &self.statements;
        let require_rows = self.options.remove_policy_failed;
        self.session
            .run(|conn| mutation::remove_exact(conn, statements, ptype, rule, require_rows))?;
        Ok(())
    }

    fn remove_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        self.ensure_open()?;
        if rules.is_empty() {
            return Ok(());
        }
        let statements = &self.statements;
        let require_rows = self.options.remove_policy_failed;
        self.session
            .run(|conn| mutation::remove_many(conn, statements, ptype, rules, require_rows))?;
        Ok(())
    }

    fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        values: &[String],
    ) -> Result<(), AdapterError> {
        self.ensure_open()?;
        if values.is_empty() {
            return Ok(());
        }
        let last_bound = values.iter().rposition(|value| !value.is_empty());
        if let Some(offset) = last_bound
            && field_index.saturating_add(offset) >= MAX_RULE_VALUES
        {
            return Err(AdapterError::Invalid(format!(
                "field_index {field_index} with value at offset {offset} exceeds \
                 {MAX_RULE_VALUES} value columns"
            )));
        }
        let statements = &self.statements;
        let require_rows = self.options.remove_policy_failed;
        self.session.run(|conn| {
            mutation::remove_filtered(conn, statements, ptype, field_index, values, require_rows)
        })?;
        Ok(())
    }

    fn update_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<(), AdapterError> {
        self.ensure_open()?;
        if old_rule.is_empty() || new_rule.is_empty() {
            return Ok(());
        }
        let statements = &self.statements;
        let require_rows = self.options.remove_policy_failed;
        self.session.run(|conn| {
            mutation::replace_one(conn, statements, ptype, old_rule, new_rule, require_rows)
        })
    }

    fn close(&mut self) {
        self.session.close();
        debug!(table = self.statements.table(), "rule adapter closed");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_validate() {
        let options = AdapterOptions::default();
        assert_eq!(options.table_name, "casbin_rule");
        assert_eq!(options.batch_size, 1_000);
        assert_eq!(options.retry.max_attempts, 3);
        options.validate().unwrap();
    }

    #[test]
    fn table_names_must_be_plain_identifiers() {
        for name in ["rules", "_tenant_1", "CasbinRule"] {
            validate_table_name(name).unwrap();
        }
        let long = "x".repeat(65);
        for name in ["", "1rules", "rules; DROP TABLE x", "tenant-rules", long.as_str()] {
            assert!(validate_table_name(name).unwrap_err().is_caller_error(), "{name}");
        }
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let options = AdapterOptions {
            batch_size: 0,
            ..AdapterOptions::default()
        };
        assert!(matches!(options.validate(), Err(AdapterError::Invalid(_))));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: AdapterOptions = serde_json::from_value(serde_json::json!({
            "table_name": "acl",
            "retry": { "delay_ms": 5 }
        }))
        .unwrap();
        assert_eq!(options.table_name, "acl");
        assert!(options.auto_create_table);
        assert_eq!(options.retry.max_attempts, 3);
        assert_eq!(options.retry.delay_ms, 5);
    }
}
