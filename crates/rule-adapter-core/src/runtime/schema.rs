// crates/rule-adapter-core/src/runtime/schema.rs
// ============================================================================
// Module: Schema Provisioning
// Description: Executes dialect schema plans against a live connection.
// Purpose: Guarantee the rule table exists before any other operation.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Provisioning detects the dialect from the connection's product name, then
//! walks the dialect's [`SchemaStep`] list, consulting each step's existence
//! guard before executing it. Every plan is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;

use crate::core::dialect::Dialect;
use crate::core::dialect::SchemaStep;
use crate::core::dialect::StepGuard;
use crate::core::dialect::render_template;
use crate::interfaces::AdapterError;
use crate::interfaces::RuleConnection;

// ============================================================================
// SECTION: Provisioning
// ============================================================================

/// Identifies the connection's dialect.
///
/// # Errors
///
/// Returns [`AdapterError::Dialect`] for unsupported products.
pub fn detect_dialect<C: RuleConnection + ?Sized>(conn: &mut C) -> Result<Dialect, AdapterError> {
    let product = conn.product_name()?;
    Dialect::from_product_name(&product)
}

/// Creates the rule table and its auxiliary objects when missing.
///
/// # Errors
///
/// Returns [`AdapterError`] when a guard query or statement fails.
pub fn ensure_table<C: RuleConnection + ?Sized>(
    conn: &mut C,
    dialect: Dialect,
    table: &str,
) -> Result<(), AdapterError> {
    run_steps(conn, dialect, table, dialect.schema().create)
}

/// Drops the rule table and its auxiliary objects when present.
///
/// # Errors
///
/// Returns [`AdapterError`] when a guard query or statement fails.
pub fn drop_table<C: RuleConnection + ?Sized>(
    conn: &mut C,
    dialect: Dialect,
    table: &str,
) -> Result<(), AdapterError> {
    run_steps(conn, dialect, table, dialect.schema().drop)
}

/// Executes each step whose guard allows it.
fn run_steps<C: RuleConnection + ?Sized>(
    conn: &mut C,
    dialect: Dialect,
    table: &str,
    steps: &[SchemaStep],
) -> Result<(), AdapterError> {
    for step in steps {
        let run = match step.guard {
            StepGuard::Always => true,
            StepGuard::IfAbsent(check) => !conn.query_exists(&render_template(check, table))?,
            StepGuard::IfPresent(check) => conn.query_exists(&render_template(check, table))?,
        };
        if run {
            conn.execute_statement(&render_template(step.statement, table))?;
            debug!(%dialect, table, step = step.label, "schema step executed");
        } else {
            debug!(%dialect, table, step = step.label, "schema step skipped");
        }
    }
    Ok(())
}
