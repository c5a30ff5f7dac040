// crates/rule-adapter-core/src/runtime/mutation.rs
// ============================================================================
// Module: Incremental Mutation
// Description: Single and multi-rule add, remove, and update statements.
// Purpose: Translate policy edits into parameterized rule-table writes.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Multi-step edits run inside [`in_transaction`]: a failure on any rule
//! rolls back the whole edit. Removal row counts are only enforced when the
//! caller asks for it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::rule::StoredRow;
use crate::core::statements::RuleStatements;
use crate::interfaces::AdapterError;
use crate::interfaces::RuleConnection;
use crate::runtime::sync::InsertBatcher;
use crate::runtime::sync::in_transaction;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Operation label for exact removals.
const REMOVE_POLICY: &str = "remove policy";
/// Operation label for filtered removals.
const REMOVE_FILTERED_POLICY: &str = "remove filtered policy";

// ============================================================================
// SECTION: Inserts
// ============================================================================

/// Inserts one rule.
pub fn insert_one<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    ptype: &str,
    values: &[String],
) -> Result<(), AdapterError> {
    let row = StoredRow::encode(ptype, values);
    conn.execute(statements.insert(), &row.params())?;
    Ok(())
}

/// Inserts several rules; more than one rule is written in one transaction.
pub fn insert_many<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    batch_size: usize,
    ptype: &str,
    rules: &[Vec<String>],
) -> Result<(), AdapterError> {
    if let [rule] = rules {
        return insert_one(conn, statements, ptype, rule);
    }
    in_transaction(conn, |conn| {
        let mut batcher = InsertBatcher::new(conn, statements.insert(), batch_size);
        for rule in rules {
            batcher.push(ptype, rule)?;
        }
        batcher.finish().map(|_| ())
    })
}

// ============================================================================
// SECTION: Removals
// ============================================================================

/// Deletes rows equal to one rule, with unsupplied columns required `NULL`.
pub fn remove_exact<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    ptype: &str,
    values: &[String],
    require_rows: bool,
) -> Result<u64, AdapterError> {
    let row = StoredRow::encode(ptype, values);
    let supplied = row.arity();
    let params = row.params();
    let removed = conn.execute(&statements.delete_exact(supplied), &params[..= supplied])?;
    require_removed(REMOVE_POLICY, removed, require_rows)?;
    Ok(removed)
}

/// Deletes the rows of every rule in one transaction.
pub fn remove_many<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    ptype: &str,
    rules: &[Vec<String>],
    require_rows: bool,
) -> Result<u64, AdapterError> {
    in_transaction(conn, |conn| {
        let mut removed = 0;
        for rule in rules {
            removed += remove_exact(conn, statements, ptype, rule, require_rows)?;
        }
        Ok(removed)
    })
}

/// Deletes rows matching the non-empty `values` from `field_index` on.
pub fn remove_filtered<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    ptype: &str,
    field_index: usize,
    values: &[String],
    require_rows: bool,
) -> Result<u64, AdapterError> {
    let sql = statements.delete_filtered(field_index, values);
    let params = std::iter::once(ptype)
        .chain(values.iter().map(String::as_str).filter(|value| !value.is_empty()))
        .map(Some)
        .collect::<Vec<_>>();
    let removed = conn.execute(&sql, &params)?;
    require_removed(REMOVE_FILTERED_POLICY, removed, require_rows)?;
    Ok(removed)
}

/// Enforces the at-least-one-row rule when requested.
const fn require_removed(
    operation: &'static str,
    removed: u64,
    require_rows: bool,
) -> Result<(), AdapterError> {
    if require_rows && removed < 1 {
        return Err(AdapterError::RowCount {
            operation,
            expected: 1,
            actual: removed,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Updates
// ============================================================================

/// Replaces `old` with `new` in one transaction.
pub fn replace_one<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    ptype: &str,
    old: &[String],
    new: &[String],
    require_rows: bool,
) -> Result<(), AdapterError> {
    in_transaction(conn, |conn| {
        remove_exact(conn, statements, ptype, old, require_rows)?;
        insert_one(conn, statements, ptype, new)
    })
}
