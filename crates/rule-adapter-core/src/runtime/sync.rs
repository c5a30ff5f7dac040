// crates/rule-adapter-core/src/runtime/sync.rs
// ============================================================================
// Module: Bulk Sync
// Description: Filtered loads, batched inserts, and transaction scoping.
// Purpose: Move whole rule sets between storage and the policy model.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Loads decode matching rows through the codec as the cursor advances and
//! hand the decoded lines to the model once the scan has finished. Saves
//! delete every row and re-insert the model inside one transaction, flushing
//! prepared batches of a fixed size. [`in_transaction`] guarantees
//! commit-or-rollback with auto-commit restored either way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;

use crate::core::filter::Filter;
use crate::core::rule::PolicyRule;
use crate::core::rule::StoredRow;
use crate::core::statements::RuleStatements;
use crate::interfaces::AdapterError;
use crate::interfaces::PolicyModel;
use crate::interfaces::RuleConnection;

// ============================================================================
// SECTION: Transactions
// ============================================================================

/// Runs `work` inside a transaction.
///
/// Commits on success. On any failure, including a failed commit, the
/// transaction is rolled back and the original error returned.
///
/// # Errors
///
/// Returns [`AdapterError`] when the transaction cannot start, `work` fails,
/// or the commit fails.
pub fn in_transaction<C, T, F>(conn: &mut C, work: F) -> Result<T, AdapterError>
where
    C: RuleConnection + ?Sized,
    F: FnOnce(&mut C) -> Result<T, AdapterError>,
{
    conn.begin()?;
    match work(conn) {
        Ok(value) => match conn.commit() {
            Ok(()) => Ok(value),
            Err(err) => {
                release(conn);
                Err(err)
            }
        },
        Err(err) => {
            release(conn);
            Err(err)
        }
    }
}

/// Rolls back after a failure; the original error takes precedence.
fn release<C: RuleConnection + ?Sized>(conn: &mut C) {
    if let Err(err) = conn.rollback() {
        debug!(error = %err, "rollback after failed transaction did not complete");
    }
}

// ============================================================================
// SECTION: Batched Inserts
// ============================================================================

/// Accumulates encoded rows and flushes them as prepared batches.
///
/// # Invariants
/// - `pending[..filled]` holds the unflushed rows; slots past `filled` are
///   spare allocations reused by later rows.
pub(crate) struct InsertBatcher<'a, C: RuleConnection + ?Sized> {
    /// Target connection.
    conn: &'a mut C,
    /// Rendered insert statement.
    sql: &'a str,
    /// Flush threshold.
    batch_size: usize,
    /// Row slots.
    pending: Vec<StoredRow>,
    /// Number of live rows in `pending`.
    filled: usize,
    /// Rows flushed so far.
    written: usize,
}

impl<'a, C: RuleConnection + ?Sized> InsertBatcher<'a, C> {
    /// Creates an empty batcher.
    pub(crate) fn new(conn: &'a mut C, sql: &'a str, batch_size: usize) -> Self {
        Self {
            conn,
            sql,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            filled: 0,
            written: 0,
        }
    }

    /// Queues one rule, flushing when the batch is full.
    pub(crate) fn push(&mut self, ptype: &str, values: &[String]) -> Result<(), AdapterError> {
        if let Some(slot) = self.pending.get_mut(self.filled) {
            slot.encode_into(ptype, values);
        } else {
            self.pending.push(StoredRow::encode(ptype, values));
        }
        self.filled += 1;
        if self.filled >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flushes the remainder and returns the total rows written.
    pub(crate) fn finish(mut self) -> Result<usize, AdapterError> {
        self.flush()?;
        Ok(self.written)
    }

    /// Sends the queued rows as one batch.
    fn flush(&mut self) -> Result<(), AdapterError> {
        if self.filled == 0 {
            return Ok(());
        }
        self.conn.execute_batch(self.sql, &self.pending[.. self.filled])?;
        debug!(rows = self.filled, "rule batch flushed");
        self.written += self.filled;
        self.filled = 0;
        Ok(())
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Decodes every row passing `filter` and feeds the lines to `model`.
///
/// Lines reach the model only after the scan completes, so a scan that fails
/// partway and is retried never loads a rule twice.
pub(crate) fn load_into_model<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    escape: bool,
    filter: Option<&Filter>,
    model: &mut dyn PolicyModel,
) -> Result<usize, AdapterError> {
    let mut lines = Vec::new();
    conn.scan_rows(statements.select_all(), &mut |row| {
        if filter.is_none_or(|filter| !filter.skips(row)) {
            lines.push(row.decode(escape));
        }
        Ok(())
    })?;
    for line in &lines {
        model.load_policy_line(line)?;
    }
    debug!(
        table = statements.table(),
        rules = lines.len(),
        filtered = filter.is_some(),
        "rules loaded"
    );
    Ok(lines.len())
}

/// Collects every row passing `filter` as a typed rule.
pub(crate) fn load_rules<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    filter: Option<&Filter>,
) -> Result<Vec<PolicyRule>, AdapterError> {
    let mut rules = Vec::new();
    conn.scan_rows(statements.select_all(), &mut |row| {
        if filter.is_none_or(|filter| filter.matches(row)) {
            rules.push(row.to_rule());
        }
        Ok(())
    })?;
    Ok(rules)
}

// ============================================================================
// SECTION: Saving
// ============================================================================

/// A rule borrowed from a model or caller: type tag plus values.
pub(crate) type RuleRef<'a> = (&'a str, &'a [String]);

/// Atomically replaces the table contents with `rules`, in order.
pub(crate) fn replace_all<C: RuleConnection + ?Sized>(
    conn: &mut C,
    statements: &RuleStatements,
    batch_size: usize,
    rules: &[RuleRef<'_>],
) -> Result<usize, AdapterError> {
    let written = in_transaction(conn, |conn| {
        conn.execute(statements.delete_all(), &[])?;
        let mut batcher = InsertBatcher::new(conn, statements.insert(), batch_size);
        for (ptype, values) in rules {
            batcher.push(ptype, values)?;
        }
        batcher.finish()
    })?;
    debug!(table = statements.table(), rules = written, "rules saved");
    Ok(written)
}
