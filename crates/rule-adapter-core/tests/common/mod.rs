// crates/rule-adapter-core/tests/common/mod.rs
// ============================================================================
// Module: Scripted Rule Database
// Description: In-memory fake implementing the connection interfaces.
// Purpose: Drive adapter retry, transaction, and SQL paths without a server.
// Dependencies: rule-adapter-core
// ============================================================================

//! ## Overview
//! [`ScriptedDatabase`] interprets the adapter's own statement shapes over an
//! in-memory row list, records every statement, and injects storage faults on
//! demand so retry and rollback behavior can be asserted exactly.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rule_adapter_core::AdapterError;
use rule_adapter_core::AdapterOptions;
use rule_adapter_core::ConnectionSource;
use rule_adapter_core::RetryPolicy;
use rule_adapter_core::RowVisitor;
use rule_adapter_core::RuleConnection;
use rule_adapter_core::StoredRow;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state behind every connection of one scripted database.
#[derive(Debug, Default)]
pub struct ScriptState {
    /// Product name reported to the adapter.
    pub product: String,
    /// Lower-case names of created tables, sequences, and triggers.
    pub objects: BTreeSet<String>,
    /// Committed and in-flight rows.
    pub rows: Vec<StoredRow>,
    /// Snapshot taken at `begin`, restored on rollback.
    pub snapshot: Option<Vec<StoredRow>>,
    /// Every statement issued, in order.
    pub log: Vec<String>,
    /// Number of connections handed out.
    pub connects: u32,
    /// Generation of the newest connection.
    pub generation: u32,
    /// Connections at or below this generation are broken.
    pub broken_through: u32,
    /// Upcoming connection attempts that fail.
    pub failing_connects: u32,
    /// Statement fragment and remaining injected failures.
    pub failures: Vec<(String, u32)>,
    /// Number of batches executed.
    pub batches: Vec<usize>,
    /// When set, catalog queries report every object missing.
    pub stale_catalog: bool,
    /// Statement fragments the database always rejects.
    pub rejections: Vec<String>,
    /// Rows visited before an injected scan failure, and remaining failures.
    pub scan_failure: Option<(usize, u32)>,
}

/// Fake database shared by the source and its connections.
#[derive(Debug, Clone)]
pub struct ScriptedDatabase {
    /// Shared state.
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedDatabase {
    /// Creates an empty database reporting `product`.
    pub fn new(product: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                product: product.to_string(),
                ..ScriptState::default()
            })),
        }
    }

    /// Locks the shared state.
    pub fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().expect("script state lock")
    }

    /// Fails the next `times` statements containing `fragment`.
    pub fn fail_on(&self, fragment: &str, times: u32) {
        self.state().failures.push((fragment.to_string(), times));
    }

    /// Makes catalog queries miss objects that exist, as when another
    /// process creates them between the check and the statement.
    pub fn hide_catalog(&self) {
        self.state().stale_catalog = true;
    }

    /// Rejects every statement containing `fragment` as a deterministic fault.
    pub fn reject_on(&self, fragment: &str) {
        self.state().rejections.push(fragment.to_string());
    }

    /// Fails the next `times` scans after `rows` rows have been visited.
    pub fn fail_scan_after(&self, rows: usize, times: u32) {
        self.state().scan_failure = Some((rows, times));
    }

    /// Breaks every connection handed out so far.
    pub fn break_connections(&self) {
        let mut state = self.state();
        state.broken_through = state.generation;
    }

    /// Fails the next `times` connection attempts.
    pub fn fail_connects(&self, times: u32) {
        self.state().failing_connects = times;
    }

    /// Returns a copy of the stored rows as `ptype, values` text.
    pub fn dump(&self) -> Vec<String> {
        self.state().rows.iter().map(|row| row.decode(false)).collect()
    }

    /// Returns the statements issued so far.
    pub fn log(&self) -> Vec<String> {
        self.state().log.clone()
    }

    /// Clears the statement log.
    pub fn clear_log(&self) {
        self.state().log.clear();
    }
}

impl ConnectionSource for ScriptedDatabase {
    type Connection = ScriptedConnection;

    fn connect(&self) -> Result<Self::Connection, AdapterError> {
        let mut state = self.state();
        state.connects += 1;
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(AdapterError::Storage("connection refused".to_string()));
        }
        state.generation += 1;
        Ok(ScriptedConnection {
            db: self.clone(),
            generation: state.generation,
        })
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// One connection to a [`ScriptedDatabase`].
#[derive(Debug)]
pub struct ScriptedConnection {
    /// Owning database.
    db: ScriptedDatabase,
    /// Generation number; broken generations fail every call.
    generation: u32,
}

impl ScriptedConnection {
    /// Logs a statement and applies injected faults.
    fn enter(&self, sql: &str) -> Result<MutexGuard<'_, ScriptState>, AdapterError> {
        let mut state = self.db.state();
        state.log.push(sql.to_string());
        if self.generation <= state.broken_through {
            return Err(AdapterError::Storage("connection reset".to_string()));
        }
        if let Some(fragment) =
            state.rejections.iter().find(|fragment| sql.contains(fragment.as_str()))
        {
            return Err(AdapterError::Rejected(format!("constraint violated on {fragment}")));
        }
        for (fragment, remaining) in &mut state.failures {
            if *remaining > 0 && sql.contains(fragment.as_str()) {
                *remaining -= 1;
                return Err(AdapterError::Storage(format!("injected failure on {fragment}")));
            }
        }
        Ok(state)
    }
}

impl RuleConnection for ScriptedConnection {
    fn product_name(&mut self) -> Result<String, AdapterError> {
        let state = self.enter("PRODUCT")?;
        Ok(state.product.clone())
    }

    fn execute_statement(&mut self, sql: &str) -> Result<(), AdapterError> {
        let mut state = self.enter(sql)?;
        let Some(name) = object_name(sql) else {
            return Ok(());
        };
        if sql.starts_with("DROP") {
            if sql.starts_with("DROP TABLE") && state.objects.contains(&name) {
                state.rows.clear();
            }
            state.objects.remove(&name);
        } else if sql.contains("CREATE ") {
            if state.objects.contains(&name) && !tolerates_existing(sql) {
                return Err(AdapterError::Rejected(format!("name {name} is already used")));
            }
            state.objects.insert(name);
        }
        Ok(())
    }

    fn query_exists(&mut self, sql: &str) -> Result<bool, AdapterError> {
        let state = self.enter(sql)?;
        let literal = sql.split('\'').nth(1).unwrap_or_default().to_ascii_lowercase();
        Ok(!state.stale_catalog && state.objects.contains(&literal))
    }

    fn execute(&mut self, sql: &str, params: &[Option<&str>]) -> Result<u64, AdapterError> {
        let mut state = self.enter(sql)?;
        if sql.starts_with("INSERT") {
            state.rows.push(row_from_params(params));
            return Ok(1);
        }
        if let Some((_, clauses)) = sql.split_once(" WHERE ") {
            let predicate = parse_predicate(clauses, params);
            let before = state.rows.len();
            state.rows.retain(|row| {
                !predicate
                    .iter()
                    .all(|(column, value)| row_column(row, *column) == value.as_deref())
            });
            return Ok(u64::try_from(before - state.rows.len()).unwrap());
        }
        let removed = state.rows.len();
        state.rows.clear();
        Ok(u64::try_from(removed).unwrap())
    }

    fn execute_batch(&mut self, sql: &str, rows: &[StoredRow]) -> Result<(), AdapterError> {
        let mut state = self.enter(sql)?;
        state.batches.push(rows.len());
        state.rows.extend(rows.iter().cloned());
        Ok(())
    }

    fn scan_rows(&mut self, sql: &str, visit: &mut RowVisitor<'_>) -> Result<(), AdapterError> {
        let (rows, cut) = {
            let mut state = self.enter(sql)?;
            let cut = match &mut state.scan_failure {
                Some((after, remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(*after)
                }
                _ => None,
            };
            (state.rows.clone(), cut)
        };
        for (index, row) in rows.iter().enumerate() {
            if cut == Some(index) {
                return Err(AdapterError::Storage("connection reset mid-scan".to_string()));
            }
            visit(row)?;
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<(), AdapterError> {
        let mut state = self.enter("BEGIN")?;
        state.snapshot = Some(state.rows.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), AdapterError> {
        let mut state = self.enter("COMMIT")?;
        state.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), AdapterError> {
        let mut state = self.db.state();
        state.log.push("ROLLBACK".to_string());
        if let Some(snapshot) = state.snapshot.take() {
            state.rows = snapshot;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Statement Interpretation
// ============================================================================

/// Extracts the object a `CREATE` or `DROP` statement names, including DDL
/// wrapped in a guard or a PL/SQL block.
fn object_name(sql: &str) -> Option<String> {
    let start = sql.find("CREATE ").or_else(|| sql.find("DROP "))?;
    let mut words = sql[start ..]
        .split_whitespace()
        .skip(1)
        .skip_while(|word| matches!(*word, "OR" | "REPLACE"));
    words.next()?;
    words
        .find(|word| !matches!(*word, "IF" | "NOT" | "EXISTS"))
        .map(|word| word.trim_end_matches('(').to_ascii_lowercase())
}

/// Returns true when a create statement succeeds on an existing object.
fn tolerates_existing(sql: &str) -> bool {
    sql.contains("IF NOT EXISTS")
        || sql.contains("SQLCODE != -955")
        || sql.starts_with("CREATE OR REPLACE")
}

/// Builds a row from `ptype, v0..v5` insert parameters.
fn row_from_params(params: &[Option<&str>]) -> StoredRow {
    let mut row = StoredRow {
        ptype: params[0].unwrap_or_default().to_string(),
        ..StoredRow::default()
    };
    for (slot, value) in row.values.iter_mut().zip(&params[1 ..]) {
        *slot = value.map(str::to_string);
    }
    row
}

/// Parses `ptype = ? AND vN = ? AND vM IS NULL` into column constraints.
///
/// Column `None` is `ptype`; a `None` value means `IS NULL`.
fn parse_predicate(clauses: &str, params: &[Option<&str>]) -> Vec<(Option<usize>, Option<String>)> {
    let mut bound = params.iter();
    clauses
        .split(" AND ")
        .map(|clause| {
            let column = clause.split_whitespace().next().unwrap();
            let index = column.strip_prefix('v').map(|digit| digit.parse::<usize>().unwrap());
            let value = if clause.ends_with("IS NULL") {
                None
            } else {
                bound.next().unwrap().map(str::to_string)
            };
            (index, value)
        })
        .collect()
}

/// Reads a column of a row; `None` selects `ptype`.
fn row_column(row: &StoredRow, column: Option<usize>) -> Option<&str> {
    match column {
        None => Some(row.ptype.as_str()),
        Some(index) => row.value(index),
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Options with a zero retry delay and a small batch size.
pub fn fast_options(batch_size: usize) -> AdapterOptions {
    AdapterOptions {
        batch_size,
        retry: RetryPolicy {
            max_attempts: 3,
            delay_ms: 0,
        },
        ..AdapterOptions::default()
    }
}

/// Converts string slices into an owned rule.
pub fn rule(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
