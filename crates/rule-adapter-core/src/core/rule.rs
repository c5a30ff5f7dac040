// crates/rule-adapter-core/src/core/rule.rs
// ============================================================================
// Module: Rule Model and Codec
// Description: Policy rule tuples and their fixed-width row projection.
// Purpose: Encode variable-arity rules into seven-column rows and back.
// Dependencies: serde, tracing
// ============================================================================

//! ## Overview
//! A [`PolicyRule`] is a rule-type tag plus up to [`MAX_RULE_VALUES`] ordered
//! values. A [`StoredRow`] is its relational projection: `ptype` plus six
//! nullable value columns `v0..v5`, with trailing columns absent.
//!
//! Absence is explicit (`None`) and never inferred from an empty string, so a
//! present empty value survives the row round trip. Whether it also survives
//! the textual line depends on escaping; see [`StoredRow::decode`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::core::line::escape_value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of value columns (`v0..v5`) in the rule table.
pub const MAX_RULE_VALUES: usize = 6;
/// Default rule table name.
pub const DEFAULT_TABLE_NAME: &str = "casbin_rule";
/// Section holding permission rules (`p`, `p2`, ...).
pub const POLICY_SECTION: &str = "p";
/// Section holding grouping/role rules (`g`, `g2`, ...).
pub const GROUPING_SECTION: &str = "g";
/// Separator placed between fields of a textual policy line.
pub const LINE_SEPARATOR: &str = ", ";

// ============================================================================
// SECTION: Policy Rule
// ============================================================================

/// A typed policy rule tuple.
///
/// # Invariants
/// - `values` has no positional gaps; a three-value rule occupies `v0..v2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Rule type tag (`p`, `g`, `p2`, ...).
    pub ptype: String,
    /// Ordered rule values.
    pub values: Vec<String>,
}

impl PolicyRule {
    /// Builds a rule from a type tag and its values.
    #[must_use]
    pub fn new<I, V>(ptype: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            ptype: ptype.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the model section (`p` or `g`) this rule belongs to.
    #[must_use]
    pub fn section(&self) -> Option<&'static str> {
        rule_section(&self.ptype)
    }
}

/// Returns the model section for a rule type tag, keyed by its first letter.
#[must_use]
pub fn rule_section(ptype: &str) -> Option<&'static str> {
    match ptype.as_bytes().first() {
        Some(b'p') => Some(POLICY_SECTION),
        Some(b'g') => Some(GROUPING_SECTION),
        _ => None,
    }
}

// ============================================================================
// SECTION: Stored Row
// ============================================================================

/// Relational projection of a policy rule.
///
/// # Invariants
/// - `values[i]` maps to column `v{i}`; `None` is SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredRow {
    /// Rule type tag.
    pub ptype: String,
    /// Value columns `v0..v5`.
    pub values: [Option<String>; MAX_RULE_VALUES],
}

impl StoredRow {
    /// Encodes a rule into a row. Values beyond the sixth are dropped.
    #[must_use]
    pub fn encode<S: AsRef<str>>(ptype: &str, values: &[S]) -> Self {
        let mut row = Self::default();
        row.encode_into(ptype, values);
        row
    }

    /// Re-encodes a rule into this row, reusing its allocations.
    pub fn encode_into<S: AsRef<str>>(&mut self, ptype: &str, values: &[S]) {
        if values.len() > MAX_RULE_VALUES {
            warn!(
                ptype,
                supplied = values.len(),
                stored = MAX_RULE_VALUES,
                "rule values beyond the sixth column are not stored"
            );
        }
        self.ptype.clear();
        self.ptype.push_str(ptype);
        for (index, slot) in self.values.iter_mut().enumerate() {
            match values.get(index) {
                Some(value) => {
                    let value = value.as_ref();
                    match slot {
                        Some(existing) => {
                            existing.clear();
                            existing.push_str(value);
                        }
                        None => *slot = Some(value.to_string()),
                    }
                }
                None => *slot = None,
            }
        }
    }

    /// Returns the value stored in column `v{index}`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(Option::as_deref)
    }

    /// Returns the number of leading present columns.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.values.iter().take_while(|value| value.is_some()).count()
    }

    /// Returns the statement parameters `ptype, v0..v5` in column order.
    #[must_use]
    pub fn params(&self) -> [Option<&str>; MAX_RULE_VALUES + 1] {
        let [v0, v1, v2, v3, v4, v5] = &self.values;
        [
            Some(self.ptype.as_str()),
            v0.as_deref(),
            v1.as_deref(),
            v2.as_deref(),
            v3.as_deref(),
            v4.as_deref(),
            v5.as_deref(),
        ]
    }

    /// Converts the row back into a rule, skipping absent columns.
    #[must_use]
    pub fn to_rule(&self) -> PolicyRule {
        PolicyRule {
            ptype: self.ptype.clone(),
            values: self.values.iter().flatten().cloned().collect(),
        }
    }

    /// Decodes the row into the textual line handed to the engine's loader.
    ///
    /// Columns are scanned strictly `v0..v5` and `NULL` only ever means
    /// "omit this field". With `escape` set every present value is quoted
    /// (see [`escape_value`]), so empty values and values containing the
    /// separator survive. Without it empty values are omitted.
    #[must_use]
    pub fn decode(&self, escape: bool) -> String {
        let mut line = String::with_capacity(self.ptype.len() + 16 * self.arity());
        line.push_str(&self.ptype);
        for value in self.values.iter().flatten() {
            if escape {
                line.push_str(LINE_SEPARATOR);
                line.push_str(&escape_value(value));
            } else if !value.is_empty() {
                line.push_str(LINE_SEPARATOR);
                line.push_str(value);
            }
        }
        line
    }
}

impl From<&PolicyRule> for StoredRow {
    fn from(rule: &PolicyRule) -> Self {
        Self::encode(&rule.ptype, &rule.values)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_leaves_trailing_columns_absent() {
        let row = StoredRow::encode("p", &["alice", "data1", "read"]);
        assert_eq!(row.value(0), Some("alice"));
        assert_eq!(row.value(2), Some("read"));
        assert_eq!(row.value(3), None);
        assert_eq!(row.arity(), 3);
    }

    #[test]
    fn encode_truncates_beyond_six_values() {
        let values = ["a", "b", "c", "d", "e", "f", "g"];
        let row = StoredRow::encode("p", &values);
        assert_eq!(row.arity(), MAX_RULE_VALUES);
        assert_eq!(row.value(5), Some("f"));
    }

    #[test]
    fn encode_into_clears_previous_columns() {
        let mut row = StoredRow::encode("p", &["a", "b", "c", "d"]);
        row.encode_into("g", &["x"]);
        assert_eq!(row.ptype, "g");
        assert_eq!(row.value(0), Some("x"));
        assert_eq!(row.value(1), None);
        assert_eq!(row.value(3), None);
    }

    #[test]
    fn decode_without_escaping_skips_empty_and_null() {
        let mut row = StoredRow::encode("p", &["alice", "", "read"]);
        row.values[4] = Some("late".to_string());
        assert_eq!(row.decode(false), "p, alice, read, late");
    }

    #[test]
    fn decode_with_escaping_keeps_empty_values() {
        let row = StoredRow::encode("p", &["alice", "", "read"]);
        assert_eq!(row.decode(true), "p, \"alice\", \"\", \"read\"");
    }

    #[test]
    fn params_follow_column_order() {
        let row = StoredRow::encode("g", &["alice", "admin"]);
        assert_eq!(row.params(), [Some("g"), Some("alice"), Some("admin"), None, None, None, None]);
    }

    #[test]
    fn rule_section_uses_first_letter() {
        assert_eq!(rule_section("p2"), Some(POLICY_SECTION));
        assert_eq!(rule_section("g"), Some(GROUPING_SECTION));
        assert_eq!(rule_section("m"), None);
        assert_eq!(rule_section(""), None);
    }
}
