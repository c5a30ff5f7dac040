// crates/rule-adapter-core/src/core/filter.rs
// ============================================================================
// Module: Rule Filter
// Description: Partial-value predicates for filtered policy loads.
// Purpose: Decide row by row whether a stored rule belongs to a partial load.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Filter`] holds one positional constraint list per section. Entry `i`
//! constrains column `v{i}`; an empty entry is a wildcard. Rows whose type
//! belongs to neither section are never skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::rule::GROUPING_SECTION;
use crate::core::rule::POLICY_SECTION;
use crate::core::rule::StoredRow;
use crate::core::rule::rule_section;
use crate::interfaces::AdapterError;

// ============================================================================
// SECTION: Filter
// ============================================================================

/// Partial-value filter for policy loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    /// Constraints for `p`-section rules.
    #[serde(default)]
    pub p: Vec<String>,
    /// Constraints for `g`-section rules.
    #[serde(default)]
    pub g: Vec<String>,
}

impl Filter {
    /// Builds a filter from both constraint lists.
    #[must_use]
    pub fn new<P, G>(p: P, g: G) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self {
            p: p.into_iter().map(Into::into).collect(),
            g: g.into_iter().map(Into::into).collect(),
        }
    }

    /// Validates a loosely typed filter argument.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidFilter`] unless `value` is an object with
    /// optional `p` and `g` string arrays and nothing else.
    pub fn from_json(value: &Value) -> Result<Self, AdapterError> {
        Self::deserialize(value).map_err(|err| AdapterError::InvalidFilter(err.to_string()))
    }

    /// Returns the constraint list applied to a rule type.
    #[must_use]
    pub fn constraints_for(&self, ptype: &str) -> &[String] {
        match rule_section(ptype) {
            Some(POLICY_SECTION) => &self.p,
            Some(GROUPING_SECTION) => &self.g,
            _ => &[],
        }
    }

    /// Returns true when the row fails a non-empty positional constraint.
    #[must_use]
    pub fn skips(&self, row: &StoredRow) -> bool {
        self.constraints_for(&row.ptype)
            .iter()
            .enumerate()
            .any(|(index, wanted)| !wanted.is_empty() && row.value(index) != Some(wanted.as_str()))
    }

    /// Returns true when the row belongs to the filtered load.
    #[must_use]
    pub fn matches(&self, row: &StoredRow) -> bool {
        !self.skips(row)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
