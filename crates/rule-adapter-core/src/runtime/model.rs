// crates/rule-adapter-core/src/runtime/model.rs
// ============================================================================
// Module: In-Memory Policy Model
// Description: Minimal section/ptype/rule store implementing PolicyModel.
// Purpose: Provide a reference model for tests, tools, and embedding.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`MemoryModel`] keeps rules grouped by section (`p` or `g`, from the first
//! letter of the type tag) and then by type tag, in sorted order. Lines are
//! loaded with [`parse_policy_line`], so escaped values come back verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::line::parse_policy_line;
use crate::core::rule::GROUPING_SECTION;
use crate::core::rule::POLICY_SECTION;
use crate::core::rule::PolicyRule;
use crate::core::rule::rule_section;
use crate::interfaces::AdapterError;
use crate::interfaces::PolicyGroup;
use crate::interfaces::PolicyModel;

// ============================================================================
// SECTION: Memory Model
// ============================================================================

/// Rules keyed by type tag.
type PtypeRules = BTreeMap<String, Vec<Vec<String>>>;

/// In-memory policy model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryModel {
    /// Section name to type tag to rules.
    sections: BTreeMap<&'static str, PtypeRules>,
}

impl MemoryModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule under its type tag.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Model`] when the type tag names no section.
    pub fn add_rule(&mut self, ptype: &str, values: Vec<String>) -> Result<(), AdapterError> {
        let section = rule_section(ptype)
            .ok_or_else(|| AdapterError::Model(format!("unknown policy type: {ptype}")))?;
        self.sections
            .entry(section)
            .or_default()
            .entry(ptype.to_string())
            .or_default()
            .push(values);
        Ok(())
    }

    /// Returns the rules stored under a type tag.
    #[must_use]
    pub fn rules(&self, ptype: &str) -> &[Vec<String>] {
        rule_section(ptype)
            .and_then(|section| self.sections.get(section))
            .and_then(|rules| rules.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns every rule, `p` section first, as typed rules.
    #[must_use]
    pub fn to_rules(&self) -> Vec<PolicyRule> {
        [POLICY_SECTION, GROUPING_SECTION]
            .into_iter()
            .filter_map(|section| self.sections.get(section))
            .flat_map(|by_ptype| by_ptype.iter())
            .flat_map(|(ptype, rules)| {
                rules
                    .iter()
                    .map(move |values| PolicyRule::new(ptype.as_str(), values.iter().cloned()))
            })
            .collect()
    }

    /// Returns the total number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.values().flat_map(BTreeMap::values).map(Vec::len).sum()
    }

    /// Returns true when the model holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every rule.
    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

impl PolicyModel for MemoryModel {
    fn load_policy_line(&mut self, line: &str) -> Result<(), AdapterError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }
        let mut fields = parse_policy_line(trimmed)
            .map_err(|err| AdapterError::Model(err.to_string()))?
            .into_iter();
        let ptype = fields.next().unwrap_or_default();
        self.add_rule(&ptype, fields.collect())
    }

    fn policy_groups(&self, section: &str) -> Vec<PolicyGroup<'_>> {
        self.sections.get(section).map_or_else(Vec::new, |by_ptype| {
            by_ptype
                .iter()
                .map(|(ptype, rules)| PolicyGroup {
                    ptype,
                    rules,
                })
                .collect()
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
