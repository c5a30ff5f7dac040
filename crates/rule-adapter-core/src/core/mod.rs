// crates/rule-adapter-core/src/core/mod.rs
// ============================================================================
// Module: Rule Adapter Core Types
// Description: Rule data model, codec, line text, filters, and dialect data.
// Purpose: Provide the pure, I/O-free building blocks of the adapter.
// Dependencies: serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Core modules hold everything that does not touch a connection: the rule
//! and row types, policy-line escaping and parsing, filters, dialect schema
//! plans, and rendered statements.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod dialect;
pub mod filter;
pub mod line;
pub mod rule;
pub mod statements;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dialect::Dialect;
pub use dialect::DialectSchema;
pub use dialect::SchemaStep;
pub use dialect::StepGuard;
pub use dialect::render_template;
pub use filter::Filter;
pub use line::PolicyLineError;
pub use line::escape_value;
pub use line::parse_policy_line;
pub use rule::DEFAULT_TABLE_NAME;
pub use rule::GROUPING_SECTION;
pub use rule::MAX_RULE_VALUES;
pub use rule::POLICY_SECTION;
pub use rule::PolicyRule;
pub use rule::StoredRow;
pub use rule::rule_section;
pub use statements::RuleStatements;
