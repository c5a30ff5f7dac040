// crates/rule-adapter-config/src/lib.rs
// ============================================================================
// Module: Rule Adapter Config Library
// Description: TOML configuration for rule adapter backends.
// Purpose: Load, validate, and open a configured rule adapter.
// Dependencies: rule-adapter-core, rule-adapter-sqlite, rule-adapter-postgres
// ============================================================================

//! ## Overview
//! Canonical configuration for the rule adapter: behavior options, retry
//! budget, and the storage backend, loaded from TOML with strict limits and
//! fail-closed validation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AdapterSection;
pub use config::ConfigError;
pub use config::DatabaseConfig;
pub use config::RuleAdapterConfig;
