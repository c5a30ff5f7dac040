// crates/rule-adapter-postgres/src/lib.rs
// ============================================================================
// Module: Postgres Rule Storage
// Description: Pooled PostgreSQL ConnectionSource backend.
// Purpose: Persist policy rules in a shared PostgreSQL database.
// Dependencies: rule-adapter-core, postgres, r2d2, r2d2_postgres
// ============================================================================

//! ## Overview
//! This crate provides a PostgreSQL-backed [`ConnectionSource`] for the rule
//! adapter. The r2d2 pool is the data source: every reconnect checks a
//! connection out of it, so a dropped server connection is replaced without
//! rebuilding the adapter.
//!
//! [`ConnectionSource`]: rule_adapter_core::ConnectionSource

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use source::PostgresConnection;
pub use source::PostgresPool;
pub use source::PostgresSource;
pub use source::PostgresSourceConfig;
pub use source::PostgresSourceError;
