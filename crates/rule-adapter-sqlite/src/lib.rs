// crates/rule-adapter-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Rule Storage
// Description: Embedded ConnectionSource backend using SQLite WAL.
// Purpose: Persist policy rules in a local SQLite file.
// Dependencies: rule-adapter-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ConnectionSource`] for the rule
//! adapter. Every connection opens the configured database file with the
//! configured journal and sync pragmas, so a reconnect after a storage fault
//! sees exactly the committed rules.
//!
//! [`ConnectionSource`]: rule_adapter_core::ConnectionSource

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use source::SqliteConnection;
pub use source::SqliteJournalMode;
pub use source::SqliteSource;
pub use source::SqliteSourceConfig;
pub use source::SqliteSourceError;
pub use source::SqliteSyncMode;
