// crates/rule-adapter-core/src/runtime/mod.rs
// ============================================================================
// Module: Rule Adapter Runtime
// Description: Retrying sessions, schema provisioning, sync, and mutation.
// Purpose: Drive rule storage through the connection interfaces.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Runtime modules execute the adapter contract against a live connection.
//! Every storage call goes through a [`Session`] so transient faults are
//! retried on a fresh connection and everything else surfaces immediately.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod adapter;
pub mod model;
mod mutation;
pub mod retry;
pub mod schema;
pub mod sync;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use adapter::AdapterOptions;
pub use adapter::DEFAULT_BATCH_SIZE;
pub use adapter::RuleAdapter;
pub use adapter::validate_table_name;
pub use model::MemoryModel;
pub use retry::RetryPolicy;
pub use retry::Session;
pub use sync::in_transaction;
