// crates/rule-adapter-core/src/lib.rs
// ============================================================================
// Module: Rule Adapter Core Library
// Description: Public API surface for the policy rule adapter.
// Purpose: Expose rule types, connection interfaces, and the adapter runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Rule adapter core persists access-control policy rules (`ptype` plus up
//! to six positional values) in a single relational table. It is backend
//! agnostic: storage drivers plug in through [`ConnectionSource`] and
//! [`RuleConnection`], and policy engines through [`PolicyModel`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Adapter;
pub use interfaces::AdapterError;
pub use interfaces::ConnectionSource;
pub use interfaces::PolicyGroup;
pub use interfaces::PolicyModel;
pub use interfaces::RowVisitor;
pub use interfaces::RuleConnection;
pub use runtime::AdapterOptions;
pub use runtime::DEFAULT_BATCH_SIZE;
pub use runtime::MemoryModel;
pub use runtime::RetryPolicy;
pub use runtime::RuleAdapter;
pub use runtime::Session;
pub use runtime::in_transaction;
pub use runtime::validate_table_name;
