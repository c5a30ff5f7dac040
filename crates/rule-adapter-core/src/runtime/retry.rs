// crates/rule-adapter-core/src/runtime/retry.rs
// ============================================================================
// Module: Retrying Session
// Description: Connection ownership with a bounded reconnect-and-retry loop.
// Purpose: Absorb transient storage faults by replacing the connection.
// Dependencies: serde, tracing
// ============================================================================

//! ## Overview
//! A [`Session`] owns one live connection and the [`ConnectionSource`] it
//! came from. [`Session::run`] executes a unit of work; when the work fails
//! with a retryable error the session waits, discards the connection,
//! acquires a fresh one and re-runs the whole unit. Units are transactional,
//! so a retried unit never observes a half-applied predecessor.
//!
//! The budget counts total attempts. Non-retryable errors surface at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use tracing::warn;

use crate::interfaces::AdapterError;
use crate::interfaces::ConnectionSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default total attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Retry budget for storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before each retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Builds a policy from an attempt budget and delay.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns the delay applied before each retry.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Invalid`] when the attempt budget is zero.
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.max_attempts == 0 {
            return Err(AdapterError::Invalid(
                "retry max_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Default for [`RetryPolicy::max_attempts`].
const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Default for [`RetryPolicy::delay_ms`].
const fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// A replaceable connection guarded by a retry policy.
///
/// # Invariants
/// - Once closed, a session never reconnects.
pub struct Session<S: ConnectionSource> {
    /// Source consulted for replacement connections.
    source: S,
    /// Live connection, absent after a failed reacquisition or close.
    connection: Option<S::Connection>,
    /// Retry budget.
    policy: RetryPolicy,
    /// Set by [`Session::close`].
    closed: bool,
}

impl<S: ConnectionSource> Session<S> {
    /// Opens a session with one eagerly acquired connection.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the policy is invalid or the first
    /// connection cannot be acquired.
    pub fn open(source: S, policy: RetryPolicy) -> Result<Self, AdapterError> {
        policy.validate()?;
        let connection = source.connect()?;
        Ok(Self {
            source,
            connection: Some(connection),
            policy,
            closed: false,
        })
    }

    /// Returns the connection source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the retry policy.
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns true once [`Session::close`] has been called.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drops the live connection and refuses further work.
    pub fn close(&mut self) {
        self.connection = None;
        self.closed = true;
    }

    /// Runs `operation` against the live connection under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Closed`] after close, the operation's own
    /// error when it is not retryable, or [`AdapterError::RetryExhausted`]
    /// once every attempt failed.
    pub fn run<T, F>(&mut self, mut operation: F) -> Result<T, AdapterError>
    where
        F: FnMut(&mut S::Connection) -> Result<T, AdapterError>,
    {
        if self.closed {
            return Err(AdapterError::Closed);
        }
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1 ..= attempts {
            if attempt > 1 {
                thread::sleep(self.policy.delay());
            }
            let outcome = match self.acquire(attempt > 1) {
                Ok(connection) => operation(connection),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "rule storage attempt failed"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        let message = last_error.map_or_else(String::new, |err| err.to_string());
        error!(attempts, error = %message, "rule storage retry budget exhausted");
        Err(AdapterError::RetryExhausted {
            attempts,
            message,
        })
    }

    /// Returns the live connection, replacing it first when `fresh` is set.
    fn acquire(&mut self, fresh: bool) -> Result<&mut S::Connection, AdapterError> {
        if fresh {
            self.connection = None;
        }
        if self.connection.is_none() {
            self.connection = Some(self.source.connect()?);
        }
        self.connection
            .as_mut()
            .ok_or_else(|| AdapterError::Storage("rule storage connection unavailable".to_string()))
    }
}
