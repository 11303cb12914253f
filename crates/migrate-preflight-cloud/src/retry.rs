// crates/migrate-preflight-cloud/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded exponential backoff with jitter for transient faults.
// Purpose: Keep the retry budget per-call and classification fail-closed.
// Dependencies: migrate-preflight-core, rand
// ============================================================================

//! ## Overview
//! Only transient faults retry: throttling, 5xx-shaped server errors, and
//! transport failures. Auth and not-found answers surface immediately. The
//! budget belongs to a single call, so one flaky endpoint cannot starve the
//! rest of a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use migrate_preflight_core::CancelToken;
use migrate_preflight_core::CloudError;
use migrate_preflight_core::RequestId;
use rand::RngCore;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Transient fault class observed before the budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableKind {
    /// Provider throttling (429-shaped).
    Throttled,
    /// Server-side transient failure (408/5xx-shaped).
    Transient,
    /// Transport-level failure.
    Network,
}

/// Outcome of one call attempt.
#[derive(Debug)]
pub enum CallFailure {
    /// Non-retryable failure; surfaces immediately.
    Fatal(CloudError),
    /// Retryable failure; retried while budget remains.
    Retryable {
        /// Fault class.
        kind: RetryableKind,
        /// Rendered cause, preserved into the final error.
        reason: String,
        /// Provider request identifier, when returned.
        request_id: Option<RequestId>,
    },
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Per-call retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_factor: f64,
    /// Symmetric jitter fraction applied to each delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Computes the backoff delay for a retry attempt (0-based), with
    /// jitter applied.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = self.backoff_factor.powi(attempt.min(16) as i32);
        let base = self.base_delay.as_secs_f64() * exponent;
        let jittered = base * (1.0 + self.jitter * unit_jitter());
        Duration::from_secs_f64(jittered.max(0.0))
    }

    /// Runs `attempt` under this policy, sleeping between retries.
    ///
    /// # Errors
    ///
    /// Returns the fatal failure, the exhausted transient failure mapped to
    /// its taxonomy variant, or [`CloudError::Cancelled`] when the token
    /// fires between attempts.
    pub fn run<T>(
        &self,
        cancel: &CancelToken,
        mut attempt: impl FnMut() -> Result<T, CallFailure>,
    ) -> Result<T, CloudError> {
        for try_index in 0..=self.max_retries {
            if cancel.is_cancelled() {
                return Err(CloudError::Cancelled);
            }
            match attempt() {
                Ok(value) => return Ok(value),
                Err(CallFailure::Fatal(err)) => return Err(err),
                Err(CallFailure::Retryable {
                    kind,
                    reason,
                    request_id,
                }) => {
                    if try_index == self.max_retries {
                        return Err(exhausted(kind, reason, request_id));
                    }
                    let delay = self.delay_for(try_index);
                    tracing::warn!(
                        attempt = try_index + 1,
                        max = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "transient cloud failure, backing off"
                    );
                    let delay = match cancel.remaining() {
                        Some(remaining) => delay.min(remaining),
                        None => delay,
                    };
                    thread::sleep(delay);
                }
            }
        }
        Err(CloudError::Cancelled)
    }
}

/// Maps an exhausted transient fault to its taxonomy variant.
fn exhausted(kind: RetryableKind, reason: String, request_id: Option<RequestId>) -> CloudError {
    match kind {
        RetryableKind::Throttled => CloudError::Throttled {
            request_id,
        },
        RetryableKind::Transient => CloudError::Transient {
            reason,
            request_id,
        },
        RetryableKind::Network => CloudError::Network {
            reason,
        },
    }
}

/// Returns a uniform value in `[-1.0, 1.0]`.
fn unit_jitter() -> f64 {
    let raw = OsRng.next_u64() >> 11;
    let unit = raw as f64 / ((1_u64 << 53) as f64);
    unit.mul_add(2.0, -1.0)
}
