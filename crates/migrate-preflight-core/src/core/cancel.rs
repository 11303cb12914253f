// crates/migrate-preflight-core/src/core/cancel.rs
// ============================================================================
// Module: Migrate Preflight Cancellation
// Description: Cloneable cancellation token with deadline and explicit abort.
// Purpose: Let callers bound a run and stop in-flight scopes cooperatively.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Cancellation is cooperative: orchestrators consult the token between
//! checks, and cloud calls consult it before and during I/O. Tokens form a
//! chain, so the engine can derive a deadline-bearing child from a caller's
//! abort-only token and both signals are honored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Cancel Token
// ============================================================================

/// Cloneable cancellation handle.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Set by `abort`.
    aborted: AtomicBool,
    /// Absolute deadline, when one was set at construction.
    deadline: Option<Instant>,
    /// Parent token, consulted for both signals.
    parent: Option<CancelToken>,
}

impl CancelToken {
    /// Creates a token that never cancels on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token with an absolute deadline.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(Inner {
                aborted: AtomicBool::new(false),
                deadline: Some(deadline),
                parent: None,
            }),
        }
    }

    /// Derives a child that also cancels when this token does.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                aborted: AtomicBool::new(false),
                deadline: Instant::now().checked_add(timeout),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Requests cancellation.
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
    }

    /// Returns true once aborted or past any deadline in the chain.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.aborted.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(deadline) = self.inner.deadline
            && Instant::now() >= deadline
        {
            return true;
        }
        self.inner.parent.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Returns the time remaining until the tightest deadline in the chain.
    ///
    /// `None` means no deadline applies; `Some(Duration::ZERO)` means the
    /// deadline has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let own = self.inner.deadline.map(|deadline| {
            deadline.checked_duration_since(Instant::now()).unwrap_or(Duration::ZERO)
        });
        let parent = self.inner.parent.as_ref().and_then(CancelToken::remaining);
        match (own, parent) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }
}
