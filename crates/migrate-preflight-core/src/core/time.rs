// crates/migrate-preflight-core/src/core/time.rs
// ============================================================================
// Module: Migrate Preflight Time Model
// Description: Canonical timestamp representation for runs and heartbeats.
// Purpose: Keep check verdicts deterministic by threading explicit time values.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Checks never read wall-clock time. The engine driver stamps the run start
//! once and threads it through every scope, so heartbeat-age verdicts are a
//! pure function of inputs and provider responses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix-epoch-millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    ///
    /// Only the engine driver calls this; everything below it receives time
    /// as a value.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(&self) -> i64 {
        self.0
    }

    /// Returns the whole hours elapsed from `earlier` to `self`.
    ///
    /// Saturates at zero when `earlier` is in the future.
    #[must_use]
    pub const fn hours_since(&self, earlier: Self) -> i64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta / 3_600_000 }
    }
}
