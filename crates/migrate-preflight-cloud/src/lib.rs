// crates/migrate-preflight-cloud/src/lib.rs
// ============================================================================
// Module: Migrate Preflight Cloud Access Layer
// Description: Live control-plane client with retries and response caching.
// Purpose: Implement the core cloud interface over the management REST API.
// Dependencies: migrate-preflight-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The cloud access layer hides transport concerns from the check library:
//! bearer-token reuse, pagination, a bounded retry budget per call, and a
//! per-run response cache with single-flight semantics for the hot listing
//! operations. Compose [`ArmCloud`] with [`CachedCloud`] to get the full
//! layer the engine expects.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod cached;
pub mod live;
pub mod retry;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CacheKey;
pub use cache::CacheValue;
pub use cache::ResponseCache;
pub use cached::CachedCloud;
pub use live::ArmCloud;
pub use retry::CallFailure;
pub use retry::RetryPolicy;
pub use retry::RetryableKind;
pub use transport::ArmTransport;
pub use transport::ArmTransportConfig;
