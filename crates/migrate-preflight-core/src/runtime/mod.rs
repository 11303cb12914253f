// crates/migrate-preflight-core/src/runtime/mod.rs
// ============================================================================
// Module: Migrate Preflight Runtime
// Description: Orchestrators, check dispatch, and the engine driver.
// Purpose: Execute the two validation tiers over the cloud interface.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime turns declarations into readiness reports. Within a scope,
//! checks run sequentially in canonical order (they share fail-fast state);
//! across scopes, execution fans out over a bounded worker pool.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod checks;
pub mod engine;
pub mod landing_zone;
pub mod matcher;
pub(crate) mod net;
pub mod pool;
pub mod servers;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::EngineError;
pub use engine::EngineOptions;
pub use engine::PreflightEngine;
pub use landing_zone::run_project_scope;
pub use matcher::assign_projects;
pub use pool::default_parallelism;
pub use pool::run_bounded;
pub use servers::run_machine_scope;

// ============================================================================
// SECTION: Run Context
// ============================================================================

use crate::core::cancel::CancelToken;
use crate::core::identifiers::PrincipalId;
use crate::core::time::Timestamp;
use crate::interfaces::CallContext;

/// Immutable per-run context shared by every scope.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Principal whose access is being validated.
    pub principal: PrincipalId,
    /// Run start time; the reference point for heartbeat ages.
    pub now: Timestamp,
    /// Cancellation handle for the run.
    pub cancel: CancelToken,
}

impl RunContext {
    /// Builds a cloud call context for this run.
    #[must_use]
    pub fn call(&self) -> CallContext {
        CallContext::new(self.cancel.clone())
    }
}
