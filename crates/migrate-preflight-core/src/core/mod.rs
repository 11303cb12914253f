// crates/migrate-preflight-core/src/core/mod.rs
// ============================================================================
// Module: Migrate Preflight Core Types
// Description: Canonical declaration, outcome, and run-state structures.
// Purpose: Provide stable, serializable types for migration preflight runs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define the user-facing declarations (projects and machines),
//! the closed check catalogue, per-check outcomes, and the aggregated run
//! report. These types are the canonical source of truth for any rendering
//! or serialization layer built on top of the engine.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cancel;
pub mod check;
pub mod decl;
pub mod hashing;
pub mod identifiers;
pub mod readiness;
pub mod settings;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::CancelToken;
pub use check::CauseTrace;
pub use check::CheckId;
pub use check::CheckOutcome;
pub use check::CheckRef;
pub use check::Severity;
pub use check::TIER1_ORDER;
pub use check::TIER2_ORDER;
pub use decl::ApplianceKind;
pub use decl::DiskKind;
pub use decl::InputError;
pub use decl::MachineDecl;
pub use decl::ProjectDecl;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::PrincipalId;
pub use identifiers::ProjectKey;
pub use identifiers::ProjectKeyError;
pub use identifiers::RegionCode;
pub use identifiers::RequestId;
pub use identifiers::ResourceGroupName;
pub use identifiers::RoleDefinitionId;
pub use identifiers::SubscriptionId;
pub use readiness::MachineReadiness;
pub use readiness::ProjectReadiness;
pub use readiness::Run;
pub use readiness::RunSummary;
pub use readiness::SkipReason;
pub use settings::AccessRbacSettings;
pub use settings::CONTRIBUTOR_ROLE_ID;
pub use settings::OWNER_ROLE_ID;
pub use settings::ApplianceHealthSettings;
pub use settings::EnabledSetting;
pub use settings::GlobalSettings;
pub use settings::QuotaVcpuSettings;
pub use settings::ResolvedSettings;
pub use settings::ServerRbacSettings;
pub use settings::StorageCacheSettings;
pub use time::Timestamp;
