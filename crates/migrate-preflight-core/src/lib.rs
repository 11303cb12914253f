// crates/migrate-preflight-core/src/lib.rs
// ============================================================================
// Module: Migrate Preflight Core Library
// Description: Public API surface for the Migrate Preflight engine.
// Purpose: Expose core types, cloud interfaces, and the validation runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Migrate Preflight core provides read-only validation of bulk VM migration
//! plans: a landing-zone pass per migrate project and a servers pass per
//! declared machine. The engine is backend-agnostic and talks to the cloud
//! control plane exclusively through the [`CloudApi`] interface.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::Appliance;
pub use interfaces::ApplianceHealth;
pub use interfaces::BearerToken;
pub use interfaces::CallContext;
pub use interfaces::CloudApi;
pub use interfaces::CloudError;
pub use interfaces::CreateStorageRequest;
pub use interfaces::DiscoveredMachine;
pub use interfaces::ProjectInfo;
pub use interfaces::QuotaUsage;
pub use interfaces::ResourceGroupInfo;
pub use interfaces::RestrictionScope;
pub use interfaces::SkuInfo;
pub use interfaces::SkuRestriction;
pub use interfaces::StorageAccountInfo;
pub use interfaces::SubnetInfo;
pub use interfaces::SubscriptionInfo;
pub use interfaces::TokenSource;
pub use interfaces::VnetInfo;
pub use runtime::EngineError;
pub use runtime::EngineOptions;
pub use runtime::PreflightEngine;
pub use runtime::RunContext;
pub use runtime::default_parallelism;
