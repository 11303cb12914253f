// crates/migrate-preflight-config/src/lib.rs
// ============================================================================
// Module: Migrate Preflight Configuration Library
// Description: Declarative validation configuration with profile layering.
// Purpose: Load, validate, and resolve the settings document for a run.
// Dependencies: migrate-preflight-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML document with strict size limits and
//! fail-closed parsing. Resolution layers explicit overrides over the active
//! profile over built-in defaults, producing the immutable
//! [`migrate_preflight_core::ResolvedSettings`] snapshot the engine consumes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod resolve;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::GlobalSection;
pub use config::PreflightConfig;
pub use config::ProfileSection;
pub use config::Tier1Section;
pub use config::Tier2Section;
pub use resolve::resolve;
pub use resolve::resolve_with_overrides;
