// crates/migrate-preflight-config/src/config.rs
// ============================================================================
// Module: Migrate Preflight Configuration Document
// Description: TOML document types and fail-closed loading.
// Purpose: Parse the user's validation configuration with strict limits.
// Dependencies: migrate-preflight-core, serde, toml
// ============================================================================

//! ## Overview
//! The document mirrors the check catalogue: a `[global]` table, one table
//! per check under `[tier1]` and `[tier2]`, and named `[profiles.*]` with
//! dotted-path overrides. Missing tables fall back to built-in defaults;
//! invalid content fails closed before a run starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use migrate_preflight_core::RoleDefinitionId;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum number of profiles in one document.
pub(crate) const MAX_PROFILES: usize = 64;
/// Maximum number of overrides in one profile.
pub(crate) const MAX_PROFILE_OVERRIDES: usize = 256;

// ============================================================================
// SECTION: Document Types
// ============================================================================

/// Root of the validation configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreflightConfig {
    /// Profile applied when the caller does not name one.
    #[serde(default)]
    pub active_profile: Option<String>,
    /// Run-wide flags.
    #[serde(default)]
    pub global: GlobalSection,
    /// Landing-zone check tables.
    #[serde(default)]
    pub tier1: Tier1Section,
    /// Server check tables.
    #[serde(default)]
    pub tier2: Tier2Section,
    /// Named override sets.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileSection>,
}

/// `[global]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSection {
    /// Short-circuit a scope after a critical outcome.
    #[serde(default)]
    pub fail_fast: Option<bool>,
    /// Execute independent scopes on a worker pool.
    #[serde(default)]
    pub parallel_execution: Option<bool>,
    /// Timeout budget per scope, in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// `[tier1]` tables, one per landing-zone check.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tier1Section {
    /// `access.rbac.migrate_project` table.
    #[serde(rename = "access.rbac.migrate_project", default)]
    pub access_rbac_migrate_project: RbacCheckSection,
    /// `appliance.health` table.
    #[serde(rename = "appliance.health", default)]
    pub appliance_health: ApplianceHealthSection,
    /// `storage.cache` table.
    #[serde(rename = "storage.cache", default)]
    pub storage_cache: StorageCacheSection,
    /// `quota.vcpu` table.
    #[serde(rename = "quota.vcpu", default)]
    pub quota_vcpu: QuotaVcpuSection,
}

/// `[tier2]` tables, one per server check.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tier2Section {
    /// `server.region` table.
    #[serde(rename = "server.region", default)]
    pub server_region: EnabledSection,
    /// `server.resource_group` table.
    #[serde(rename = "server.resource_group", default)]
    pub server_resource_group: EnabledSection,
    /// `server.vnet_subnet` table.
    #[serde(rename = "server.vnet_subnet", default)]
    pub server_vnet_subnet: EnabledSection,
    /// `server.sku` table.
    #[serde(rename = "server.sku", default)]
    pub server_sku: EnabledSection,
    /// `server.disk_type` table.
    #[serde(rename = "server.disk_type", default)]
    pub server_disk_type: EnabledSection,
    /// `server.discovery` table.
    #[serde(rename = "server.discovery", default)]
    pub server_discovery: EnabledSection,
    /// `server.rbac.rg` table.
    #[serde(rename = "server.rbac.rg", default)]
    pub server_rbac_rg: RbacCheckSection,
}

/// Check table carrying enablement and a required-role set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RbacCheckSection {
    /// Whether the check runs.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Role definition ids that satisfy the check.
    #[serde(default)]
    pub required_roles: Option<Vec<String>>,
}

/// `appliance.health` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceHealthSection {
    /// Whether the check runs.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Heartbeats at or beyond this age (hours) raise a warning.
    #[serde(default)]
    pub max_heartbeat_age_hours: Option<i64>,
}

/// `storage.cache` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageCacheSection {
    /// Whether the check runs.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Create the storage account when missing.
    #[serde(default)]
    pub auto_create: Option<bool>,
}

/// `quota.vcpu` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaVcpuSection {
    /// Whether the check runs.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Projected usage at or beyond this percentage raises a warning.
    #[serde(default)]
    pub warn_threshold_percent: Option<u8>,
}

/// Table for checks that only carry enablement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnabledSection {
    /// Whether the check runs.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// One named profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSection {
    /// Dotted-path overrides applied when the profile is active.
    #[serde(default)]
    pub overrides: BTreeMap<String, toml::Value>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl PreflightConfig {
    /// Loads and validates a configuration document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading, parsing, or validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates a configuration document from a string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the document for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = self.tier1.quota_vcpu.warn_threshold_percent
            && threshold > 100
        {
            return Err(ConfigError::Invalid(
                "quota.vcpu.warn_threshold_percent must be at most 100".to_string(),
            ));
        }
        if self.global.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "global.timeout_seconds must be positive".to_string(),
            ));
        }
        if self.tier1.appliance_health.max_heartbeat_age_hours.is_some_and(|age| age <= 0) {
            return Err(ConfigError::Invalid(
                "appliance.health.max_heartbeat_age_hours must be positive".to_string(),
            ));
        }
        validate_roles(&self.tier1.access_rbac_migrate_project.required_roles)?;
        validate_roles(&self.tier2.server_rbac_rg.required_roles)?;
        if let Some(profile) = &self.active_profile
            && !self.profiles.contains_key(profile)
        {
            return Err(ConfigError::UnknownProfile(profile.clone()));
        }
        if self.profiles.len() > MAX_PROFILES {
            return Err(ConfigError::Invalid("too many profiles".to_string()));
        }
        for (name, profile) in &self.profiles {
            if profile.overrides.len() > MAX_PROFILE_OVERRIDES {
                return Err(ConfigError::Invalid(format!(
                    "profile '{name}' has too many overrides"
                )));
            }
        }
        Ok(())
    }
}

/// Rejects empty role lists and blank role ids.
fn validate_roles(roles: &Option<Vec<String>>) -> Result<(), ConfigError> {
    if let Some(roles) = roles {
        if roles.is_empty() {
            return Err(ConfigError::Invalid("required_roles must not be empty".to_string()));
        }
        if roles.iter().any(|role| role.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "required_roles entries must not be blank".to_string(),
            ));
        }
    }
    Ok(())
}

/// Converts configured role strings into typed identifiers.
pub(crate) fn typed_roles(roles: &[String]) -> Vec<RoleDefinitionId> {
    roles.iter().map(RoleDefinitionId::new).collect()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and resolution errors.
///
/// These are the only fatal errors of the system: a run refuses to start
/// with an inconsistent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Reading the document failed.
    #[error("config io error: {0}")]
    Io(String),
    /// The document is not valid TOML for the expected schema.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The document is structurally valid but inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// A named profile does not exist.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
    /// An override path does not name a known setting.
    #[error("unknown override path: {0}")]
    UnknownOverridePath(String),
    /// An override value has the wrong type for its path.
    #[error("override '{path}' expects {expected}")]
    InvalidOverrideType {
        /// Dotted override path.
        path: String,
        /// Expected value type.
        expected: &'static str,
    },
}
