// crates/migrate-preflight-core/src/core/settings.rs
// ============================================================================
// Module: Migrate Preflight Resolved Settings
// Description: Immutable snapshot of the resolved validation configuration.
// Purpose: Tell the runtime which checks run and with which parameters.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Settings are resolved once, before a run starts, by layering explicit
//! overrides over a profile over built-in defaults. The frozen snapshot is
//! cheap to clone, free of side effects, and fingerprinted so two runs with
//! the same fingerprint and inputs produce the same verdicts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::check::CheckId;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::RoleDefinitionId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Built-in Contributor role definition identifier.
pub const CONTRIBUTOR_ROLE_ID: &str = "b24988ac-6180-42a0-ab88-20f7382dd24c";
/// Built-in Owner role definition identifier.
pub const OWNER_ROLE_ID: &str = "8e3af657-a8ff-443c-a75c-2fe8c4bcb635";
/// Default maximum appliance heartbeat age in hours (boundary inclusive).
pub const DEFAULT_MAX_HEARTBEAT_AGE_HOURS: i64 = 24;
/// Default quota usage percentage at which a warning is raised.
pub const DEFAULT_QUOTA_WARN_THRESHOLD_PERCENT: u8 = 80;
/// Default per-scope timeout budget in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

// ============================================================================
// SECTION: Per-Check Settings
// ============================================================================

/// Enablement plus required roles for an RBAC check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRbacSettings {
    /// Whether the check runs.
    pub enabled: bool,
    /// Role definition ids that satisfy the check (any one suffices).
    pub required_roles: Vec<RoleDefinitionId>,
}

impl Default for AccessRbacSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            required_roles: default_required_roles(),
        }
    }
}

/// Appliance health check settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceHealthSettings {
    /// Whether the check runs.
    pub enabled: bool,
    /// Heartbeats at or beyond this age raise a warning.
    pub max_heartbeat_age_hours: i64,
}

impl Default for ApplianceHealthSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_heartbeat_age_hours: DEFAULT_MAX_HEARTBEAT_AGE_HOURS,
        }
    }
}

/// Cache storage check settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCacheSettings {
    /// Whether the check runs.
    pub enabled: bool,
    /// Create the storage account when missing instead of failing.
    pub auto_create: bool,
}

impl Default for StorageCacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_create: false,
        }
    }
}

/// vCPU quota check settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaVcpuSettings {
    /// Whether the check runs.
    pub enabled: bool,
    /// Projected usage at or beyond this percentage raises a warning.
    pub warn_threshold_percent: u8,
}

impl Default for QuotaVcpuSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            warn_threshold_percent: DEFAULT_QUOTA_WARN_THRESHOLD_PERCENT,
        }
    }
}

/// Target resource group RBAC check settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRbacSettings {
    /// Whether the check runs.
    pub enabled: bool,
    /// Role definition ids that satisfy the check (any one suffices).
    pub required_roles: Vec<RoleDefinitionId>,
}

impl Default for ServerRbacSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            required_roles: default_required_roles(),
        }
    }
}

/// Bare enablement for checks without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledSetting {
    /// Whether the check runs.
    pub enabled: bool,
}

impl Default for EnabledSetting {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

// ============================================================================
// SECTION: Global Settings
// ============================================================================

/// Run-wide orchestration flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Short-circuit a scope after a critical outcome.
    pub fail_fast: bool,
    /// Execute independent scopes on a worker pool.
    pub parallel_execution: bool,
    /// Timeout budget per scope, in seconds.
    pub timeout_seconds: u64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            fail_fast: true,
            parallel_execution: true,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

// ============================================================================
// SECTION: Resolved Snapshot
// ============================================================================

/// Frozen validation configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSettings {
    /// Run-wide flags.
    pub global: GlobalSettings,
    /// `access.rbac.migrate_project` settings.
    pub access_rbac_migrate_project: AccessRbacSettings,
    /// `appliance.health` settings.
    pub appliance_health: ApplianceHealthSettings,
    /// `storage.cache` settings.
    pub storage_cache: StorageCacheSettings,
    /// `quota.vcpu` settings.
    pub quota_vcpu: QuotaVcpuSettings,
    /// `server.region` settings.
    pub server_region: EnabledSetting,
    /// `server.resource_group` settings.
    pub server_resource_group: EnabledSetting,
    /// `server.vnet_subnet` settings.
    pub server_vnet_subnet: EnabledSetting,
    /// `server.sku` settings.
    pub server_sku: EnabledSetting,
    /// `server.disk_type` settings.
    pub server_disk_type: EnabledSetting,
    /// `server.discovery` settings.
    pub server_discovery: EnabledSetting,
    /// `server.rbac.rg` settings.
    pub server_rbac_rg: ServerRbacSettings,
}

impl ResolvedSettings {
    /// Returns whether a check is enabled.
    #[must_use]
    pub fn is_enabled(&self, check: CheckId) -> bool {
        match check {
            CheckId::AccessRbacMigrateProject => self.access_rbac_migrate_project.enabled,
            CheckId::ApplianceHealth => self.appliance_health.enabled,
            CheckId::StorageCache => self.storage_cache.enabled,
            CheckId::QuotaVcpu => self.quota_vcpu.enabled,
            CheckId::ServerRegion => self.server_region.enabled,
            CheckId::ServerResourceGroup => self.server_resource_group.enabled,
            CheckId::ServerVnetSubnet => self.server_vnet_subnet.enabled,
            CheckId::ServerSku => self.server_sku.enabled,
            CheckId::ServerDiskType => self.server_disk_type.enabled,
            CheckId::ServerDiscovery => self.server_discovery.enabled,
            CheckId::ServerRbacRg => self.server_rbac_rg.enabled,
        }
    }

    /// Sets the enablement of a check.
    pub fn set_enabled(&mut self, check: CheckId, enabled: bool) {
        match check {
            CheckId::AccessRbacMigrateProject => {
                self.access_rbac_migrate_project.enabled = enabled;
            }
            CheckId::ApplianceHealth => self.appliance_health.enabled = enabled,
            CheckId::StorageCache => self.storage_cache.enabled = enabled,
            CheckId::QuotaVcpu => self.quota_vcpu.enabled = enabled,
            CheckId::ServerRegion => self.server_region.enabled = enabled,
            CheckId::ServerResourceGroup => self.server_resource_group.enabled = enabled,
            CheckId::ServerVnetSubnet => self.server_vnet_subnet.enabled = enabled,
            CheckId::ServerSku => self.server_sku.enabled = enabled,
            CheckId::ServerDiskType => self.server_disk_type.enabled = enabled,
            CheckId::ServerDiscovery => self.server_discovery.enabled = enabled,
            CheckId::ServerRbacRg => self.server_rbac_rg.enabled = enabled,
        }
    }

    /// Computes the stable fingerprint of this snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn fingerprint(&self) -> Result<String, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self).map(|digest| digest.value)
    }
}

/// Default role set satisfying RBAC checks: Contributor only. Broader sets
/// (for example adding [`OWNER_ROLE_ID`]) are opt-in via configuration.
fn default_required_roles() -> Vec<RoleDefinitionId> {
    vec![RoleDefinitionId::new(CONTRIBUTOR_ROLE_ID)]
}
