// crates/migrate-preflight-config/src/resolve.rs
// ============================================================================
// Module: Configuration Resolution
// Description: Profile and override layering into the frozen snapshot.
// Purpose: Produce the immutable settings the engine fingerprints and runs.
// Dependencies: migrate-preflight-core, toml
// ============================================================================

//! ## Overview
//! Resolution order, highest wins: explicit per-run overrides, the active
//! profile's overrides, the document values, built-in defaults. Unknown
//! paths and type mismatches fail closed; a run never starts on a
//! misunderstood configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use migrate_preflight_core::CheckId;
use migrate_preflight_core::ResolvedSettings;
use migrate_preflight_core::RoleDefinitionId;

use crate::config::ConfigError;
use crate::config::PreflightConfig;
use crate::config::typed_roles;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the document with its active profile and no explicit overrides.
///
/// # Errors
///
/// Returns [`ConfigError`] when the profile or an override is invalid.
pub fn resolve(
    config: &PreflightConfig,
    profile: Option<&str>,
) -> Result<ResolvedSettings, ConfigError> {
    resolve_with_overrides(config, profile, &BTreeMap::new())
}

/// Resolves the document, layering explicit overrides on top of the
/// selected (or document-active) profile.
///
/// # Errors
///
/// Returns [`ConfigError`] when the profile or an override is invalid.
pub fn resolve_with_overrides(
    config: &PreflightConfig,
    profile: Option<&str>,
    overrides: &BTreeMap<String, toml::Value>,
) -> Result<ResolvedSettings, ConfigError> {
    let mut settings = document_settings(config);

    let active = profile.or(config.active_profile.as_deref());
    if let Some(name) = active {
        let profile = config
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
        for (path, value) in &profile.overrides {
            apply_override(&mut settings, path, value)?;
        }
    }

    for (path, value) in overrides {
        apply_override(&mut settings, path, value)?;
    }

    Ok(settings)
}

/// Builds the base snapshot from document values over built-in defaults.
fn document_settings(config: &PreflightConfig) -> ResolvedSettings {
    let mut settings = ResolvedSettings::default();

    let global = &config.global;
    if let Some(fail_fast) = global.fail_fast {
        settings.global.fail_fast = fail_fast;
    }
    if let Some(parallel) = global.parallel_execution {
        settings.global.parallel_execution = parallel;
    }
    if let Some(timeout) = global.timeout_seconds {
        settings.global.timeout_seconds = timeout;
    }

    let tier1 = &config.tier1;
    if let Some(enabled) = tier1.access_rbac_migrate_project.enabled {
        settings.access_rbac_migrate_project.enabled = enabled;
    }
    if let Some(roles) = &tier1.access_rbac_migrate_project.required_roles {
        settings.access_rbac_migrate_project.required_roles = typed_roles(roles);
    }
    if let Some(enabled) = tier1.appliance_health.enabled {
        settings.appliance_health.enabled = enabled;
    }
    if let Some(age) = tier1.appliance_health.max_heartbeat_age_hours {
        settings.appliance_health.max_heartbeat_age_hours = age;
    }
    if let Some(enabled) = tier1.storage_cache.enabled {
        settings.storage_cache.enabled = enabled;
    }
    if let Some(auto_create) = tier1.storage_cache.auto_create {
        settings.storage_cache.auto_create = auto_create;
    }
    if let Some(enabled) = tier1.quota_vcpu.enabled {
        settings.quota_vcpu.enabled = enabled;
    }
    if let Some(threshold) = tier1.quota_vcpu.warn_threshold_percent {
        settings.quota_vcpu.warn_threshold_percent = threshold;
    }

    let tier2 = &config.tier2;
    if let Some(enabled) = tier2.server_region.enabled {
        settings.server_region.enabled = enabled;
    }
    if let Some(enabled) = tier2.server_resource_group.enabled {
        settings.server_resource_group.enabled = enabled;
    }
    if let Some(enabled) = tier2.server_vnet_subnet.enabled {
        settings.server_vnet_subnet.enabled = enabled;
    }
    if let Some(enabled) = tier2.server_sku.enabled {
        settings.server_sku.enabled = enabled;
    }
    if let Some(enabled) = tier2.server_disk_type.enabled {
        settings.server_disk_type.enabled = enabled;
    }
    if let Some(enabled) = tier2.server_discovery.enabled {
        settings.server_discovery.enabled = enabled;
    }
    if let Some(enabled) = tier2.server_rbac_rg.enabled {
        settings.server_rbac_rg.enabled = enabled;
    }
    if let Some(roles) = &tier2.server_rbac_rg.required_roles {
        settings.server_rbac_rg.required_roles = typed_roles(roles);
    }

    settings
}

// ============================================================================
// SECTION: Override Application
// ============================================================================

/// Applies one dotted-path override to the snapshot.
///
/// Paths accept an optional `tier1.` / `tier2.` prefix before the check id,
/// so `server.rbac.rg.enabled` and `tier2.server.rbac.rg.enabled` are
/// equivalent.
fn apply_override(
    settings: &mut ResolvedSettings,
    path: &str,
    value: &toml::Value,
) -> Result<(), ConfigError> {
    if let Some(rest) = path.strip_prefix("global.") {
        return apply_global(settings, path, rest, value);
    }
    let rest = path.strip_prefix("tier1.").or_else(|| path.strip_prefix("tier2.")).unwrap_or(path);

    let Some((check, param)) = split_check_param(rest) else {
        return Err(ConfigError::UnknownOverridePath(path.to_string()));
    };
    match param {
        "enabled" => {
            settings.set_enabled(check, expect_bool(path, value)?);
            Ok(())
        }
        "required_roles" if check == CheckId::AccessRbacMigrateProject => {
            settings.access_rbac_migrate_project.required_roles = expect_roles(path, value)?;
            Ok(())
        }
        "required_roles" if check == CheckId::ServerRbacRg => {
            settings.server_rbac_rg.required_roles = expect_roles(path, value)?;
            Ok(())
        }
        "max_heartbeat_age_hours" if check == CheckId::ApplianceHealth => {
            settings.appliance_health.max_heartbeat_age_hours =
                expect_positive_int(path, value)?;
            Ok(())
        }
        "auto_create" if check == CheckId::StorageCache => {
            settings.storage_cache.auto_create = expect_bool(path, value)?;
            Ok(())
        }
        "warn_threshold_percent" if check == CheckId::QuotaVcpu => {
            settings.quota_vcpu.warn_threshold_percent = expect_percent(path, value)?;
            Ok(())
        }
        _ => Err(ConfigError::UnknownOverridePath(path.to_string())),
    }
}

/// Applies one `global.*` override.
fn apply_global(
    settings: &mut ResolvedSettings,
    path: &str,
    key: &str,
    value: &toml::Value,
) -> Result<(), ConfigError> {
    match key {
        "fail_fast" => {
            settings.global.fail_fast = expect_bool(path, value)?;
            Ok(())
        }
        "parallel_execution" => {
            settings.global.parallel_execution = expect_bool(path, value)?;
            Ok(())
        }
        "timeout_seconds" => {
            let timeout = expect_positive_int(path, value)?;
            settings.global.timeout_seconds = timeout.unsigned_abs();
            Ok(())
        }
        _ => Err(ConfigError::UnknownOverridePath(path.to_string())),
    }
}

/// Splits `<check id>.<param>` where the check id itself contains dots.
fn split_check_param(path: &str) -> Option<(CheckId, &str)> {
    let (prefix, param) = path.rsplit_once('.')?;
    CheckId::parse(prefix).map(|check| (check, param))
}

/// Requires a boolean override value.
fn expect_bool(path: &str, value: &toml::Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or(ConfigError::InvalidOverrideType {
        path: path.to_string(),
        expected: "a boolean",
    })
}

/// Requires a positive integer override value.
fn expect_positive_int(path: &str, value: &toml::Value) -> Result<i64, ConfigError> {
    match value.as_integer() {
        Some(int) if int > 0 => Ok(int),
        _ => Err(ConfigError::InvalidOverrideType {
            path: path.to_string(),
            expected: "a positive integer",
        }),
    }
}

/// Requires an integer percentage in `0..=100`.
fn expect_percent(path: &str, value: &toml::Value) -> Result<u8, ConfigError> {
    match value.as_integer() {
        Some(int) if (0..=100).contains(&int) => {
            u8::try_from(int).map_err(|_| ConfigError::InvalidOverrideType {
                path: path.to_string(),
                expected: "an integer percentage between 0 and 100",
            })
        }
        _ => Err(ConfigError::InvalidOverrideType {
            path: path.to_string(),
            expected: "an integer percentage between 0 and 100",
        }),
    }
}

/// Requires a non-empty array of non-blank role id strings.
fn expect_roles(path: &str, value: &toml::Value) -> Result<Vec<RoleDefinitionId>, ConfigError> {
    let mismatch = || ConfigError::InvalidOverrideType {
        path: path.to_string(),
        expected: "a non-empty array of role id strings",
    };
    let array = value.as_array().ok_or_else(mismatch)?;
    if array.is_empty() {
        return Err(mismatch());
    }
    array
        .iter()
        .map(|entry| match entry.as_str() {
            Some(role) if !role.trim().is_empty() => Ok(RoleDefinitionId::new(role)),
            _ => Err(mismatch()),
        })
        .collect()
}
