// crates/migrate-preflight-core/src/runtime/checks/landing_zone.rs
// ============================================================================
// Module: Landing Zone Checks
// Description: Per-project readiness checks (tier 1).
// Purpose: Validate access, appliance, cache storage, and quota per project.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Landing-zone checks establish the per-project preconditions every machine
//! of that project depends on. The access check runs first and is the
//! canonical fail-fast trigger: an unreachable subscription invalidates the
//! whole scope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::check::CheckId;
use crate::core::check::CheckOutcome;
use crate::core::check::CheckRef;
use crate::core::check::Severity;
use crate::core::decl::MachineDecl;
use crate::core::decl::ProjectDecl;
use crate::core::identifiers::RoleDefinitionId;
use crate::core::settings::ResolvedSettings;
use crate::interfaces::CloudApi;
use crate::interfaces::CreateStorageRequest;
use crate::runtime::RunContext;

// ============================================================================
// SECTION: Project Scope
// ============================================================================

/// Inputs shared by every landing-zone check of one project.
#[derive(Debug, Clone, Copy)]
pub struct ProjectScope<'a> {
    /// The deduplicated project declaration.
    pub decl: &'a ProjectDecl,
    /// Machines declared against this project.
    pub machines: &'a [MachineDecl],
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Runs a single tier-1 check.
///
/// Tier-2 identifiers are rejected by construction: the orchestrator only
/// dispatches ids from the tier-1 canonical order.
#[must_use]
pub fn run_tier1_check(
    check: CheckId,
    scope: &ProjectScope<'_>,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> CheckOutcome {
    match check {
        CheckId::AccessRbacMigrateProject => check_access_rbac(scope, cloud, settings, run),
        CheckId::ApplianceHealth => check_appliance_health(scope, cloud, settings, run),
        CheckId::StorageCache => check_storage_cache(scope, cloud, settings, run),
        CheckId::QuotaVcpu => check_quota_vcpu(scope, cloud, settings, run),
        other => CheckOutcome::failure(other, "check is not a landing-zone check"),
    }
}

// ============================================================================
// SECTION: Access / RBAC
// ============================================================================

/// Verifies the subscription resolves and the principal holds a required
/// role on the migrate project.
fn check_access_rbac(
    scope: &ProjectScope<'_>,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::AccessRbacMigrateProject;
    let ctx = run.call();
    let decl = scope.decl;

    match cloud.get_subscription(&ctx, &decl.subscription_id) {
        Ok(_) => {}
        Err(err) if err.is_not_found() || err.is_forbidden() => {
            return CheckOutcome::critical(CHECK, "subscription not accessible")
                .with_detail(format!(
                    "subscription {} could not be resolved under the supplied identity",
                    decl.subscription_id
                ))
                .with_cause(err.cause_trace());
        }
        Err(err) => {
            return CheckOutcome::failure(CHECK, "could not verify subscription access")
                .with_cause(err.cause_trace());
        }
    }

    let project_scope = migrate_project_scope(decl);
    match cloud.list_role_assignments(&ctx, &project_scope, &run.principal) {
        Ok(roles) => {
            let required = &settings.access_rbac_migrate_project.required_roles;
            if required.iter().any(|role| roles.contains(role)) {
                CheckOutcome::ok(
                    CHECK,
                    format!("principal holds a required role on project '{}'", decl.project_name),
                )
            } else {
                CheckOutcome::failure(
                    CHECK,
                    format!(
                        "principal lacks a required role on project '{}'",
                        decl.project_name
                    ),
                )
                .with_detail(format!(
                    "required any of [{}]; principal holds {} assignment(s) at this scope",
                    join_roles(required),
                    roles.len()
                ))
            }
        }
        Err(err) if err.is_forbidden() => {
            CheckOutcome::critical(CHECK, "not authorized to read migrate project permissions")
                .with_cause(err.cause_trace())
        }
        Err(err) if err.is_not_found() => {
            CheckOutcome::failure(
                CHECK,
                format!("migrate project '{}' not found", decl.project_name),
            )
            .with_cause(err.cause_trace())
        }
        Err(err) => CheckOutcome::failure(CHECK, "could not list migrate project permissions")
            .with_cause(err.cause_trace()),
    }
}

/// Builds the provider scope path of the migrate project.
fn migrate_project_scope(decl: &ProjectDecl) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Migrate/migrateProjects/{}",
        decl.subscription_id, decl.resource_group, decl.project_name
    )
}

/// Renders a role set for outcome details.
fn join_roles(roles: &[RoleDefinitionId]) -> String {
    roles.iter().map(|role| role.as_str()).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Appliance Health
// ============================================================================

/// Verifies the declared appliance exists, matches its declared kind, and
/// has heartbeated within the configured window.
fn check_appliance_health(
    scope: &ProjectScope<'_>,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ApplianceHealth;
    let ctx = run.call();
    let decl = scope.decl;

    let appliances = match cloud.list_appliances(
        &ctx,
        &decl.subscription_id,
        &decl.resource_group,
        &decl.project_name,
    ) {
        Ok(appliances) => appliances,
        Err(err) => {
            return CheckOutcome::failure(CHECK, "could not list project appliances")
                .with_cause(err.cause_trace());
        }
    };

    let Some(appliance) =
        appliances.iter().find(|a| a.name.eq_ignore_ascii_case(&decl.appliance_name))
    else {
        let known = appliances.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ");
        return CheckOutcome::failure(
            CHECK,
            format!("appliance '{}' not found in project", decl.appliance_name),
        )
        .with_detail(if known.is_empty() {
            "project has no registered appliances".to_string()
        } else {
            format!("registered appliances: {known}")
        });
    };

    if let Some(kind) = appliance.kind
        && kind != decl.appliance_kind
    {
        return CheckOutcome::failure(
            CHECK,
            format!(
                "appliance kind mismatch: declared {}, discovered {}",
                decl.appliance_kind, kind
            ),
        );
    }

    let max_age = settings.appliance_health.max_heartbeat_age_hours;
    match appliance.last_heartbeat {
        None => CheckOutcome::warning(
            CHECK,
            format!("appliance '{}' has not reported a heartbeat", appliance.name),
        ),
        Some(heartbeat) => {
            let age_hours = run.now.hours_since(heartbeat);
            if age_hours >= max_age {
                CheckOutcome::warning(
                    CHECK,
                    format!(
                        "appliance '{}' last heartbeat is {age_hours}h old (limit {max_age}h)",
                        appliance.name
                    ),
                )
            } else {
                CheckOutcome::ok(
                    CHECK,
                    format!("appliance '{}' is registered and heartbeating", appliance.name),
                )
                .with_detail(format!(
                    "health: {}, heartbeat age: {age_hours}h",
                    appliance.health.as_str()
                ))
            }
        }
    }
}

// ============================================================================
// SECTION: Cache Storage
// ============================================================================

/// Verifies the cache storage account exists, creating it when auto-create
/// is enabled. This is the engine's only mutation path.
fn check_storage_cache(
    scope: &ProjectScope<'_>,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::StorageCache;
    let ctx = run.call();
    let decl = scope.decl;

    match cloud.get_storage_account(
        &ctx,
        &decl.subscription_id,
        &decl.cache_storage_resource_group,
        &decl.cache_storage_account,
    ) {
        Ok(account) => {
            if account.region == decl.region {
                CheckOutcome::ok(
                    CHECK,
                    format!("cache storage account '{}' is available", account.name),
                )
            } else {
                CheckOutcome::warning(
                    CHECK,
                    format!(
                        "cache storage account '{}' is in {} but the project is in {}",
                        account.name, account.region, decl.region
                    ),
                )
            }
        }
        Err(err) if err.is_not_found() => {
            if !settings.storage_cache.auto_create {
                return CheckOutcome::failure(
                    CHECK,
                    format!("cache storage account '{}' not found", decl.cache_storage_account),
                )
                .with_cause(err.cause_trace());
            }
            let request = CreateStorageRequest {
                subscription_id: decl.subscription_id.clone(),
                resource_group: decl.cache_storage_resource_group.clone(),
                name: decl.cache_storage_account.clone(),
                region: decl.region.clone(),
                sku: "Standard_LRS".to_string(),
            };
            tracing::debug!(account = %request.name, "creating missing cache storage account");
            match cloud.create_storage_account(&ctx, &request) {
                Ok(account) => CheckOutcome::ok(
                    CHECK,
                    format!("cache storage account '{}' created", account.name),
                ),
                Err(create_err) => CheckOutcome::failure(
                    CHECK,
                    format!(
                        "cache storage account '{}' creation failed",
                        decl.cache_storage_account
                    ),
                )
                .with_cause(create_err.cause_trace()),
            }
        }
        Err(err) => CheckOutcome::failure(CHECK, "could not resolve cache storage account")
            .with_cause(err.cause_trace()),
    }
}

// ============================================================================
// SECTION: vCPU Quota
// ============================================================================

/// Verifies declared machines fit in the remaining vCPU quota of the
/// project's region, per quota family.
fn check_quota_vcpu(
    scope: &ProjectScope<'_>,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::QuotaVcpu;
    let ctx = run.call();
    let decl = scope.decl;

    let in_region: Vec<&MachineDecl> =
        scope.machines.iter().filter(|m| m.target_region == decl.region).collect();
    if in_region.is_empty() {
        return CheckOutcome::ok(
            CHECK,
            format!("no declared machines consume quota in {}", decl.region),
        );
    }

    let skus = match cloud.list_vm_skus(&ctx, &decl.subscription_id, &decl.region) {
        Ok(skus) => skus,
        Err(err) => {
            return CheckOutcome::failure(CHECK, "could not list machine SKUs for quota sizing")
                .with_cause(err.cause_trace());
        }
    };

    // Demand per quota family, summed over declared machines.
    let mut demand: BTreeMap<String, u32> = BTreeMap::new();
    let mut unsized_skus: Vec<&str> = Vec::new();
    for machine in &in_region {
        let sized = skus
            .iter()
            .find(|sku| sku.name.eq_ignore_ascii_case(&machine.target_sku))
            .and_then(|sku| Some((sku.family.clone()?, sku.vcpus?)));
        match sized {
            Some((family, vcpus)) => {
                *demand.entry(family).or_insert(0) += vcpus;
            }
            None => unsized_skus.push(machine.target_sku.as_str()),
        }
    }

    let mut severity = Severity::Ok;
    let mut parts: Vec<String> = Vec::new();
    let threshold = u64::from(settings.quota_vcpu.warn_threshold_percent);
    for (family, required) in &demand {
        let usage = match cloud.get_vcpu_usage(&ctx, &decl.subscription_id, &decl.region, family) {
            Ok(usage) => usage,
            Err(err) => {
                return CheckOutcome::failure(
                    CHECK,
                    format!("could not read vCPU usage for family '{family}'"),
                )
                .with_cause(err.cause_trace());
            }
        };
        let limit = u64::from(usage.limit);
        let projected = u64::from(usage.current) + u64::from(*required);
        // New demand that lands at or above the full limit is not
        // provisionable; a family already at its limit with no new demand
        // stays ok.
        if *required > 0 && projected >= limit {
            severity = severity.max(Severity::Failure);
            parts.push(format!(
                "{family}: projected {projected}/{limit} vCPUs ({}/{limit} used, {required} \
                 declared)",
                usage.current
            ));
            continue;
        }
        if limit > 0 && projected * 100 / limit >= threshold {
            severity = severity.max(Severity::Warning);
            let percent = projected * 100 / limit;
            parts.push(format!("{family}: projected {projected}/{limit} vCPUs ({percent}%)"));
        } else {
            parts.push(format!("{family}: projected {projected}/{limit} vCPUs"));
        }
    }

    if !unsized_skus.is_empty() {
        severity = severity.max(Severity::Warning);
        unsized_skus.sort_unstable();
        unsized_skus.dedup();
        parts.push(format!("unsized SKUs excluded from demand: {}", unsized_skus.join(", ")));
    }

    let summary = match severity {
        Severity::Ok => format!("sufficient vCPU quota in {}", decl.region),
        Severity::Warning => format!("vCPU quota in {} is close to its limit", decl.region),
        _ => format!("insufficient vCPU quota in {}", decl.region),
    };
    CheckOutcome::new(CheckRef::Check(CHECK), severity, summary).with_detail(parts.join("; "))
}
