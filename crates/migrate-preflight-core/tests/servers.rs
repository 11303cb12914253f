// crates/migrate-preflight-core/tests/servers.rs
// ============================================================================
// Module: Servers Orchestrator Tests
// Description: Tier-2 gating and per-check boundary behavior.
// ============================================================================
//! ## Overview
//! Drives `run_machine_scope` directly against scripted project verdicts
//! and provider state.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use migrate_preflight_core::CheckId;
use migrate_preflight_core::CheckOutcome;
use migrate_preflight_core::CheckRef;
use migrate_preflight_core::CloudError;
use migrate_preflight_core::DiskKind;
use migrate_preflight_core::MachineDecl;
use migrate_preflight_core::MachineReadiness;
use migrate_preflight_core::ProjectKey;
use migrate_preflight_core::ProjectReadiness;
use migrate_preflight_core::ResolvedSettings;
use migrate_preflight_core::RestrictionScope;
use migrate_preflight_core::Severity;
use migrate_preflight_core::SkipReason;
use migrate_preflight_core::SkuRestriction;
use migrate_preflight_core::Timestamp;
use migrate_preflight_core::runtime::run_machine_scope;

use common::StubCloud;
use common::TEST_NOW_MS;
use common::healthy_cloud;
use common::machine_decl;
use common::project_decl;
use common::run_context;

fn fixed_now() -> Timestamp {
    Timestamp::from_unix_millis(TEST_NOW_MS)
}

fn passing_projects() -> BTreeMap<ProjectKey, ProjectReadiness> {
    let key = project_decl().key();
    let readiness = ProjectReadiness::from_outcomes(key.clone(), Vec::new(), false);
    [(key, readiness)].into_iter().collect()
}

fn failed_projects() -> BTreeMap<ProjectKey, ProjectReadiness> {
    let key = project_decl().key();
    let outcome = CheckOutcome::failure(CheckId::StorageCache, "cache storage account not found");
    let readiness = ProjectReadiness::from_outcomes(key.clone(), vec![outcome], false);
    [(key, readiness)].into_iter().collect()
}

fn run_machine(cloud: &StubCloud, machine: &MachineDecl) -> MachineReadiness {
    run_machine_scope(
        machine,
        &passing_projects(),
        cloud,
        &ResolvedSettings::default(),
        &run_context(),
    )
}

fn severity_of(readiness: &MachineReadiness, check: CheckId) -> Severity {
    readiness
        .outcomes
        .iter()
        .find(|outcome| outcome.check == CheckRef::Check(check))
        .map(|outcome| outcome.severity)
        .expect("check outcome present")
}

// ============================================================================
// SECTION: Prerequisite Gate
// ============================================================================

/// A machine whose project failed is skipped without outcomes.
#[test]
fn test_failed_project_skips_machine() {
    let cloud = healthy_cloud(fixed_now());
    let readiness = run_machine_scope(
        &machine_decl(),
        &failed_projects(),
        &cloud,
        &ResolvedSettings::default(),
        &run_context(),
    );
    assert_eq!(readiness.skipped_reason, Some(SkipReason::PrerequisiteFailed));
    assert_eq!(readiness.rolled_up, Severity::Failure);
    assert!(readiness.outcomes.is_empty());
}

/// A machine with no project key is reported as unknown.
#[test]
fn test_missing_project_key_is_unknown_project() {
    let cloud = healthy_cloud(fixed_now());
    let machine = MachineDecl {
        project_key: None,
        ..machine_decl()
    };
    let readiness = run_machine(&cloud, &machine);
    assert_eq!(readiness.skipped_reason, Some(SkipReason::UnknownProject));
    assert_eq!(readiness.rolled_up, Severity::Failure);
}

/// A machine keyed to an undeclared project is reported as unknown.
#[test]
fn test_unknown_project_key_is_unknown_project() {
    let cloud = healthy_cloud(fixed_now());
    let machine = MachineDecl {
        project_key: Some(ProjectKey::new("S9", "rg-z", "missing")),
        ..machine_decl()
    };
    let readiness = run_machine(&cloud, &machine);
    assert_eq!(readiness.skipped_reason, Some(SkipReason::UnknownProject));
}

/// A project that only warned does not block its machines.
#[test]
fn test_project_warning_does_not_block_machines() {
    let cloud = healthy_cloud(fixed_now());
    let key = project_decl().key();
    let outcome = CheckOutcome::warning(CheckId::QuotaVcpu, "quota is close to its limit");
    let projects = [(
        key.clone(),
        ProjectReadiness::from_outcomes(key, vec![outcome], false),
    )]
    .into_iter()
    .collect();
    let readiness = run_machine_scope(
        &machine_decl(),
        &projects,
        &cloud,
        &ResolvedSettings::default(),
        &run_context(),
    );
    assert_eq!(readiness.skipped_reason, None);
    assert_eq!(readiness.outcomes.len(), 7);
}

// ============================================================================
// SECTION: Region and Resource Group
// ============================================================================

/// An unknown region fails.
#[test]
fn test_unknown_region_fails() {
    let cloud = healthy_cloud(fixed_now());
    let machine = MachineDecl {
        target_region: "australiaeast".into(),
        ..machine_decl()
    };
    let readiness = run_machine(&cloud, &machine);
    assert_eq!(severity_of(&readiness, CheckId::ServerRegion), Severity::Failure);
}

/// Region comparison is case-insensitive at the declaration boundary.
#[test]
fn test_region_comparison_is_case_insensitive() {
    let cloud = healthy_cloud(fixed_now());
    let machine = MachineDecl {
        target_region: "EastUS".into(),
        ..machine_decl()
    };
    let readiness = run_machine(&cloud, &machine);
    assert_eq!(severity_of(&readiness, CheckId::ServerRegion), Severity::Ok);
}

/// A missing resource group fails; a region mismatch only warns.
#[test]
fn test_resource_group_existence_and_region() {
    let mut cloud = healthy_cloud(fixed_now());
    cloud.resource_groups.clear();
    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerResourceGroup), Severity::Failure);

    let mut cloud = healthy_cloud(fixed_now());
    let group = cloud
        .resource_groups
        .get_mut(&("S1".to_string(), "rg-b".to_string()))
        .expect("rg fixture");
    group.region = "westus".into();
    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerResourceGroup), Severity::Warning);
}

// ============================================================================
// SECTION: Subnet Capacity
// ============================================================================

/// A subnet with zero free addresses fails.
#[test]
fn test_subnet_with_no_free_ips_fails() {
    let mut cloud = healthy_cloud(fixed_now());
    let subnet = cloud
        .subnets
        .get_mut(&("S1".to_string(), "rg-b".to_string(), "v".to_string(), "s".to_string()))
        .expect("subnet fixture");
    // /24 holds 256 addresses; 5 are reserved, so 251 in use leaves zero.
    subnet.used_ip_count = 251;

    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerVnetSubnet), Severity::Failure);
}

/// A subnet at or below five percent free warns.
#[test]
fn test_nearly_full_subnet_warns() {
    let mut cloud = healthy_cloud(fixed_now());
    let subnet = cloud
        .subnets
        .get_mut(&("S1".to_string(), "rg-b".to_string(), "v".to_string(), "s".to_string()))
        .expect("subnet fixture");
    // 12 free of 256 is below the five percent line (12.8).
    subnet.used_ip_count = 239;

    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerVnetSubnet), Severity::Warning);
}

/// A missing subnet fails with the vnet's subnets in the detail.
#[test]
fn test_missing_subnet_fails() {
    let cloud = healthy_cloud(fixed_now());
    let machine = MachineDecl {
        target_subnet: "missing".to_string(),
        ..machine_decl()
    };
    let readiness = run_machine(&cloud, &machine);
    assert_eq!(severity_of(&readiness, CheckId::ServerVnetSubnet), Severity::Failure);
}

// ============================================================================
// SECTION: SKU and Disk
// ============================================================================

/// A SKU restricted in every zone fails.
#[test]
fn test_sku_restricted_in_every_zone_fails() {
    let mut cloud = healthy_cloud(fixed_now());
    let sku = cloud
        .skus
        .get_mut(&("S1".to_string(), "eastus".to_string()))
        .and_then(|skus| skus.first_mut())
        .expect("sku fixture");
    sku.restrictions.push(SkuRestriction {
        scope: RestrictionScope::Zone,
        zones: sku.zones.clone(),
        reason: Some("NotAvailableForSubscription".to_string()),
    });

    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerSku), Severity::Failure);
}

/// A SKU restricted in a strict subset of zones warns.
#[test]
fn test_sku_restricted_in_some_zones_warns() {
    let mut cloud = healthy_cloud(fixed_now());
    let sku = cloud
        .skus
        .get_mut(&("S1".to_string(), "eastus".to_string()))
        .and_then(|skus| skus.first_mut())
        .expect("sku fixture");
    sku.restrictions.push(SkuRestriction {
        scope: RestrictionScope::Zone,
        zones: ["1".to_string()].into_iter().collect(),
        reason: Some("NotAvailableForSubscription".to_string()),
    });

    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerSku), Severity::Warning);
}

/// A deprecated SKU warns.
#[test]
fn test_deprecated_sku_warns() {
    let mut cloud = healthy_cloud(fixed_now());
    let sku = cloud
        .skus
        .get_mut(&("S1".to_string(), "eastus".to_string()))
        .and_then(|skus| skus.first_mut())
        .expect("sku fixture");
    sku.deprecated = true;

    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerSku), Severity::Warning);
}

/// An unoffered SKU fails the SKU check.
#[test]
fn test_unoffered_sku_fails() {
    let cloud = healthy_cloud(fixed_now());
    let machine = MachineDecl {
        target_sku: "std_z64".to_string(),
        ..machine_decl()
    };
    let readiness = run_machine(&cloud, &machine);
    assert_eq!(severity_of(&readiness, CheckId::ServerSku), Severity::Failure);
}

/// A premium disk on a SKU without premium storage fails.
#[test]
fn test_premium_disk_requires_premium_sku() {
    let mut cloud = healthy_cloud(fixed_now());
    let sku = cloud
        .skus
        .get_mut(&("S1".to_string(), "eastus".to_string()))
        .and_then(|skus| skus.first_mut())
        .expect("sku fixture");
    sku.premium_io = false;

    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerDiskType), Severity::Failure);
}

/// A zone-redundant disk needs the SKU to report availability zones.
#[test]
fn test_zone_redundant_disk_requires_zones() {
    let mut cloud = healthy_cloud(fixed_now());
    let sku = cloud
        .skus
        .get_mut(&("S1".to_string(), "eastus".to_string()))
        .and_then(|skus| skus.first_mut())
        .expect("sku fixture");
    sku.zones = BTreeSet::new();
    let machine = MachineDecl {
        target_disk_type: DiskKind::StandardSsdZrs,
        ..machine_decl()
    };

    let readiness = run_machine(&cloud, &machine);
    assert_eq!(severity_of(&readiness, CheckId::ServerDiskType), Severity::Failure);
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// An undiscovered machine fails.
#[test]
fn test_undiscovered_machine_fails() {
    let mut cloud = healthy_cloud(fixed_now());
    cloud.discovered.clear();
    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerDiscovery), Severity::Failure);
}

/// Multiple exact matches warn and list candidate record ids.
#[test]
fn test_duplicate_discovery_records_warn() {
    let mut cloud = healthy_cloud(fixed_now());
    let records = cloud
        .discovered
        .get_mut(&("S1".to_string(), "rg-a".to_string(), "P".to_string()))
        .expect("discovery fixture");
    let mut duplicate = records[0].clone();
    duplicate.id = "machines/web01-dup".to_string();
    records.push(duplicate);

    let readiness = run_machine(&cloud, &machine_decl());
    let outcome = readiness
        .outcomes
        .iter()
        .find(|outcome| outcome.check == CheckRef::Check(CheckId::ServerDiscovery))
        .expect("discovery outcome");
    assert_eq!(outcome.severity, Severity::Warning);
    let detail = outcome.detail.as_deref().expect("candidate detail");
    assert!(detail.contains("machines/web01"), "detail: {detail}");
    assert!(detail.contains("machines/web01-dup"), "detail: {detail}");
}

/// Discovery matches on the source name when it differs from the target.
#[test]
fn test_discovery_uses_source_name() {
    let mut cloud = healthy_cloud(fixed_now());
    let records = cloud
        .discovered
        .get_mut(&("S1".to_string(), "rg-a".to_string(), "P".to_string()))
        .expect("discovery fixture");
    records[0].name = "d-web01".to_string();
    records[0].display_name = Some("d-web01".to_string());
    records[0].fqdn = None;
    let machine = MachineDecl {
        source_name: Some("D-WEB01".to_string()),
        target_name: "p-web01".to_string(),
        ..machine_decl()
    };

    let readiness = run_machine(&cloud, &machine);
    assert_eq!(severity_of(&readiness, CheckId::ServerDiscovery), Severity::Ok);
}

// ============================================================================
// SECTION: Target RBAC
// ============================================================================

/// A principal without a required role on the target group fails.
#[test]
fn test_missing_target_rbac_fails() {
    let mut cloud = healthy_cloud(fixed_now());
    cloud.role_assignments.remove(&common::target_rg_scope_path());
    let readiness = run_machine(&cloud, &machine_decl());
    assert_eq!(severity_of(&readiness, CheckId::ServerRbacRg), Severity::Failure);
}

/// A forbidden assignment listing fails with the dedicated summary.
#[test]
fn test_forbidden_rbac_listing_fails_with_summary() {
    let mut cloud = healthy_cloud(fixed_now());
    cloud.errors.insert(
        "list_role_assignments".to_string(),
        CloudError::Forbidden {
            scope: "rg-b".to_string(),
            request_id: None,
        },
    );
    let readiness = run_machine(&cloud, &machine_decl());
    let outcome = readiness
        .outcomes
        .iter()
        .find(|outcome| outcome.check == CheckRef::Check(CheckId::ServerRbacRg))
        .expect("rbac outcome");
    assert_eq!(outcome.severity, Severity::Failure);
    assert_eq!(outcome.summary, "insufficient permission to verify permissions");
}
