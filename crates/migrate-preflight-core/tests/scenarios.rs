// crates/migrate-preflight-core/tests/scenarios.rs
// ============================================================================
// Module: End-to-End Scenario Tests
// Description: Literal happy-path and failure scenarios through the engine.
// ============================================================================
//! ## Overview
//! Exercises the engine driver over a scripted cloud: one healthy project
//! and machine, then the canonical failure shapes (missing subscription,
//! delegated subnet, quota warning, active replication).

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

use migrate_preflight_core::CheckId;
use migrate_preflight_core::CheckRef;
use migrate_preflight_core::CloudError;
use migrate_preflight_core::EngineOptions;
use migrate_preflight_core::PreflightEngine;
use migrate_preflight_core::PrincipalId;
use migrate_preflight_core::ResolvedSettings;
use migrate_preflight_core::Run;
use migrate_preflight_core::Severity;
use migrate_preflight_core::SkipReason;
use migrate_preflight_core::Timestamp;

use common::StubCloud;
use common::healthy_cloud;
use common::machine_decl;
use common::project_decl;

fn run_engine(cloud: StubCloud) -> Run {
    let engine = PreflightEngine::new(
        cloud,
        ResolvedSettings::default(),
        EngineOptions::new(PrincipalId::new("user-1")),
    );
    engine.run(&[project_decl()], &[machine_decl()]).expect("engine run")
}

fn outcome_severity(run: &Run, check: CheckId) -> Severity {
    let machine = &run.machines[0];
    machine
        .outcomes
        .iter()
        .find(|outcome| outcome.check == CheckRef::Check(check))
        .map(|outcome| outcome.severity)
        .expect("check outcome present")
}

// ============================================================================
// SECTION: Happy Path
// ============================================================================

/// One healthy project and machine: everything rolls up `ok`.
#[test]
fn test_happy_path_single_project_single_machine() {
    let run = run_engine(healthy_cloud(Timestamp::now()));

    let project = run.projects.get(&project_decl().key()).expect("project present");
    assert_eq!(project.rolled_up, Severity::Ok);
    assert!(!project.short_circuited);
    assert_eq!(project.outcomes.len(), 4);

    assert_eq!(run.machines.len(), 1);
    let machine = &run.machines[0];
    assert_eq!(machine.rolled_up, Severity::Ok);
    assert_eq!(machine.skipped_reason, None);
    assert_eq!(machine.outcomes.len(), 7);
}

// ============================================================================
// SECTION: Fail-Fast
// ============================================================================

/// A missing subscription is critical, short-circuits tier 1, and blocks
/// the machine with `prerequisite_failed`.
#[test]
fn test_missing_subscription_short_circuits_and_blocks_machines() {
    let mut cloud = healthy_cloud(Timestamp::now());
    cloud.errors.insert(
        "get_subscription".to_string(),
        CloudError::NotFound {
            resource: "S1".to_string(),
            request_id: None,
        },
    );

    let run = run_engine(cloud);
    let project = run.projects.get(&project_decl().key()).expect("project present");
    assert!(project.short_circuited);
    assert_eq!(project.rolled_up, Severity::Critical);

    let first = &project.outcomes[0];
    assert_eq!(first.check, CheckRef::Check(CheckId::AccessRbacMigrateProject));
    assert_eq!(first.severity, Severity::Critical);
    assert_eq!(first.summary, "subscription not accessible");
    for skipped in &project.outcomes[1..] {
        assert_eq!(skipped.check, CheckRef::Skipped);
        assert_eq!(skipped.severity, Severity::Ok);
    }

    let machine = &run.machines[0];
    assert_eq!(machine.skipped_reason, Some(SkipReason::PrerequisiteFailed));
    assert_eq!(machine.rolled_up, Severity::Failure);
    assert!(machine.outcomes.is_empty());
}

// ============================================================================
// SECTION: Subnet Delegation
// ============================================================================

/// A delegated subnet fails the network check without stopping the rest of
/// the machine's checks.
#[test]
fn test_delegated_subnet_fails_without_fail_fast() {
    let mut cloud = healthy_cloud(Timestamp::now());
    let subnet = cloud
        .subnets
        .get_mut(&("S1".to_string(), "rg-b".to_string(), "v".to_string(), "s".to_string()))
        .expect("subnet fixture");
    subnet.delegations.push("Microsoft.Web/serverFarms".to_string());

    let run = run_engine(cloud);
    assert_eq!(outcome_severity(&run, CheckId::ServerVnetSubnet), Severity::Failure);
    let machine = &run.machines[0];
    assert_eq!(machine.rolled_up, Severity::Failure);
    // Non-critical failures do not short-circuit: all seven checks ran.
    assert_eq!(machine.outcomes.len(), 7);
    assert_eq!(outcome_severity(&run, CheckId::ServerRbacRg), Severity::Ok);
}

// ============================================================================
// SECTION: Quota Warning Boundary
// ============================================================================

/// Projected quota exactly at the warn threshold raises a warning, and
/// tier 2 still runs.
#[test]
fn test_quota_at_warn_threshold_warns_but_allows_machines() {
    let mut cloud = healthy_cloud(Timestamp::now());
    // One 80-vCPU machine over 100/200 used projects to 90%, past the
    // default 80% threshold.
    let sku = cloud
        .skus
        .get_mut(&("S1".to_string(), "eastus".to_string()))
        .and_then(|skus| skus.first_mut())
        .expect("sku fixture");
    sku.vcpus = Some(80);

    let run = run_engine(cloud);
    let project = run.projects.get(&project_decl().key()).expect("project present");
    let quota = project
        .outcomes
        .iter()
        .find(|outcome| outcome.check == CheckRef::Check(CheckId::QuotaVcpu))
        .expect("quota outcome");
    assert_eq!(quota.severity, Severity::Warning);
    assert_eq!(project.rolled_up, Severity::Warning);

    let machine = &run.machines[0];
    assert_eq!(machine.skipped_reason, None);
    assert_eq!(machine.outcomes.len(), 7);
}

// ============================================================================
// SECTION: Active Replication
// ============================================================================

/// A discovery record that already replicates warns with the state in the
/// summary.
#[test]
fn test_replicating_machine_warns_with_state() {
    let mut cloud = healthy_cloud(Timestamp::now());
    let record = cloud
        .discovered
        .get_mut(&("S1".to_string(), "rg-a".to_string(), "P".to_string()))
        .and_then(|records| records.first_mut())
        .expect("discovery fixture");
    record.replication_state = Some("replicating".to_string());

    let run = run_engine(cloud);
    let machine = &run.machines[0];
    let discovery = machine
        .outcomes
        .iter()
        .find(|outcome| outcome.check == CheckRef::Check(CheckId::ServerDiscovery))
        .expect("discovery outcome");
    assert_eq!(discovery.severity, Severity::Warning);
    assert!(discovery.summary.contains("replicating"), "summary: {}", discovery.summary);
    assert_eq!(machine.rolled_up, Severity::Warning);
}
