// crates/migrate-preflight-core/tests/engine.rs
// ============================================================================
// Module: Engine Driver Tests
// Description: Deduplication, determinism, edges, and cancellation.
// ============================================================================
//! ## Overview
//! Exercises the driver's own responsibilities: project deduplication with
//! conflict warnings, run invariants, empty-input edges, and the
//! cancellation synthetics.

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

use migrate_preflight_core::CancelToken;
use migrate_preflight_core::CheckRef;
use migrate_preflight_core::EngineOptions;
use migrate_preflight_core::MachineDecl;
use migrate_preflight_core::PreflightEngine;
use migrate_preflight_core::PrincipalId;
use migrate_preflight_core::ProjectDecl;
use migrate_preflight_core::ResolvedSettings;
use migrate_preflight_core::Run;
use migrate_preflight_core::Severity;
use migrate_preflight_core::SkipReason;
use migrate_preflight_core::Timestamp;

use common::StubCloud;
use common::healthy_cloud;
use common::machine_decl;
use common::project_decl;

fn engine(cloud: StubCloud) -> PreflightEngine<StubCloud> {
    PreflightEngine::new(
        cloud,
        ResolvedSettings::default(),
        EngineOptions::new(PrincipalId::new("user-1")),
    )
}

fn check_run_invariants(run: &Run) {
    for machine in &run.machines {
        if machine.skipped_reason != Some(SkipReason::UnknownProject)
            && let Some(key) = machine.project_key.as_ref()
        {
            assert!(run.projects.contains_key(key), "machine key {key} missing from projects");
        }
        if machine.skipped_reason == Some(SkipReason::PrerequisiteFailed) {
            assert!(machine.outcomes.is_empty());
            let key = machine.project_key.as_ref().expect("associated project key");
            let project = run.projects.get(key).expect("project present");
            assert!(matches!(project.rolled_up, Severity::Failure | Severity::Critical));
        }
    }
    for project in run.projects.values() {
        if project.short_circuited {
            let critical = project
                .outcomes
                .iter()
                .position(|outcome| outcome.severity == Severity::Critical)
                .expect("critical outcome in short-circuited scope");
            for outcome in &project.outcomes[critical + 1..] {
                assert_eq!(outcome.check, CheckRef::Skipped);
            }
        }
    }
}

// ============================================================================
// SECTION: Deduplication
// ============================================================================

/// Duplicate identical declarations collapse silently into one scope.
#[test]
fn test_identical_duplicates_dedupe_silently() {
    let run = engine(healthy_cloud(Timestamp::now()))
        .run(&[project_decl(), project_decl()], &[])
        .expect("engine run");
    assert_eq!(run.projects.len(), 1);
    let project = run.projects.values().next().expect("project");
    assert!(project.outcomes.iter().all(|outcome| outcome.check != CheckRef::Conflict));
}

/// Conflicting duplicates keep the first declaration and attach a warning.
#[test]
fn test_conflicting_duplicates_warn() {
    let variant = ProjectDecl {
        appliance_name: "B".to_string(),
        ..project_decl()
    };
    let run = engine(healthy_cloud(Timestamp::now()))
        .run(&[project_decl(), variant], &[])
        .expect("engine run");

    assert_eq!(run.projects.len(), 1);
    let project = run.projects.values().next().expect("project");
    let conflict = project
        .outcomes
        .iter()
        .find(|outcome| outcome.check == CheckRef::Conflict)
        .expect("conflict outcome");
    assert_eq!(conflict.severity, Severity::Warning);
    assert_eq!(conflict.summary, "Conflicting project declaration");
    assert!(conflict.detail.as_deref().is_some_and(|detail| detail.contains("appliance_name")));
    // The first declaration won: its appliance name still validates.
    assert_eq!(project.rolled_up, Severity::Warning);
}

// ============================================================================
// SECTION: Edges
// ============================================================================

/// Zero machines runs tier 1 only.
#[test]
fn test_projects_without_machines_run_tier1_only() {
    let run =
        engine(healthy_cloud(Timestamp::now())).run(&[project_decl()], &[]).expect("engine run");
    assert_eq!(run.projects.len(), 1);
    assert!(run.machines.is_empty());
    check_run_invariants(&run);
}

/// Zero projects marks every machine unknown.
#[test]
fn test_machines_without_projects_are_unknown() {
    let run =
        engine(healthy_cloud(Timestamp::now())).run(&[], &[machine_decl()]).expect("engine run");
    assert!(run.projects.is_empty());
    assert_eq!(run.machines.len(), 1);
    assert_eq!(run.machines[0].skipped_reason, Some(SkipReason::UnknownProject));
    check_run_invariants(&run);
}

/// Machine readiness keeps declaration order under parallel execution.
#[test]
fn test_machine_order_is_declaration_order() {
    let mut machines = Vec::new();
    for index in 0..6 {
        machines.push(MachineDecl {
            target_name: format!("web{index:02}"),
            ..machine_decl()
        });
    }
    let run = engine(healthy_cloud(Timestamp::now()))
        .run(&[project_decl()], &machines)
        .expect("engine run");
    let names: Vec<&str> =
        run.machines.iter().map(|machine| machine.target_name.as_str()).collect();
    assert_eq!(names, vec!["web00", "web01", "web02", "web03", "web04", "web05"]);
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

/// Two runs over identical inputs and provider state produce identical
/// verdicts and fingerprints.
#[test]
fn test_back_to_back_runs_are_deterministic() {
    let projects = [project_decl()];
    let machines = [machine_decl()];

    let first = engine(healthy_cloud(Timestamp::now()))
        .run(&projects, &machines)
        .expect("first run");
    let second = engine(healthy_cloud(Timestamp::now()))
        .run(&projects, &machines)
        .expect("second run");

    assert_eq!(first.config_fingerprint, second.config_fingerprint);
    let first_verdicts: Vec<_> =
        first.projects.iter().map(|(key, readiness)| (key.clone(), readiness.rolled_up)).collect();
    let second_verdicts: Vec<_> =
        second.projects.iter().map(|(key, readiness)| (key.clone(), readiness.rolled_up)).collect();
    assert_eq!(first_verdicts, second_verdicts);
    let first_machines: Vec<_> =
        first.machines.iter().map(|machine| machine.rolled_up).collect();
    let second_machines: Vec<_> =
        second.machines.iter().map(|machine| machine.rolled_up).collect();
    assert_eq!(first_machines, second_machines);
}

/// The fingerprint changes when the resolved settings change.
#[test]
fn test_fingerprint_tracks_settings() {
    let default_print = ResolvedSettings::default().fingerprint().expect("fingerprint");
    let mut settings = ResolvedSettings::default();
    settings.storage_cache.auto_create = true;
    let changed_print = settings.fingerprint().expect("fingerprint");
    assert_ne!(default_print, changed_print);
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// A pre-aborted run produces cancellation synthetics for every scope.
#[test]
fn test_aborted_run_produces_cancellation_synthetics() {
    let cancel = CancelToken::new();
    cancel.abort();
    let mut options = EngineOptions::new(PrincipalId::new("user-1"));
    options.cancel = cancel;
    let engine = PreflightEngine::new(
        healthy_cloud(Timestamp::now()),
        ResolvedSettings::default(),
        options,
    );

    let run = engine.run(&[project_decl()], &[machine_decl()]).expect("engine run");
    let project = run.projects.values().next().expect("project");
    assert_eq!(project.outcomes.len(), 1);
    assert_eq!(project.outcomes[0].check, CheckRef::Cancelled);
    assert_eq!(project.outcomes[0].severity, Severity::Warning);
    assert_eq!(project.outcomes[0].summary, "run cancelled");
    assert_eq!(run.machines[0].outcomes.len(), 1);
    assert_eq!(run.machines[0].outcomes[0].check, CheckRef::Cancelled);
}
