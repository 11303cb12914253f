// crates/migrate-preflight-core/src/runtime/servers.rs
// ============================================================================
// Module: Servers Orchestrator
// Description: Sequential tier-2 execution for one machine scope.
// Purpose: Gate machines on their project verdict, then run server checks.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! A machine only runs its checks when its associated project's landing
//! zone allowed it: warnings pass through, failures and criticals skip the
//! machine with an explicit reason. A critical outcome inside a machine
//! scope short-circuits that machine only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::check::CheckOutcome;
use crate::core::check::CheckRef;
use crate::core::check::Severity;
use crate::core::check::TIER2_ORDER;
use crate::core::decl::MachineDecl;
use crate::core::identifiers::ProjectKey;
use crate::core::readiness::MachineReadiness;
use crate::core::readiness::ProjectReadiness;
use crate::core::readiness::SkipReason;
use crate::core::settings::ResolvedSettings;
use crate::interfaces::CloudApi;
use crate::runtime::RunContext;
use crate::runtime::checks::run_tier2_check;

// ============================================================================
// SECTION: Scope Execution
// ============================================================================

/// Runs the server checks for one declared machine.
#[must_use]
pub fn run_machine_scope(
    machine: &MachineDecl,
    projects: &BTreeMap<ProjectKey, ProjectReadiness>,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> MachineReadiness {
    if let Err(input) = machine.validate() {
        let outcome = CheckOutcome::new(CheckRef::Input, Severity::Critical, input.to_string());
        // Keep the association only when it resolves, so every reported key
        // is a key of the run's project map.
        let key = machine.project_key.clone().filter(|key| projects.contains_key(key));
        return MachineReadiness::from_outcomes(machine.target_name.clone(), key, vec![outcome]);
    }

    let Some(key) = machine.project_key.as_ref() else {
        return MachineReadiness::skipped(
            machine.target_name.clone(),
            None,
            SkipReason::UnknownProject,
        );
    };
    let Some(project) = projects.get(key) else {
        return MachineReadiness::skipped(
            machine.target_name.clone(),
            Some(key.clone()),
            SkipReason::UnknownProject,
        );
    };
    if !project.allows_machines() {
        return MachineReadiness::skipped(
            machine.target_name.clone(),
            Some(key.clone()),
            SkipReason::PrerequisiteFailed,
        );
    }

    let enabled: Vec<_> =
        TIER2_ORDER.iter().copied().filter(|check| settings.is_enabled(*check)).collect();
    let mut outcomes = Vec::with_capacity(enabled.len());
    for (position, check) in enabled.iter().enumerate() {
        if run.cancel.is_cancelled() {
            outcomes.push(CheckOutcome::cancelled());
            break;
        }
        let outcome = run_tier2_check(*check, machine, key, cloud, settings, run);
        let severity = outcome.severity;
        outcomes.push(outcome);
        if severity == Severity::Critical && settings.global.fail_fast {
            tracing::warn!(
                machine = %machine.target_name,
                check = %check,
                "critical outcome short-circuits machine"
            );
            for _ in enabled.iter().skip(position + 1) {
                outcomes.push(CheckOutcome::skipped());
            }
            break;
        }
    }

    MachineReadiness::from_outcomes(machine.target_name.clone(), Some(key.clone()), outcomes)
}
