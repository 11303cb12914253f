// crates/migrate-preflight-core/src/runtime/landing_zone.rs
// ============================================================================
// Module: Landing Zone Orchestrator
// Description: Sequential tier-1 execution for one project scope.
// Purpose: Run enabled checks in canonical order with critical fail-fast.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! One invocation validates one deduplicated project. Checks run in the
//! canonical order; when fail-fast is on, a critical outcome skips the
//! remaining checks with explicit synthetic outcomes so the report still
//! accounts for every enabled check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::check::CheckOutcome;
use crate::core::check::CheckRef;
use crate::core::check::Severity;
use crate::core::check::TIER1_ORDER;
use crate::core::decl::MachineDecl;
use crate::core::decl::ProjectDecl;
use crate::core::readiness::ProjectReadiness;
use crate::core::settings::ResolvedSettings;
use crate::interfaces::CloudApi;
use crate::runtime::RunContext;
use crate::runtime::checks::ProjectScope;
use crate::runtime::checks::run_tier1_check;

// ============================================================================
// SECTION: Scope Execution
// ============================================================================

/// Runs the landing-zone checks for one project.
///
/// `prelude` carries synthetic outcomes attached by the engine driver, such
/// as duplicate-declaration conflict warnings; they participate in the
/// roll-up but never trigger fail-fast.
#[must_use]
pub fn run_project_scope(
    decl: &ProjectDecl,
    machines: &[MachineDecl],
    prelude: Vec<CheckOutcome>,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> ProjectReadiness {
    let key = decl.key();
    let mut outcomes = prelude;

    if let Err(input) = decl.validate() {
        outcomes.push(CheckOutcome::new(CheckRef::Input, Severity::Critical, input.to_string()));
        return ProjectReadiness::from_outcomes(key, outcomes, false);
    }

    let enabled: Vec<_> =
        TIER1_ORDER.iter().copied().filter(|check| settings.is_enabled(*check)).collect();
    let scope = ProjectScope {
        decl,
        machines,
    };

    let mut short_circuited = false;
    for (position, check) in enabled.iter().enumerate() {
        if run.cancel.is_cancelled() {
            outcomes.push(CheckOutcome::cancelled());
            break;
        }
        let outcome = run_tier1_check(*check, &scope, cloud, settings, run);
        let severity = outcome.severity;
        outcomes.push(outcome);
        if severity == Severity::Critical && settings.global.fail_fast {
            tracing::warn!(project = %key, check = %check, "critical outcome short-circuits scope");
            short_circuited = true;
            for _ in enabled.iter().skip(position + 1) {
                outcomes.push(CheckOutcome::skipped());
            }
            break;
        }
    }

    ProjectReadiness::from_outcomes(key, outcomes, short_circuited)
}
