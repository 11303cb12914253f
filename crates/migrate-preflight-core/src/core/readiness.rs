// crates/migrate-preflight-core/src/core/readiness.rs
// ============================================================================
// Module: Migrate Preflight Readiness Reports
// Description: Per-scope readiness records and the aggregated run report.
// Purpose: Provide the serializable output contract of the engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A run produces one [`ProjectReadiness`] per unique project key and one
//! [`MachineReadiness`] per declared machine. Roll-up severity is always the
//! maximum severity across a scope's outcomes; an empty non-skipped scope
//! rolls up to `ok`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::check::CheckOutcome;
use crate::core::check::Severity;
use crate::core::identifiers::ProjectKey;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Project Readiness
// ============================================================================

/// Aggregated landing-zone verdict for one migrate project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReadiness {
    /// Project identity.
    pub project_key: ProjectKey,
    /// Check outcomes in evaluation order.
    pub outcomes: Vec<CheckOutcome>,
    /// Maximum severity across outcomes.
    pub rolled_up: Severity,
    /// True when a critical outcome skipped the remaining checks.
    pub short_circuited: bool,
}

impl ProjectReadiness {
    /// Builds a readiness record, computing the roll-up severity.
    #[must_use]
    pub fn from_outcomes(
        project_key: ProjectKey,
        outcomes: Vec<CheckOutcome>,
        short_circuited: bool,
    ) -> Self {
        let rolled_up = rolled_up(&outcomes);
        Self {
            project_key,
            outcomes,
            rolled_up,
            short_circuited,
        }
    }

    /// Returns true when machines of this project may proceed to tier 2.
    ///
    /// Warnings do not block tier 2; failures and criticals do.
    #[must_use]
    pub const fn allows_machines(&self) -> bool {
        matches!(self.rolled_up, Severity::Ok | Severity::Warning)
    }
}

// ============================================================================
// SECTION: Machine Readiness
// ============================================================================

/// Reason a machine scope was skipped without running checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The associated project's landing-zone verdict blocked the machine.
    PrerequisiteFailed,
    /// No declared project matches the machine's project key.
    UnknownProject,
}

impl SkipReason {
    /// Returns the stable label for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PrerequisiteFailed => "prerequisite_failed",
            Self::UnknownProject => "unknown_project",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated servers verdict for one declared machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineReadiness {
    /// Target machine name.
    pub target_name: String,
    /// Associated project key, when one resolved.
    pub project_key: Option<ProjectKey>,
    /// Check outcomes in evaluation order; empty for skipped machines.
    pub outcomes: Vec<CheckOutcome>,
    /// Maximum severity across outcomes, or `failure` for skipped machines.
    pub rolled_up: Severity,
    /// Reason checks were skipped, when they were.
    #[serde(default)]
    pub skipped_reason: Option<SkipReason>,
}

impl MachineReadiness {
    /// Builds a readiness record, computing the roll-up severity.
    #[must_use]
    pub fn from_outcomes(
        target_name: impl Into<String>,
        project_key: Option<ProjectKey>,
        outcomes: Vec<CheckOutcome>,
    ) -> Self {
        let rolled_up = rolled_up(&outcomes);
        Self {
            target_name: target_name.into(),
            project_key,
            outcomes,
            rolled_up,
            skipped_reason: None,
        }
    }

    /// Builds a skipped record with no outcomes and a `failure` roll-up.
    #[must_use]
    pub fn skipped(
        target_name: impl Into<String>,
        project_key: Option<ProjectKey>,
        reason: SkipReason,
    ) -> Self {
        Self {
            target_name: target_name.into(),
            project_key,
            outcomes: Vec::new(),
            rolled_up: Severity::Failure,
            skipped_reason: Some(reason),
        }
    }
}

// ============================================================================
// SECTION: Run Report
// ============================================================================

/// Complete report of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Project verdicts keyed by project identity.
    pub projects: BTreeMap<ProjectKey, ProjectReadiness>,
    /// Machine verdicts in declaration order.
    pub machines: Vec<MachineReadiness>,
    /// Wall-clock start of the run.
    pub started_at: Timestamp,
    /// Wall-clock end of the run.
    pub finished_at: Timestamp,
    /// Hex SHA-256 of the canonicalized resolved validation settings.
    pub config_fingerprint: String,
}

impl Run {
    /// Computes aggregate counts across the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total_projects: self.projects.len(),
            total_machines: self.machines.len(),
            ..RunSummary::default()
        };
        for readiness in self.projects.values() {
            match readiness.rolled_up {
                Severity::Ok => summary.ready_projects += 1,
                Severity::Warning => summary.warning_projects += 1,
                Severity::Failure | Severity::Critical => summary.failed_projects += 1,
            }
        }
        for readiness in &self.machines {
            if readiness.skipped_reason.is_some() {
                summary.skipped_machines += 1;
                continue;
            }
            match readiness.rolled_up {
                Severity::Ok => summary.ready_machines += 1,
                Severity::Warning => summary.warning_machines += 1,
                Severity::Failure | Severity::Critical => summary.failed_machines += 1,
            }
        }
        summary
    }
}

/// Aggregate counts for rendering a run at a glance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique projects validated.
    pub total_projects: usize,
    /// Projects with an `ok` roll-up.
    pub ready_projects: usize,
    /// Projects with a `warning` roll-up.
    pub warning_projects: usize,
    /// Projects with a `failure` or `critical` roll-up.
    pub failed_projects: usize,
    /// Machines declared.
    pub total_machines: usize,
    /// Machines with an `ok` roll-up.
    pub ready_machines: usize,
    /// Machines with a `warning` roll-up.
    pub warning_machines: usize,
    /// Machines with a `failure` or `critical` roll-up.
    pub failed_machines: usize,
    /// Machines skipped without running checks.
    pub skipped_machines: usize,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Computes the maximum severity across outcomes, `ok` when empty.
fn rolled_up(outcomes: &[CheckOutcome]) -> Severity {
    outcomes.iter().map(|outcome| outcome.severity).max().unwrap_or(Severity::Ok)
}
