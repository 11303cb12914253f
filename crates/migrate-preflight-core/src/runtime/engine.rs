// crates/migrate-preflight-core/src/runtime/engine.rs
// ============================================================================
// Module: Preflight Engine Driver
// Description: Top-level entry executing both validation tiers.
// Purpose: Dedupe projects, fan scopes out over the pool, assemble the run.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The driver is the single execution path of Migrate Preflight. It owns the
//! only wall-clock reads, derives the run deadline, dedupes project
//! declarations, optionally runs the matcher pre-pass, executes tier 1 and
//! then tier 2 on a bounded worker pool, and merges per-scope results into
//! an immutable [`Run`] report. Errors inside one scope never abort another;
//! the engine always returns a report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::core::cancel::CancelToken;
use crate::core::check::CheckOutcome;
use crate::core::check::CheckRef;
use crate::core::check::Severity;
use crate::core::decl::MachineDecl;
use crate::core::decl::ProjectDecl;
use crate::core::hashing::HashError;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ProjectKey;
use crate::core::readiness::MachineReadiness;
use crate::core::readiness::ProjectReadiness;
use crate::core::readiness::Run;
use crate::core::settings::ResolvedSettings;
use crate::core::time::Timestamp;
use crate::interfaces::CloudApi;
use crate::runtime::RunContext;
use crate::runtime::landing_zone::run_project_scope;
use crate::runtime::matcher::assign_projects;
use crate::runtime::pool::default_parallelism;
use crate::runtime::pool::run_bounded;
use crate::runtime::servers::run_machine_scope;

// ============================================================================
// SECTION: Options and Errors
// ============================================================================

/// Caller-supplied options for one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Principal whose access the run validates.
    pub principal: PrincipalId,
    /// Worker bound override; defaults to `min(cpus * 2, 8)`.
    pub parallelism: Option<usize>,
    /// Run the matcher pre-pass for machines without a project key.
    pub match_unassigned: bool,
    /// External cancellation handle for the run.
    pub cancel: CancelToken,
}

impl EngineOptions {
    /// Creates options for the given principal with defaults.
    #[must_use]
    pub fn new(principal: PrincipalId) -> Self {
        Self {
            principal,
            parallelism: None,
            match_unassigned: true,
            cancel: CancelToken::new(),
        }
    }
}

/// Fatal engine errors.
///
/// Everything else a run encounters becomes an outcome on a scope.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The resolved settings could not be fingerprinted.
    #[error("settings fingerprint failed: {0}")]
    Fingerprint(#[from] HashError),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Top-level validation engine.
pub struct PreflightEngine<C> {
    /// Cloud control-plane access.
    cloud: C,
    /// Frozen validation settings for the run.
    settings: ResolvedSettings,
    /// Invocation options.
    options: EngineOptions,
}

impl<C: CloudApi> PreflightEngine<C> {
    /// Creates an engine over the given cloud access layer.
    #[must_use]
    pub fn new(cloud: C, settings: ResolvedSettings, options: EngineOptions) -> Self {
        Self {
            cloud,
            settings,
            options,
        }
    }

    /// Validates the declared projects and machines.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only for configuration-level faults; scope
    /// failures are reported inside the returned [`Run`].
    pub fn run(
        &self,
        projects: &[ProjectDecl],
        machines: &[MachineDecl],
    ) -> Result<Run, EngineError> {
        let started_at = Timestamp::now();
        let config_fingerprint = self.settings.fingerprint()?;

        let deduped = dedupe_projects(projects);
        let scope_count = deduped.len() + machines.len();
        let parallelism = self.parallelism();
        let cancel = self.derive_deadline(scope_count, parallelism);
        let run_ctx = RunContext {
            principal: self.options.principal.clone(),
            now: started_at,
            cancel,
        };

        tracing::debug!(
            projects = deduped.len(),
            machines = machines.len(),
            parallelism,
            "starting preflight run"
        );

        let machines = if self.options.match_unassigned {
            assign_projects(machines, projects, &self.cloud, &run_ctx)
        } else {
            machines.to_vec()
        };
        let machines_by_project = group_by_project(&machines);

        let project_results = run_bounded(parallelism, &deduped, |_, (key, decl, conflicts)| {
            if run_ctx.cancel.is_cancelled() {
                return cancelled_project(key.clone());
            }
            let project_machines =
                machines_by_project.get(key).map_or(&[][..], Vec::as_slice);
            run_project_scope(
                decl,
                project_machines,
                conflicts.clone(),
                &self.cloud,
                &self.settings,
                &run_ctx,
            )
        });
        let projects: BTreeMap<ProjectKey, ProjectReadiness> = project_results
            .into_iter()
            .map(|readiness| (readiness.project_key.clone(), readiness))
            .collect();

        let machine_results = run_bounded(parallelism, &machines, |_, machine| {
            if run_ctx.cancel.is_cancelled() {
                return cancelled_machine(machine, &projects);
            }
            run_machine_scope(machine, &projects, &self.cloud, &self.settings, &run_ctx)
        });

        Ok(Run {
            projects,
            machines: machine_results,
            started_at,
            finished_at: Timestamp::now(),
            config_fingerprint,
        })
    }

    /// Returns the cloud access layer, consuming the engine.
    pub fn into_cloud(self) -> C {
        self.cloud
    }

    /// Resolves the effective worker bound for this run.
    fn parallelism(&self) -> usize {
        if !self.settings.global.parallel_execution {
            return 1;
        }
        self.options.parallelism.unwrap_or_else(default_parallelism).max(1)
    }

    /// Derives the run deadline from the per-scope budget.
    fn derive_deadline(&self, scope_count: usize, parallelism: usize) -> CancelToken {
        let waves = scope_count.div_ceil(parallelism).max(1) as u64;
        let seconds = self.settings.global.timeout_seconds.saturating_mul(waves);
        self.options.cancel.child_with_timeout(Duration::from_secs(seconds))
    }
}

// ============================================================================
// SECTION: Deduplication and Grouping
// ============================================================================

/// Deduplicates project declarations by key, first declaration wins.
///
/// Conflicting duplicates produce a synthetic warning outcome attached to
/// the surviving declaration's scope.
fn dedupe_projects(
    projects: &[ProjectDecl],
) -> Vec<(ProjectKey, ProjectDecl, Vec<CheckOutcome>)> {
    let mut order: Vec<ProjectKey> = Vec::new();
    let mut deduped: BTreeMap<ProjectKey, (ProjectDecl, Vec<CheckOutcome>)> = BTreeMap::new();
    for decl in projects {
        let key = decl.key();
        match deduped.get_mut(&key) {
            None => {
                order.push(key.clone());
                deduped.insert(key, (decl.clone(), Vec::new()));
            }
            Some((kept, conflicts)) => {
                let differing = kept.conflicting_fields(decl);
                if !differing.is_empty() {
                    conflicts.push(
                        CheckOutcome::new(
                            CheckRef::Conflict,
                            Severity::Warning,
                            "Conflicting project declaration",
                        )
                        .with_detail(format!(
                            "a duplicate declaration differs in: {}",
                            differing.join(", ")
                        )),
                    );
                }
            }
        }
    }
    order
        .into_iter()
        .filter_map(|key| {
            deduped.remove(&key).map(|(decl, conflicts)| (key, decl, conflicts))
        })
        .collect()
}

/// Groups machines by their resolved project key for quota sizing.
fn group_by_project(machines: &[MachineDecl]) -> BTreeMap<ProjectKey, Vec<MachineDecl>> {
    let mut grouped: BTreeMap<ProjectKey, Vec<MachineDecl>> = BTreeMap::new();
    for machine in machines {
        if let Some(key) = &machine.project_key {
            grouped.entry(key.clone()).or_default().push(machine.clone());
        }
    }
    grouped
}

// ============================================================================
// SECTION: Cancellation Synthetics
// ============================================================================

/// Builds the readiness record for a project scope that never started.
fn cancelled_project(key: ProjectKey) -> ProjectReadiness {
    ProjectReadiness::from_outcomes(key, vec![CheckOutcome::cancelled()], false)
}

/// Builds the readiness record for a machine scope that never started.
fn cancelled_machine(
    machine: &MachineDecl,
    projects: &BTreeMap<ProjectKey, ProjectReadiness>,
) -> MachineReadiness {
    let key = machine.project_key.clone().filter(|key| projects.contains_key(key));
    MachineReadiness::from_outcomes(
        machine.target_name.clone(),
        key,
        vec![CheckOutcome::cancelled()],
    )
}
