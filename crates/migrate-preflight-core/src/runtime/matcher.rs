// crates/migrate-preflight-core/src/runtime/matcher.rs
// ============================================================================
// Module: Intelligent Matcher
// Description: Associates unassigned machines with the best-fitting project.
// Purpose: Fill empty project keys by scoring discovery data per candidate.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The matcher is a best-effort pre-pass: it never fails, and it never
//! overrides an explicit association. A machine that no candidate scores
//! positively for keeps an empty key and is later reported as
//! `unknown_project`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::decl::MachineDecl;
use crate::core::decl::ProjectDecl;
use crate::core::identifiers::ProjectKey;
use crate::interfaces::CloudApi;
use crate::interfaces::DiscoveredMachine;
use crate::runtime::RunContext;
use crate::runtime::net::Ipv4Prefix;

// ============================================================================
// SECTION: Scoring Weights
// ============================================================================

/// Case-insensitive exact name match against any known discovery name.
const SCORE_EXACT_NAME: u32 = 10;
/// Substring name match against any known discovery name.
const SCORE_SUBSTRING_NAME: u32 = 5;
/// Declared target region equals the candidate project's region.
const SCORE_REGION_MATCH: u32 = 3;
/// A matched discovery record reports an IP inside the declared subnet.
const SCORE_SUBNET_IP: u32 = 2;

// ============================================================================
// SECTION: Assignment
// ============================================================================

/// Fills empty project keys on the given machines.
///
/// Machines with an explicit key pass through untouched. Candidate scoring
/// tolerates every cloud failure; at worst a machine keeps an empty key.
#[must_use]
pub fn assign_projects(
    machines: &[MachineDecl],
    projects: &[ProjectDecl],
    cloud: &dyn CloudApi,
    run: &RunContext,
) -> Vec<MachineDecl> {
    machines
        .iter()
        .map(|machine| {
            if machine.project_key.is_some() {
                return machine.clone();
            }
            let mut assigned = machine.clone();
            assigned.project_key = best_candidate(machine, projects, cloud, run);
            assigned
        })
        .collect()
}

/// Scores every declared project and returns the best positive match.
fn best_candidate(
    machine: &MachineDecl,
    projects: &[ProjectDecl],
    cloud: &dyn CloudApi,
    run: &RunContext,
) -> Option<ProjectKey> {
    let subnet_prefix = declared_subnet_prefix(machine, cloud, run);

    let mut best: Option<(u32, ProjectKey)> = None;
    for project in projects {
        let score = score_candidate(machine, project, subnet_prefix.as_ref(), cloud, run);
        if score == 0 {
            continue;
        }
        let key = project.key();
        let better = match &best {
            None => true,
            Some((best_score, best_key)) => {
                score > *best_score || (score == *best_score && key < *best_key)
            }
        };
        if better {
            best = Some((score, key));
        }
    }

    if let Some((score, key)) = &best {
        tracing::debug!(
            machine = %machine.target_name,
            project = %key,
            score,
            "matcher assignment"
        );
    }
    best.map(|(_, key)| key)
}

/// Scores one candidate project for one machine.
fn score_candidate(
    machine: &MachineDecl,
    project: &ProjectDecl,
    subnet_prefix: Option<&Ipv4Prefix>,
    cloud: &dyn CloudApi,
    run: &RunContext,
) -> u32 {
    let mut score = 0;

    if machine.target_region == project.region {
        score += SCORE_REGION_MATCH;
    }

    let discovered = cloud
        .list_discovered_machines(
            &run.call(),
            &project.subscription_id,
            &project.resource_group,
            &project.project_name,
        )
        .unwrap_or_default();
    let name = machine.discovery_name();
    if let Some((record, exact)) = best_name_match(&discovered, name) {
        score += if exact { SCORE_EXACT_NAME } else { SCORE_SUBSTRING_NAME };
        if let Some(prefix) = subnet_prefix
            && record.ip_addresses.iter().any(|ip| prefix.contains(ip))
        {
            score += SCORE_SUBNET_IP;
        }
    }

    score
}

/// Finds the strongest name match in a discovery set, preferring exact.
fn best_name_match<'a>(
    discovered: &'a [DiscoveredMachine],
    name: &str,
) -> Option<(&'a DiscoveredMachine, bool)> {
    if let Some(record) = discovered.iter().find(|record| record.matches_exact(name)) {
        return Some((record, true));
    }
    discovered.iter().find(|record| record.matches_substring(name)).map(|record| (record, false))
}

/// Resolves the declared subnet's IPv4 prefix, tolerating all failures.
fn declared_subnet_prefix(
    machine: &MachineDecl,
    cloud: &dyn CloudApi,
    run: &RunContext,
) -> Option<Ipv4Prefix> {
    let subnet = cloud
        .get_subnet(
            &run.call(),
            &machine.target_subscription,
            &machine.target_resource_group,
            &machine.target_vnet,
            &machine.target_subnet,
        )
        .ok()?;
    Ipv4Prefix::parse(&subnet.address_prefix)
}
