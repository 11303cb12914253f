// crates/migrate-preflight-core/src/runtime/checks/servers.rs
// ============================================================================
// Module: Server Checks
// Description: Per-machine readiness checks (tier 2).
// Purpose: Validate region, topology, SKU, disks, discovery, and RBAC.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Server checks validate one declared machine against its target topology.
//! They only run once the machine's landing zone has passed; the discovery
//! check additionally needs the resolved project key to query the migrate
//! project's discovered-machine set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::check::CheckId;
use crate::core::check::CheckOutcome;
use crate::core::decl::MachineDecl;
use crate::core::identifiers::ProjectKey;
use crate::core::settings::ResolvedSettings;
use crate::interfaces::CloudApi;
use crate::interfaces::DiscoveredMachine;
use crate::interfaces::SkuInfo;
use crate::runtime::RunContext;
use crate::runtime::net::Ipv4Prefix;

/// Addresses the provider reserves in every subnet.
const PROVIDER_RESERVED_IPS: u64 = 5;
/// Free-address percentage at or below which the subnet check warns.
const LOW_FREE_IP_PERCENT: u64 = 5;

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Runs a single tier-2 check.
#[must_use]
pub fn run_tier2_check(
    check: CheckId,
    machine: &MachineDecl,
    project_key: &ProjectKey,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> CheckOutcome {
    match check {
        CheckId::ServerRegion => check_region(machine, cloud, run),
        CheckId::ServerResourceGroup => check_resource_group(machine, cloud, run),
        CheckId::ServerVnetSubnet => check_vnet_subnet(machine, cloud, run),
        CheckId::ServerSku => check_sku(machine, cloud, run),
        CheckId::ServerDiskType => check_disk_type(machine, cloud, run),
        CheckId::ServerDiscovery => check_discovery(machine, project_key, cloud, run),
        CheckId::ServerRbacRg => check_rbac_rg(machine, cloud, settings, run),
        other => CheckOutcome::failure(other, "check is not a server check"),
    }
}

// ============================================================================
// SECTION: Region
// ============================================================================

/// Verifies the target region exists for the target subscription.
fn check_region(machine: &MachineDecl, cloud: &dyn CloudApi, run: &RunContext) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ServerRegion;
    let ctx = run.call();
    match cloud.list_locations(&ctx, &machine.target_subscription) {
        Ok(locations) => {
            if locations.contains(&machine.target_region) {
                CheckOutcome::ok(CHECK, format!("region {} is available", machine.target_region))
            } else {
                CheckOutcome::failure(
                    CHECK,
                    format!(
                        "region {} is not available to subscription {}",
                        machine.target_region, machine.target_subscription
                    ),
                )
            }
        }
        Err(err) => CheckOutcome::failure(CHECK, "could not list available regions")
            .with_cause(err.cause_trace()),
    }
}

// ============================================================================
// SECTION: Resource Group
// ============================================================================

/// Verifies the target resource group exists. A metadata-region mismatch is
/// only a warning; resource groups host resources from any region.
fn check_resource_group(
    machine: &MachineDecl,
    cloud: &dyn CloudApi,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ServerResourceGroup;
    let ctx = run.call();
    match cloud.get_resource_group(
        &ctx,
        &machine.target_subscription,
        &machine.target_resource_group,
    ) {
        Ok(group) => {
            if group.region == machine.target_region {
                CheckOutcome::ok(CHECK, format!("resource group '{}' exists", group.name))
            } else {
                CheckOutcome::warning(
                    CHECK,
                    format!(
                        "resource group '{}' metadata is in {} (machine targets {})",
                        group.name, group.region, machine.target_region
                    ),
                )
            }
        }
        Err(err) if err.is_not_found() => CheckOutcome::failure(
            CHECK,
            format!("resource group '{}' not found", machine.target_resource_group),
        )
        .with_cause(err.cause_trace()),
        Err(err) => CheckOutcome::failure(CHECK, "could not resolve target resource group")
            .with_cause(err.cause_trace()),
    }
}

// ============================================================================
// SECTION: VNet / Subnet
// ============================================================================

/// Verifies vnet and subnet exist, the subnet is undelegated, and enough
/// addresses remain for general-purpose machines.
fn check_vnet_subnet(
    machine: &MachineDecl,
    cloud: &dyn CloudApi,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ServerVnetSubnet;
    let ctx = run.call();

    let vnet = match cloud.get_vnet(
        &ctx,
        &machine.target_subscription,
        &machine.target_resource_group,
        &machine.target_vnet,
    ) {
        Ok(vnet) => vnet,
        Err(err) if err.is_not_found() => {
            return CheckOutcome::failure(
                CHECK,
                format!(
                    "virtual network '{}' not found in resource group '{}'",
                    machine.target_vnet, machine.target_resource_group
                ),
            )
            .with_cause(err.cause_trace());
        }
        Err(err) => {
            return CheckOutcome::failure(CHECK, "could not resolve target virtual network")
                .with_cause(err.cause_trace());
        }
    };

    if !vnet.subnets.iter().any(|name| name.eq_ignore_ascii_case(&machine.target_subnet)) {
        return CheckOutcome::failure(
            CHECK,
            format!(
                "subnet '{}' not found in virtual network '{}'",
                machine.target_subnet, vnet.name
            ),
        )
        .with_detail(format!("existing subnets: {}", vnet.subnets.join(", ")));
    }

    let subnet = match cloud.get_subnet(
        &ctx,
        &machine.target_subscription,
        &machine.target_resource_group,
        &machine.target_vnet,
        &machine.target_subnet,
    ) {
        Ok(subnet) => subnet,
        Err(err) => {
            return CheckOutcome::failure(CHECK, "could not resolve target subnet")
                .with_cause(err.cause_trace());
        }
    };

    if !subnet.delegations.is_empty() {
        return CheckOutcome::failure(
            CHECK,
            format!(
                "subnet '{}' is delegated to {} and cannot host general-purpose machines",
                subnet.name,
                subnet.delegations.join(", ")
            ),
        );
    }

    let Some(prefix) = Ipv4Prefix::parse(&subnet.address_prefix) else {
        return CheckOutcome::failure(
            CHECK,
            format!(
                "subnet '{}' has an unparseable address prefix '{}'",
                subnet.name, subnet.address_prefix
            ),
        );
    };

    let capacity = prefix.capacity();
    let free = capacity
        .saturating_sub(PROVIDER_RESERVED_IPS)
        .saturating_sub(u64::from(subnet.used_ip_count));
    if free == 0 {
        return CheckOutcome::failure(
            CHECK,
            format!("subnet '{}' has no free IP addresses", subnet.name),
        )
        .with_detail(format!(
            "prefix {} holds {capacity} addresses, {} in use, {PROVIDER_RESERVED_IPS} reserved",
            subnet.address_prefix, subnet.used_ip_count
        ));
    }
    if free * 100 <= capacity * LOW_FREE_IP_PERCENT {
        return CheckOutcome::warning(
            CHECK,
            format!("subnet '{}' is nearly full: {free} of {capacity} addresses free", subnet.name),
        );
    }
    CheckOutcome::ok(
        CHECK,
        format!("subnet '{}' has {free} free addresses", subnet.name),
    )
}

// ============================================================================
// SECTION: Machine SKU
// ============================================================================

/// Verifies the target SKU is offered and not restricted out of the region.
fn check_sku(machine: &MachineDecl, cloud: &dyn CloudApi, run: &RunContext) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ServerSku;
    let ctx = run.call();
    let skus =
        match cloud.list_vm_skus(&ctx, &machine.target_subscription, &machine.target_region) {
            Ok(skus) => skus,
            Err(err) => {
                return CheckOutcome::failure(CHECK, "could not list machine SKUs")
                    .with_cause(err.cause_trace());
            }
        };

    let Some(sku) = find_sku(&skus, &machine.target_sku) else {
        return CheckOutcome::failure(
            CHECK,
            format!(
                "SKU '{}' is not offered in {}",
                machine.target_sku, machine.target_region
            ),
        );
    };

    if sku.fully_restricted() {
        return CheckOutcome::failure(
            CHECK,
            format!(
                "SKU '{}' is restricted for this subscription in {}",
                sku.name, machine.target_region
            ),
        )
        .with_detail(restriction_detail(sku));
    }
    if sku.partially_restricted() {
        return CheckOutcome::warning(
            CHECK,
            format!("SKU '{}' is restricted in some availability zones", sku.name),
        )
        .with_detail(restriction_detail(sku));
    }
    if sku.deprecated {
        return CheckOutcome::warning(CHECK, format!("SKU '{}' is deprecated", sku.name));
    }
    CheckOutcome::ok(CHECK, format!("SKU '{}' is available", sku.name))
}

/// Finds a SKU by case-insensitive name.
fn find_sku<'a>(skus: &'a [SkuInfo], name: &str) -> Option<&'a SkuInfo> {
    skus.iter().find(|sku| sku.name.eq_ignore_ascii_case(name))
}

/// Renders restriction reasons for outcome details.
fn restriction_detail(sku: &SkuInfo) -> String {
    let reasons: Vec<&str> =
        sku.restrictions.iter().filter_map(|r| r.reason.as_deref()).collect();
    if reasons.is_empty() {
        format!("{} restriction(s) active", sku.restrictions.len())
    } else {
        reasons.join(", ")
    }
}

// ============================================================================
// SECTION: Disk Type
// ============================================================================

/// Verifies the declared disk kind is usable with the target SKU and region.
fn check_disk_type(machine: &MachineDecl, cloud: &dyn CloudApi, run: &RunContext) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ServerDiskType;
    let ctx = run.call();
    let skus =
        match cloud.list_vm_skus(&ctx, &machine.target_subscription, &machine.target_region) {
            Ok(skus) => skus,
            Err(err) => {
                return CheckOutcome::failure(CHECK, "could not list machine SKUs")
                    .with_cause(err.cause_trace());
            }
        };

    let Some(sku) = find_sku(&skus, &machine.target_sku) else {
        return CheckOutcome::warning(
            CHECK,
            format!(
                "disk support for '{}' cannot be determined: SKU '{}' is not offered in {}",
                machine.target_disk_type, machine.target_sku, machine.target_region
            ),
        );
    };

    let disk = machine.target_disk_type;
    if disk.requires_premium_io() && !sku.premium_io {
        return CheckOutcome::failure(
            CHECK,
            format!("SKU '{}' does not support premium storage disk '{disk}'", sku.name),
        );
    }
    if disk.is_zone_redundant() && sku.zones.is_empty() {
        return CheckOutcome::failure(
            CHECK,
            format!(
                "zone-redundant disk '{disk}' is unavailable: SKU '{}' reports no availability \
                 zones in {}",
                sku.name, machine.target_region
            ),
        );
    }
    CheckOutcome::ok(CHECK, format!("disk '{disk}' is supported by SKU '{}'", sku.name))
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Verifies the machine is discovered exactly once in its migrate project,
/// warning when it already carries replication state.
fn check_discovery(
    machine: &MachineDecl,
    project_key: &ProjectKey,
    cloud: &dyn CloudApi,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ServerDiscovery;
    let ctx = run.call();
    let name = machine.discovery_name();

    let discovered = match cloud.list_discovered_machines(
        &ctx,
        &project_key.subscription_id,
        &project_key.resource_group,
        &project_key.project_name,
    ) {
        Ok(discovered) => discovered,
        Err(err) => {
            return CheckOutcome::failure(CHECK, "could not list discovered machines")
                .with_cause(err.cause_trace());
        }
    };

    let exact: Vec<&DiscoveredMachine> =
        discovered.iter().filter(|record| record.matches_exact(name)).collect();
    match exact.as_slice() {
        [] => {
            let near: Vec<&str> = discovered
                .iter()
                .filter(|record| record.matches_substring(name))
                .map(|record| record.name.as_str())
                .collect();
            let outcome = CheckOutcome::failure(
                CHECK,
                format!(
                    "machine '{name}' is not discovered in project '{}'",
                    project_key.project_name
                ),
            );
            if near.is_empty() {
                outcome
            } else {
                outcome.with_detail(format!("similarly named records: {}", near.join(", ")))
            }
        }
        [record] => match &record.replication_state {
            Some(state) => CheckOutcome::warning(
                CHECK,
                format!("machine '{name}' already has replication state '{state}'"),
            )
            .with_detail(format!("discovery record: {}", record.id)),
            None => CheckOutcome::ok(CHECK, format!("machine '{name}' is discovered"))
                .with_detail(format!("discovery record: {}", record.id)),
        },
        records => {
            let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
            CheckOutcome::warning(
                CHECK,
                format!("machine '{name}' matches {} discovery records", records.len()),
            )
            .with_detail(format!("candidates: {}", ids.join(", ")))
        }
    }
}

// ============================================================================
// SECTION: Target Resource Group RBAC
// ============================================================================

/// Verifies the principal holds a required role on the target resource
/// group.
fn check_rbac_rg(
    machine: &MachineDecl,
    cloud: &dyn CloudApi,
    settings: &ResolvedSettings,
    run: &RunContext,
) -> CheckOutcome {
    const CHECK: CheckId = CheckId::ServerRbacRg;
    let ctx = run.call();
    let scope = format!(
        "/subscriptions/{}/resourceGroups/{}",
        machine.target_subscription, machine.target_resource_group
    );
    match cloud.list_role_assignments(&ctx, &scope, &run.principal) {
        Ok(roles) => {
            let required = &settings.server_rbac_rg.required_roles;
            if required.iter().any(|role| roles.contains(role)) {
                CheckOutcome::ok(
                    CHECK,
                    format!(
                        "principal holds a required role on resource group '{}'",
                        machine.target_resource_group
                    ),
                )
            } else {
                CheckOutcome::failure(
                    CHECK,
                    format!(
                        "principal lacks a required role on resource group '{}'",
                        machine.target_resource_group
                    ),
                )
            }
        }
        Err(err) if err.is_forbidden() => {
            CheckOutcome::failure(CHECK, "insufficient permission to verify permissions")
                .with_cause(err.cause_trace())
        }
        Err(err) => CheckOutcome::failure(CHECK, "could not list resource group permissions")
            .with_cause(err.cause_trace()),
    }
}
