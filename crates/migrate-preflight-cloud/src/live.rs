// crates/migrate-preflight-cloud/src/live.rs
// ============================================================================
// Module: Live Cloud Client
// Description: CloudApi implementation over the management REST API.
// Purpose: Parse provider responses into the typed views checks consume.
// Dependencies: migrate-preflight-core, chrono, serde, serde_json
// ============================================================================

//! ## Overview
//! `ArmCloud` maps each interface operation onto its REST endpoint and
//! parses the camelCase response bodies into the typed views. Responses that
//! violate the expected shape surface as `Malformed` rather than panicking
//! or silently defaulting load-bearing fields. Appliance listing first asks
//! the site APIs directly and falls back to a resource-graph query, since
//! not every project exposes its sites to the direct listing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::DateTime;
use migrate_preflight_core::Appliance;
use migrate_preflight_core::ApplianceHealth;
use migrate_preflight_core::ApplianceKind;
use migrate_preflight_core::CallContext;
use migrate_preflight_core::CloudApi;
use migrate_preflight_core::CloudError;
use migrate_preflight_core::CreateStorageRequest;
use migrate_preflight_core::DiscoveredMachine;
use migrate_preflight_core::PrincipalId;
use migrate_preflight_core::ProjectInfo;
use migrate_preflight_core::QuotaUsage;
use migrate_preflight_core::RegionCode;
use migrate_preflight_core::ResourceGroupInfo;
use migrate_preflight_core::ResourceGroupName;
use migrate_preflight_core::RestrictionScope;
use migrate_preflight_core::RoleDefinitionId;
use migrate_preflight_core::SkuInfo;
use migrate_preflight_core::SkuRestriction;
use migrate_preflight_core::StorageAccountInfo;
use migrate_preflight_core::SubnetInfo;
use migrate_preflight_core::SubscriptionId;
use migrate_preflight_core::SubscriptionInfo;
use migrate_preflight_core::Timestamp;
use migrate_preflight_core::TokenSource;
use migrate_preflight_core::VnetInfo;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::transport::ArmTransport;
use crate::transport::ArmTransportConfig;

// ============================================================================
// SECTION: API Versions
// ============================================================================

const API_SUBSCRIPTIONS: &str = "2022-12-01";
const API_AUTHORIZATION: &str = "2022-04-01";
const API_RESOURCE_GROUPS: &str = "2021-04-01";
const API_COMPUTE_SKUS: &str = "2021-07-01";
const API_COMPUTE_USAGE: &str = "2023-07-01";
const API_NETWORK: &str = "2023-05-01";
const API_STORAGE: &str = "2023-01-01";
const API_MIGRATE: &str = "2020-05-01";
const API_OFF_AZURE: &str = "2023-06-06";
const API_RESOURCE_GRAPH: &str = "2022-10-01";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Live cloud client over the management REST API.
pub struct ArmCloud {
    transport: ArmTransport,
}

impl ArmCloud {
    /// Creates a live client over the given credential.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the transport cannot be constructed.
    pub fn new(
        credential: Arc<dyn TokenSource>,
        config: ArmTransportConfig,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            transport: ArmTransport::new(credential, config)?,
        })
    }

    /// Creates a live client with default transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the transport cannot be constructed.
    pub fn with_defaults(credential: Arc<dyn TokenSource>) -> Result<Self, CloudError> {
        Self::new(credential, ArmTransportConfig::default())
    }
}

// ============================================================================
// SECTION: Response Bodies
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionBody {
    display_name: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceGroupBody {
    name: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedBody {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignmentBody {
    properties: Option<RoleAssignmentProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignmentProperties {
    role_definition_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkuBody {
    name: Option<String>,
    family: Option<String>,
    #[serde(default)]
    capabilities: Vec<CapabilityBody>,
    #[serde(default)]
    location_info: Vec<LocationInfoBody>,
    #[serde(default)]
    restrictions: Vec<RestrictionBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapabilityBody {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationInfoBody {
    #[serde(default)]
    zones: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestrictionBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    restriction_info: Option<RestrictionInfoBody>,
    reason_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestrictionInfoBody {
    #[serde(default)]
    zones: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VnetBody {
    name: Option<String>,
    location: Option<String>,
    properties: Option<VnetProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VnetProperties {
    #[serde(default)]
    subnets: Vec<NamedBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubnetBody {
    name: Option<String>,
    properties: Option<SubnetProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubnetProperties {
    address_prefix: Option<String>,
    #[serde(default)]
    address_prefixes: Vec<String>,
    #[serde(default)]
    delegations: Vec<DelegationBody>,
    #[serde(default)]
    ip_configurations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelegationBody {
    name: Option<String>,
    properties: Option<DelegationProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelegationProperties {
    service_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageAccountBody {
    name: Option<String>,
    location: Option<String>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageBody {
    name: Option<UsageNameBody>,
    current_value: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageNameBody {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrateProjectBody {
    id: Option<String>,
    name: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteBody {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    properties: Option<SiteProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteProperties {
    agent_details: Option<AgentDetailsBody>,
    health_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentDetailsBody {
    last_heart_beat_utc: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrateMachineBody {
    id: Option<String>,
    name: Option<String>,
    properties: Option<MigrateMachineProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrateMachineProperties {
    #[serde(default)]
    discovery_data: Vec<DiscoveryDataBody>,
    #[serde(default)]
    migration_data: Vec<MigrationDataBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveryDataBody {
    machine_name: Option<String>,
    fqdn: Option<String>,
    #[serde(default)]
    ip_addresses: Vec<String>,
    number_of_processor_core: Option<u32>,
    megabytes_of_memory: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrationDataBody {
    machine_name: Option<String>,
    migration_phase: Option<String>,
    #[serde(default)]
    ip_addresses: Vec<String>,
}

/// Deserializes a provider body, mapping schema violations to `Malformed`.
fn parse_body<T: for<'de> Deserialize<'de>>(
    operation: &str,
    value: Value,
) -> Result<T, CloudError> {
    serde_json::from_value(value).map_err(|err| CloudError::Malformed {
        reason: format!("{operation}: {err}"),
        request_id: None,
    })
}

/// Requires a field the engine cannot proceed without.
fn require<T>(operation: &str, field: &str, value: Option<T>) -> Result<T, CloudError> {
    value.ok_or_else(|| CloudError::Malformed {
        reason: format!("{operation}: response is missing '{field}'"),
        request_id: None,
    })
}

// ============================================================================
// SECTION: CloudApi Implementation
// ============================================================================

impl CloudApi for ArmCloud {
    fn get_subscription(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<SubscriptionInfo, CloudError> {
        let path = format!("/subscriptions/{subscription}");
        let body = self.transport.get_json(ctx, &path, API_SUBSCRIPTIONS)?;
        let parsed: SubscriptionBody = parse_body("get_subscription", body)?;
        Ok(SubscriptionInfo {
            id: subscription.clone(),
            display_name: parsed.display_name.unwrap_or_default(),
            state: parsed.state,
        })
    }

    fn list_role_assignments(
        &self,
        ctx: &CallContext,
        scope: &str,
        principal: &PrincipalId,
    ) -> Result<BTreeSet<RoleDefinitionId>, CloudError> {
        let path = format!(
            "{scope}/providers/Microsoft.Authorization/roleAssignments?$filter=principalId eq \
             '{principal}'"
        );
        let items = self.transport.get_paged(ctx, &path, API_AUTHORIZATION)?;
        let mut roles = BTreeSet::new();
        for item in items {
            let parsed: RoleAssignmentBody = parse_body("list_role_assignments", item)?;
            if let Some(definition) =
                parsed.properties.and_then(|props| props.role_definition_id)
            {
                // The definition id is a full resource path; the trailing
                // segment is the role GUID.
                let id = definition.rsplit('/').next().unwrap_or(&definition);
                roles.insert(RoleDefinitionId::new(id));
            }
        }
        Ok(roles)
    }

    fn get_resource_group(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<ResourceGroupInfo, CloudError> {
        let path = format!("/subscriptions/{subscription}/resourcegroups/{resource_group}");
        let body = self.transport.get_json(ctx, &path, API_RESOURCE_GROUPS)?;
        let parsed: ResourceGroupBody = parse_body("get_resource_group", body)?;
        Ok(ResourceGroupInfo {
            name: ResourceGroupName::new(
                parsed.name.unwrap_or_else(|| resource_group.as_str().to_string()),
            ),
            region: RegionCode::new(require(
                "get_resource_group",
                "location",
                parsed.location,
            )?),
        })
    }

    fn list_locations(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<BTreeSet<RegionCode>, CloudError> {
        let path = format!("/subscriptions/{subscription}/locations");
        let items = self.transport.get_paged(ctx, &path, API_SUBSCRIPTIONS)?;
        let mut locations = BTreeSet::new();
        for item in items {
            let parsed: NamedBody = parse_body("list_locations", item)?;
            if let Some(name) = parsed.name {
                locations.insert(RegionCode::new(name));
            }
        }
        Ok(locations)
    }

    fn list_vm_skus(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
    ) -> Result<Vec<SkuInfo>, CloudError> {
        let path = format!(
            "/subscriptions/{subscription}/providers/Microsoft.Compute/skus?$filter=location eq \
             '{region}'"
        );
        let items = self.transport.get_paged(ctx, &path, API_COMPUTE_SKUS)?;
        let mut skus = Vec::with_capacity(items.len());
        for item in items {
            let parsed: SkuBody = parse_body("list_vm_skus", item)?;
            let Some(name) = parsed.name.clone() else {
                continue;
            };
            skus.push(sku_info(name, parsed));
        }
        Ok(skus)
    }

    fn get_vnet(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
    ) -> Result<VnetInfo, CloudError> {
        let path = format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.\
             Network/virtualNetworks/{vnet}"
        );
        let body = self.transport.get_json(ctx, &path, API_NETWORK)?;
        let parsed: VnetBody = parse_body("get_vnet", body)?;
        Ok(VnetInfo {
            name: parsed.name.unwrap_or_else(|| vnet.to_string()),
            region: RegionCode::new(require("get_vnet", "location", parsed.location)?),
            subnets: parsed
                .properties
                .map(|props| props.subnets.into_iter().filter_map(|subnet| subnet.name).collect())
                .unwrap_or_default(),
        })
    }

    fn get_subnet(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
        subnet: &str,
    ) -> Result<SubnetInfo, CloudError> {
        let path = format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.\
             Network/virtualNetworks/{vnet}/subnets/{subnet}?$expand=ipConfigurations"
        );
        let body = self.transport.get_json(ctx, &path, API_NETWORK)?;
        let parsed: SubnetBody = parse_body("get_subnet", body)?;
        let properties = require("get_subnet", "properties", parsed.properties)?;
        let address_prefix = match properties.address_prefix {
            Some(prefix) => prefix,
            None => require(
                "get_subnet",
                "addressPrefix",
                properties.address_prefixes.into_iter().next(),
            )?,
        };
        let delegations = properties
            .delegations
            .into_iter()
            .filter_map(|delegation| {
                delegation
                    .properties
                    .and_then(|props| props.service_name)
                    .or(delegation.name)
            })
            .collect();
        Ok(SubnetInfo {
            name: parsed.name.unwrap_or_else(|| subnet.to_string()),
            address_prefix,
            delegations,
            used_ip_count: u32::try_from(properties.ip_configurations.len()).unwrap_or(u32::MAX),
        })
    }

    fn get_storage_account(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        name: &str,
    ) -> Result<StorageAccountInfo, CloudError> {
        let path = format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.\
             Storage/storageAccounts/{name}"
        );
        let body = self.transport.get_json(ctx, &path, API_STORAGE)?;
        let parsed: StorageAccountBody = parse_body("get_storage_account", body)?;
        Ok(StorageAccountInfo {
            name: parsed.name.unwrap_or_else(|| name.to_string()),
            region: RegionCode::new(require("get_storage_account", "location", parsed.location)?),
            kind: parsed.kind,
        })
    }

    fn create_storage_account(
        &self,
        ctx: &CallContext,
        request: &CreateStorageRequest,
    ) -> Result<StorageAccountInfo, CloudError> {
        let path = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
            request.subscription_id, request.resource_group, request.name
        );
        let body = json!({
            "location": request.region.as_str(),
            "sku": { "name": request.sku },
            "kind": "StorageV2",
        });
        tracing::debug!(
            account = %request.name,
            region = %request.region,
            "creating storage account"
        );
        self.transport.put_json(ctx, &path, API_STORAGE, &body)?;
        Ok(StorageAccountInfo {
            name: request.name.clone(),
            region: request.region.clone(),
            kind: Some("StorageV2".to_string()),
        })
    }

    fn get_vcpu_usage(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
        family: &str,
    ) -> Result<QuotaUsage, CloudError> {
        let path = format!(
            "/subscriptions/{subscription}/providers/Microsoft.Compute/locations/{region}/usages"
        );
        let items = self.transport.get_paged(ctx, &path, API_COMPUTE_USAGE)?;
        for item in items {
            let parsed: UsageBody = parse_body("get_vcpu_usage", item)?;
            let name = parsed.name.and_then(|name| name.value).unwrap_or_default();
            if name.eq_ignore_ascii_case(family) {
                return Ok(QuotaUsage {
                    family: name,
                    current: require("get_vcpu_usage", "currentValue", parsed.current_value)?,
                    limit: require("get_vcpu_usage", "limit", parsed.limit)?,
                });
            }
        }
        Err(CloudError::NotFound {
            resource: format!("usage family '{family}' in {region}"),
            request_id: None,
        })
    }

    fn list_migrate_projects(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<Vec<ProjectInfo>, CloudError> {
        let path = format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.\
             Migrate/migrateProjects"
        );
        let items = self.transport.get_paged(ctx, &path, API_MIGRATE)?;
        let mut projects = Vec::with_capacity(items.len());
        for item in items {
            let parsed: MigrateProjectBody = parse_body("list_migrate_projects", item)?;
            let Some(name) = parsed.name else {
                continue;
            };
            let group = parsed
                .id
                .as_deref()
                .and_then(resource_group_of)
                .unwrap_or_else(|| resource_group.as_str().to_string());
            projects.push(ProjectInfo {
                name,
                resource_group: ResourceGroupName::new(group),
                region: RegionCode::new(parsed.location.unwrap_or_default()),
                id: parsed.id,
            });
        }
        Ok(projects)
    }

    fn list_appliances(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<Appliance>, CloudError> {
        match self.list_appliances_direct(ctx, subscription, resource_group) {
            Ok(appliances) if !appliances.is_empty() => Ok(appliances),
            Ok(_) => self.list_appliances_graph(ctx, subscription, resource_group, project),
            Err(err) => {
                tracing::debug!(%err, "direct site listing failed, trying resource graph");
                self.list_appliances_graph(ctx, subscription, resource_group, project)
            }
        }
    }

    fn list_discovered_machines(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<DiscoveredMachine>, CloudError> {
        let path = format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.\
             Migrate/migrateProjects/{project}/machines"
        );
        let items = self.transport.get_paged(ctx, &path, API_MIGRATE)?;
        let mut machines = Vec::with_capacity(items.len());
        for item in items {
            let parsed: MigrateMachineBody = parse_body("list_discovered_machines", item)?;
            machines.push(discovered_machine(parsed));
        }
        Ok(machines)
    }
}

// ============================================================================
// SECTION: Appliance Strategies
// ============================================================================

/// Site resource kinds an appliance can register as.
const SITE_KINDS: [(&str, ApplianceKind); 3] = [
    ("vmwareSites", ApplianceKind::Vmware),
    ("hyperVSites", ApplianceKind::Hyperv),
    ("serverSites", ApplianceKind::Physical),
];

impl ArmCloud {
    /// Direct strategy: list each site kind in the resource group.
    fn list_appliances_direct(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<Vec<Appliance>, CloudError> {
        let mut appliances = Vec::new();
        let mut last_err = None;
        for (kind_path, kind) in SITE_KINDS {
            let path = format!(
                "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/\
                 Microsoft.OffAzure/{kind_path}"
            );
            match self.transport.get_paged(ctx, &path, API_OFF_AZURE) {
                Ok(items) => {
                    for item in items {
                        let parsed: SiteBody = parse_body("list_appliances", item)?;
                        appliances.push(appliance(parsed, Some(kind)));
                    }
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => last_err = Some(err),
            }
        }
        match (appliances.is_empty(), last_err) {
            (true, Some(err)) => Err(err),
            _ => Ok(appliances),
        }
    }

    /// Fallback strategy: query the resource graph for sites whose discovery
    /// solution references the project.
    fn list_appliances_graph(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<Appliance>, CloudError> {
        let query = format!(
            "Resources | where type startswith 'microsoft.offazure/' | where resourceGroup =~ \
             '{resource_group}' | where properties.discoverySolutionId contains '{project}' | \
             project id, name, type, properties"
        );
        let body = json!({
            "subscriptions": [subscription.as_str()],
            "query": query,
        });
        let response = self.transport.post_json(
            ctx,
            "/providers/Microsoft.ResourceGraph/resources",
            API_RESOURCE_GRAPH,
            &body,
        )?;
        let rows = response
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut appliances = Vec::with_capacity(rows.len());
        for row in rows {
            let parsed: SiteBody = parse_body("list_appliances", row)?;
            appliances.push(appliance(parsed, None));
        }
        Ok(appliances)
    }
}

// ============================================================================
// SECTION: View Construction
// ============================================================================

/// Builds a SKU view from its response body.
fn sku_info(name: String, body: SkuBody) -> SkuInfo {
    let capability = |wanted: &str| {
        body.capabilities
            .iter()
            .find(|cap| cap.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(wanted)))
            .and_then(|cap| cap.value.clone())
    };
    let premium_io = capability("PremiumIO").is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let vcpus = capability("vCPUs").and_then(|v| v.parse().ok());
    let deprecated = capability("DeprecationStatus")
        .is_some_and(|v| !v.eq_ignore_ascii_case("none"));
    let zones = body.location_info.iter().flat_map(|info| info.zones.iter().cloned()).collect();
    let restrictions = body
        .restrictions
        .into_iter()
        .map(|restriction| SkuRestriction {
            scope: match restriction.kind.as_deref() {
                Some("Zone") => RestrictionScope::Zone,
                _ => RestrictionScope::Location,
            },
            zones: restriction
                .restriction_info
                .map(|info| info.zones.into_iter().collect())
                .unwrap_or_default(),
            reason: restriction.reason_code,
        })
        .collect();
    SkuInfo {
        name,
        family: body.family,
        vcpus,
        premium_io,
        deprecated,
        zones,
        restrictions,
    }
}

/// Builds an appliance view from a site body.
fn appliance(body: SiteBody, kind: Option<ApplianceKind>) -> Appliance {
    let kind = kind.or_else(|| {
        body.kind.as_deref().and_then(|site_type| {
            let lowered = site_type.to_ascii_lowercase();
            if lowered.contains("vmware") {
                Some(ApplianceKind::Vmware)
            } else if lowered.contains("hyperv") {
                Some(ApplianceKind::Hyperv)
            } else if lowered.contains("serversites") {
                Some(ApplianceKind::Physical)
            } else {
                None
            }
        })
    });
    let properties = body.properties;
    let (heartbeat, version, health) = properties.map_or((None, None, None), |props| {
        let (heartbeat, version) = props
            .agent_details
            .map_or((None, None), |agent| (agent.last_heart_beat_utc, agent.version));
        (heartbeat, version, props.health_status)
    });
    Appliance {
        name: body.name.or(body.id).unwrap_or_default(),
        kind,
        health: health.as_deref().map_or(ApplianceHealth::Unknown, parse_health),
        last_heartbeat: heartbeat.as_deref().and_then(parse_timestamp),
        version,
    }
}

/// Parses a provider health label.
fn parse_health(label: &str) -> ApplianceHealth {
    match label.to_ascii_lowercase().as_str() {
        "healthy" => ApplianceHealth::Healthy,
        "warning" => ApplianceHealth::Warning,
        "unhealthy" => ApplianceHealth::Unhealthy,
        "critical" => ApplianceHealth::Critical,
        _ => ApplianceHealth::Unknown,
    }
}

/// Parses an RFC 3339 timestamp into epoch milliseconds.
fn parse_timestamp(value: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| Timestamp::from_unix_millis(parsed.timestamp_millis()))
}

/// Builds a discovered-machine view, preferring migration data for identity
/// and discovery data for addresses and sizing.
fn discovered_machine(body: MigrateMachineBody) -> DiscoveredMachine {
    let name = body.name.unwrap_or_default();
    let id = body.id.unwrap_or_else(|| name.clone());
    let properties = body.properties;
    let (discovery, migration) = properties
        .map_or((None, None), |props| {
            (props.discovery_data.into_iter().next(), props.migration_data.into_iter().next())
        });

    let display_name = migration
        .as_ref()
        .and_then(|data| data.machine_name.clone())
        .or_else(|| discovery.as_ref().and_then(|data| data.machine_name.clone()));
    let fqdn = discovery.as_ref().and_then(|data| data.fqdn.clone());
    let ip_addresses = match discovery.as_ref().map(|data| data.ip_addresses.clone()) {
        Some(addresses) if !addresses.is_empty() => addresses,
        _ => migration.as_ref().map(|data| data.ip_addresses.clone()).unwrap_or_default(),
    };
    let cores = discovery.as_ref().and_then(|data| data.number_of_processor_core);
    let memory_mb = discovery
        .as_ref()
        .and_then(|data| data.megabytes_of_memory)
        .map(|memory| memory.max(0.0) as u64);
    let replication_state = migration
        .as_ref()
        .map(|data| data.migration_phase.clone().unwrap_or_else(|| "replicating".to_string()));

    DiscoveredMachine {
        id,
        name,
        display_name,
        fqdn,
        ip_addresses,
        cores,
        memory_mb,
        replication_state,
    }
}

/// Extracts the resource group segment from a full resource id.
fn resource_group_of(id: &str) -> Option<String> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().map(ToString::to_string);
        }
    }
    None
}
