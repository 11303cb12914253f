// crates/migrate-preflight-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Scripted cloud stub and baseline declarations for tests.
// ============================================================================
//! ## Overview
//! `StubCloud` is a deterministic, scriptable stand-in for the cloud access
//! layer: tests populate its maps, optionally inject per-operation failures,
//! and assert on the recorded call log.

#![allow(dead_code, reason = "Each integration test binary uses a subset of the fixtures.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::PoisonError;

use migrate_preflight_core::Appliance;
use migrate_preflight_core::ApplianceHealth;
use migrate_preflight_core::ApplianceKind;
use migrate_preflight_core::CONTRIBUTOR_ROLE_ID;
use migrate_preflight_core::CallContext;
use migrate_preflight_core::CancelToken;
use migrate_preflight_core::CloudApi;
use migrate_preflight_core::CloudError;
use migrate_preflight_core::CreateStorageRequest;
use migrate_preflight_core::DiscoveredMachine;
use migrate_preflight_core::DiskKind;
use migrate_preflight_core::MachineDecl;
use migrate_preflight_core::PrincipalId;
use migrate_preflight_core::ProjectDecl;
use migrate_preflight_core::ProjectInfo;
use migrate_preflight_core::QuotaUsage;
use migrate_preflight_core::RegionCode;
use migrate_preflight_core::ResourceGroupInfo;
use migrate_preflight_core::ResourceGroupName;
use migrate_preflight_core::RoleDefinitionId;
use migrate_preflight_core::SkuInfo;
use migrate_preflight_core::StorageAccountInfo;
use migrate_preflight_core::SubnetInfo;
use migrate_preflight_core::SubscriptionId;
use migrate_preflight_core::SubscriptionInfo;
use migrate_preflight_core::Timestamp;
use migrate_preflight_core::VnetInfo;
use migrate_preflight_core::runtime::RunContext;

/// Fixed run start used by orchestrator-level tests.
pub const TEST_NOW_MS: i64 = 1_700_000_000_000;

// ============================================================================
// SECTION: Stub Cloud
// ============================================================================

/// Scripted in-memory cloud.
#[derive(Default)]
pub struct StubCloud {
    pub subscriptions: BTreeMap<String, SubscriptionInfo>,
    /// Role sets keyed by scope path.
    pub role_assignments: BTreeMap<String, BTreeSet<RoleDefinitionId>>,
    pub resource_groups: BTreeMap<(String, String), ResourceGroupInfo>,
    pub locations: BTreeMap<String, BTreeSet<RegionCode>>,
    pub skus: BTreeMap<(String, String), Vec<SkuInfo>>,
    pub vnets: BTreeMap<(String, String, String), VnetInfo>,
    pub subnets: BTreeMap<(String, String, String, String), SubnetInfo>,
    pub storage_accounts: BTreeMap<(String, String, String), StorageAccountInfo>,
    pub quota: BTreeMap<(String, String, String), QuotaUsage>,
    pub projects: BTreeMap<(String, String), Vec<ProjectInfo>>,
    pub appliances: BTreeMap<(String, String, String), Vec<Appliance>>,
    pub discovered: BTreeMap<(String, String, String), Vec<DiscoveredMachine>>,
    /// Persistent per-operation failures, keyed by operation name.
    pub errors: BTreeMap<String, CloudError>,
    /// Fail storage creation instead of recording it.
    pub fail_create: bool,
    /// Call log: `operation:scope` entries in call order.
    pub calls: Mutex<Vec<String>>,
    /// Accounts created through the auto-create path.
    pub created: Mutex<Vec<String>>,
}

impl StubCloud {
    fn record(&self, operation: &str, scope: &str) -> Result<(), CloudError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{operation}:{scope}"));
        match self.errors.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Returns the number of recorded calls for an operation.
    pub fn call_count(&self, operation: &str) -> usize {
        let prefix = format!("{operation}:");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .count()
    }

    fn not_found(resource: impl Into<String>) -> CloudError {
        CloudError::NotFound {
            resource: resource.into(),
            request_id: None,
        }
    }
}

impl CloudApi for StubCloud {
    fn get_subscription(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<SubscriptionInfo, CloudError> {
        self.record("get_subscription", subscription.as_str())?;
        self.subscriptions
            .get(subscription.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found(subscription.as_str()))
    }

    fn list_role_assignments(
        &self,
        _ctx: &CallContext,
        scope: &str,
        _principal: &PrincipalId,
    ) -> Result<BTreeSet<RoleDefinitionId>, CloudError> {
        self.record("list_role_assignments", scope)?;
        Ok(self.role_assignments.get(scope).cloned().unwrap_or_default())
    }

    fn get_resource_group(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<ResourceGroupInfo, CloudError> {
        self.record("get_resource_group", resource_group.as_str())?;
        self.resource_groups
            .get(&(subscription.as_str().to_string(), resource_group.as_str().to_string()))
            .cloned()
            .ok_or_else(|| Self::not_found(resource_group.as_str()))
    }

    fn list_locations(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<BTreeSet<RegionCode>, CloudError> {
        self.record("list_locations", subscription.as_str())?;
        Ok(self.locations.get(subscription.as_str()).cloned().unwrap_or_default())
    }

    fn list_vm_skus(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
    ) -> Result<Vec<SkuInfo>, CloudError> {
        self.record("list_vm_skus", region.as_str())?;
        Ok(self
            .skus
            .get(&(subscription.as_str().to_string(), region.as_str().to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn get_vnet(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
    ) -> Result<VnetInfo, CloudError> {
        self.record("get_vnet", vnet)?;
        self.vnets
            .get(&(
                subscription.as_str().to_string(),
                resource_group.as_str().to_string(),
                vnet.to_string(),
            ))
            .cloned()
            .ok_or_else(|| Self::not_found(vnet))
    }

    fn get_subnet(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
        subnet: &str,
    ) -> Result<SubnetInfo, CloudError> {
        self.record("get_subnet", subnet)?;
        self.subnets
            .get(&(
                subscription.as_str().to_string(),
                resource_group.as_str().to_string(),
                vnet.to_string(),
                subnet.to_string(),
            ))
            .cloned()
            .ok_or_else(|| Self::not_found(subnet))
    }

    fn get_storage_account(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        name: &str,
    ) -> Result<StorageAccountInfo, CloudError> {
        self.record("get_storage_account", name)?;
        let key = (
            subscription.as_str().to_string(),
            resource_group.as_str().to_string(),
            name.to_string(),
        );
        let created = self
            .created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&name.to_string());
        match self.storage_accounts.get(&key) {
            Some(account) => Ok(account.clone()),
            None if created => Ok(StorageAccountInfo {
                name: name.to_string(),
                region: RegionCode::new("eastus"),
                kind: Some("StorageV2".to_string()),
            }),
            None => Err(Self::not_found(name)),
        }
    }

    fn create_storage_account(
        &self,
        _ctx: &CallContext,
        request: &CreateStorageRequest,
    ) -> Result<StorageAccountInfo, CloudError> {
        self.record("create_storage_account", &request.name)?;
        if self.fail_create {
            return Err(CloudError::Forbidden {
                scope: request.name.clone(),
                request_id: None,
            });
        }
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.name.clone());
        Ok(StorageAccountInfo {
            name: request.name.clone(),
            region: request.region.clone(),
            kind: Some("StorageV2".to_string()),
        })
    }

    fn get_vcpu_usage(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
        family: &str,
    ) -> Result<QuotaUsage, CloudError> {
        self.record("get_vcpu_usage", family)?;
        self.quota
            .get(&(
                subscription.as_str().to_string(),
                region.as_str().to_string(),
                family.to_string(),
            ))
            .cloned()
            .ok_or_else(|| Self::not_found(family))
    }

    fn list_migrate_projects(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<Vec<ProjectInfo>, CloudError> {
        self.record("list_migrate_projects", resource_group.as_str())?;
        Ok(self
            .projects
            .get(&(subscription.as_str().to_string(), resource_group.as_str().to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn list_appliances(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<Appliance>, CloudError> {
        self.record("list_appliances", project)?;
        Ok(self
            .appliances
            .get(&(
                subscription.as_str().to_string(),
                resource_group.as_str().to_string(),
                project.to_string(),
            ))
            .cloned()
            .unwrap_or_default())
    }

    fn list_discovered_machines(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<DiscoveredMachine>, CloudError> {
        self.record("list_discovered_machines", project)?;
        Ok(self
            .discovered
            .get(&(
                subscription.as_str().to_string(),
                resource_group.as_str().to_string(),
                project.to_string(),
            ))
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Baseline Declarations
// ============================================================================

/// Baseline project declaration: project `P` in `S1`/`rg-a`, eastus.
pub fn project_decl() -> ProjectDecl {
    ProjectDecl {
        subscription_id: SubscriptionId::new("S1"),
        resource_group: ResourceGroupName::new("rg-a"),
        project_name: "P".to_string(),
        region: RegionCode::new("eastus"),
        appliance_name: "A".to_string(),
        appliance_kind: ApplianceKind::Vmware,
        cache_storage_account: "cs1".to_string(),
        cache_storage_resource_group: ResourceGroupName::new("rg-a"),
        recovery_vault_name: None,
    }
}

/// Baseline machine declaration: `web01` targeting `rg-b` in eastus.
pub fn machine_decl() -> MachineDecl {
    MachineDecl {
        source_name: Some("web01".to_string()),
        target_name: "web01".to_string(),
        target_region: RegionCode::new("eastus"),
        target_subscription: SubscriptionId::new("S1"),
        target_resource_group: ResourceGroupName::new("rg-b"),
        target_vnet: "v".to_string(),
        target_subnet: "s".to_string(),
        target_sku: "std_d2".to_string(),
        target_disk_type: DiskKind::PremiumLrs,
        project_key: Some(project_decl().key()),
    }
}

/// Scope path of the baseline migrate project.
pub fn project_scope_path() -> String {
    "/subscriptions/S1/resourceGroups/rg-a/providers/Microsoft.Migrate/migrateProjects/P"
        .to_string()
}

/// Scope path of the baseline target resource group.
pub fn target_rg_scope_path() -> String {
    "/subscriptions/S1/resourceGroups/rg-b".to_string()
}

/// A healthy appliance record named `A`, heartbeat one hour before `now`.
pub fn healthy_appliance(now: Timestamp) -> Appliance {
    Appliance {
        name: "A".to_string(),
        kind: Some(ApplianceKind::Vmware),
        health: ApplianceHealth::Healthy,
        last_heartbeat: Some(Timestamp::from_unix_millis(now.as_unix_millis() - 3_600_000)),
        version: Some("9.1".to_string()),
    }
}

/// The `std_d2` SKU: 2 vCPUs, premium-capable, three zones.
pub fn std_d2() -> SkuInfo {
    SkuInfo {
        name: "std_d2".to_string(),
        family: Some("standardDSv3Family".to_string()),
        vcpus: Some(2),
        premium_io: true,
        deprecated: false,
        zones: ["1", "2", "3"].iter().map(ToString::to_string).collect(),
        restrictions: Vec::new(),
    }
}

/// The discovery record for `web01`.
pub fn web01_record() -> DiscoveredMachine {
    DiscoveredMachine {
        id: "machines/web01".to_string(),
        name: "web01".to_string(),
        display_name: Some("web01".to_string()),
        fqdn: Some("web01.corp.example".to_string()),
        ip_addresses: vec!["10.1.2.10".to_string()],
        cores: Some(2),
        memory_mb: Some(8_192),
        replication_state: None,
    }
}

/// Builds the fully healthy world for the baseline declarations.
pub fn healthy_cloud(now: Timestamp) -> StubCloud {
    let contributor: BTreeSet<RoleDefinitionId> =
        [RoleDefinitionId::new(CONTRIBUTOR_ROLE_ID)].into_iter().collect();

    let mut cloud = StubCloud::default();
    cloud.subscriptions.insert(
        "S1".to_string(),
        SubscriptionInfo {
            id: SubscriptionId::new("S1"),
            display_name: "Subscription One".to_string(),
            state: Some("Enabled".to_string()),
        },
    );
    cloud.role_assignments.insert(project_scope_path(), contributor.clone());
    cloud.role_assignments.insert(target_rg_scope_path(), contributor);
    cloud.resource_groups.insert(
        ("S1".to_string(), "rg-b".to_string()),
        ResourceGroupInfo {
            name: ResourceGroupName::new("rg-b"),
            region: RegionCode::new("eastus"),
        },
    );
    cloud
        .locations
        .insert("S1".to_string(), [RegionCode::new("eastus")].into_iter().collect());
    cloud.skus.insert(("S1".to_string(), "eastus".to_string()), vec![std_d2()]);
    cloud.vnets.insert(
        ("S1".to_string(), "rg-b".to_string(), "v".to_string()),
        VnetInfo {
            name: "v".to_string(),
            region: RegionCode::new("eastus"),
            subnets: vec!["s".to_string()],
        },
    );
    cloud.subnets.insert(
        ("S1".to_string(), "rg-b".to_string(), "v".to_string(), "s".to_string()),
        SubnetInfo {
            name: "s".to_string(),
            address_prefix: "10.1.2.0/24".to_string(),
            delegations: Vec::new(),
            used_ip_count: 10,
        },
    );
    cloud.storage_accounts.insert(
        ("S1".to_string(), "rg-a".to_string(), "cs1".to_string()),
        StorageAccountInfo {
            name: "cs1".to_string(),
            region: RegionCode::new("eastus"),
            kind: Some("StorageV2".to_string()),
        },
    );
    cloud.quota.insert(
        ("S1".to_string(), "eastus".to_string(), "standardDSv3Family".to_string()),
        QuotaUsage {
            family: "standardDSv3Family".to_string(),
            current: 100,
            limit: 200,
        },
    );
    cloud.appliances.insert(
        ("S1".to_string(), "rg-a".to_string(), "P".to_string()),
        vec![healthy_appliance(now)],
    );
    cloud
        .discovered
        .insert(("S1".to_string(), "rg-a".to_string(), "P".to_string()), vec![web01_record()]);
    cloud.projects.insert(
        ("S1".to_string(), "rg-a".to_string()),
        vec![ProjectInfo {
            name: "P".to_string(),
            resource_group: ResourceGroupName::new("rg-a"),
            region: RegionCode::new("eastus"),
            id: Some(
                "/subscriptions/S1/resourceGroups/rg-a/providers/Microsoft.Migrate/\
                 migrateProjects/P"
                    .to_string(),
            ),
        }],
    );
    cloud
}

/// Run context with the fixed test clock.
pub fn run_context() -> RunContext {
    RunContext {
        principal: PrincipalId::new("user-1"),
        now: Timestamp::from_unix_millis(TEST_NOW_MS),
        cancel: CancelToken::new(),
    }
}
