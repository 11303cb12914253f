// crates/migrate-preflight-cloud/tests/common/mod.rs
// ============================================================================
// Module: Shared Cloud Test Fixtures
// Description: Counting inner client for cache and wrapper tests.
// ============================================================================
//! ## Overview
//! `CountingCloud` answers every operation from small fixed fixtures while
//! counting upstream invocations, so tests can assert single-flight and
//! delegation behavior precisely.

#![allow(dead_code, reason = "Each integration test binary uses a subset of the fixtures.")]

use std::collections::BTreeSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use migrate_preflight_core::Appliance;
use migrate_preflight_core::ApplianceHealth;
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
use migrate_preflight_core::RoleDefinitionId;
use migrate_preflight_core::SkuInfo;
use migrate_preflight_core::StorageAccountInfo;
use migrate_preflight_core::SubnetInfo;
use migrate_preflight_core::SubscriptionId;
use migrate_preflight_core::SubscriptionInfo;
use migrate_preflight_core::VnetInfo;

/// Inner client that counts upstream calls per cached operation.
#[derive(Default)]
pub struct CountingCloud {
    pub locations_calls: AtomicUsize,
    pub sku_calls: AtomicUsize,
    pub appliance_calls: AtomicUsize,
    pub machine_calls: AtomicUsize,
    /// When set, the listed operation fails this many times before
    /// succeeding.
    pub machine_failures: AtomicUsize,
    /// Artificial delay inside the machine listing, in milliseconds, to
    /// widen the single-flight race window.
    pub machine_delay_ms: u64,
}

impl CountingCloud {
    pub fn machines() -> Vec<DiscoveredMachine> {
        vec![DiscoveredMachine {
            id: "machines/web01".to_string(),
            name: "web01".to_string(),
            display_name: Some("web01".to_string()),
            fqdn: None,
            ip_addresses: vec!["10.1.2.10".to_string()],
            cores: Some(2),
            memory_mb: Some(4_096),
            replication_state: None,
        }]
    }
}

impl CloudApi for CountingCloud {
    fn get_subscription(
        &self,
        _ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<SubscriptionInfo, CloudError> {
        Ok(SubscriptionInfo {
            id: subscription.clone(),
            display_name: "stub".to_string(),
            state: None,
        })
    }

    fn list_role_assignments(
        &self,
        _ctx: &CallContext,
        _scope: &str,
        _principal: &PrincipalId,
    ) -> Result<BTreeSet<RoleDefinitionId>, CloudError> {
        Ok([RoleDefinitionId::new(migrate_preflight_core::CONTRIBUTOR_ROLE_ID)]
            .into_iter()
            .collect())
    }

    fn get_resource_group(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<ResourceGroupInfo, CloudError> {
        Ok(ResourceGroupInfo {
            name: resource_group.clone(),
            region: RegionCode::new("eastus"),
        })
    }

    fn list_locations(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
    ) -> Result<BTreeSet<RegionCode>, CloudError> {
        self.locations_calls.fetch_add(1, Ordering::SeqCst);
        Ok([RegionCode::new("eastus"), RegionCode::new("westus")].into_iter().collect())
    }

    fn list_vm_skus(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _region: &RegionCode,
    ) -> Result<Vec<SkuInfo>, CloudError> {
        self.sku_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn get_vnet(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _resource_group: &ResourceGroupName,
        vnet: &str,
    ) -> Result<VnetInfo, CloudError> {
        Ok(VnetInfo {
            name: vnet.to_string(),
            region: RegionCode::new("eastus"),
            subnets: Vec::new(),
        })
    }

    fn get_subnet(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _resource_group: &ResourceGroupName,
        _vnet: &str,
        subnet: &str,
    ) -> Result<SubnetInfo, CloudError> {
        Ok(SubnetInfo {
            name: subnet.to_string(),
            address_prefix: "10.1.2.0/24".to_string(),
            delegations: Vec::new(),
            used_ip_count: 0,
        })
    }

    fn get_storage_account(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _resource_group: &ResourceGroupName,
        name: &str,
    ) -> Result<StorageAccountInfo, CloudError> {
        Ok(StorageAccountInfo {
            name: name.to_string(),
            region: RegionCode::new("eastus"),
            kind: None,
        })
    }

    fn create_storage_account(
        &self,
        _ctx: &CallContext,
        request: &CreateStorageRequest,
    ) -> Result<StorageAccountInfo, CloudError> {
        Ok(StorageAccountInfo {
            name: request.name.clone(),
            region: request.region.clone(),
            kind: None,
        })
    }

    fn get_vcpu_usage(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _region: &RegionCode,
        family: &str,
    ) -> Result<QuotaUsage, CloudError> {
        Ok(QuotaUsage {
            family: family.to_string(),
            current: 0,
            limit: 100,
        })
    }

    fn list_migrate_projects(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _resource_group: &ResourceGroupName,
    ) -> Result<Vec<ProjectInfo>, CloudError> {
        Ok(Vec::new())
    }

    fn list_appliances(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _resource_group: &ResourceGroupName,
        _project: &str,
    ) -> Result<Vec<Appliance>, CloudError> {
        self.appliance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Appliance {
            name: "A".to_string(),
            kind: None,
            health: ApplianceHealth::Healthy,
            last_heartbeat: None,
            version: None,
        }])
    }

    fn list_discovered_machines(
        &self,
        _ctx: &CallContext,
        _subscription: &SubscriptionId,
        _resource_group: &ResourceGroupName,
        _project: &str,
    ) -> Result<Vec<DiscoveredMachine>, CloudError> {
        self.machine_calls.fetch_add(1, Ordering::SeqCst);
        if self.machine_delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(self.machine_delay_ms));
        }
        let remaining = self
            .machine_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |failures| {
                failures.checked_sub(1)
            });
        if remaining.is_ok() {
            return Err(CloudError::Transient {
                reason: "listing failed".to_string(),
                request_id: None,
            });
        }
        Ok(Self::machines())
    }
}
