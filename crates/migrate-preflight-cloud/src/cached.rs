// crates/migrate-preflight-cloud/src/cached.rs
// ============================================================================
// Module: Cached Cloud Wrapper
// Description: Response-caching decorator over any cloud implementation.
// Purpose: Apply the per-run cache to the hot listing operations.
// Dependencies: migrate-preflight-core, crate::cache
// ============================================================================

//! ## Overview
//! `CachedCloud` caches the four listing operations whose results are hot
//! across scopes (locations, SKUs, appliances, discovered machines) and
//! delegates everything else untouched. Point lookups stay uncached; their
//! answers feed directly into one outcome each.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use migrate_preflight_core::Appliance;
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

use crate::cache::CacheKey;
use crate::cache::CacheValue;
use crate::cache::ResponseCache;

// ============================================================================
// SECTION: Wrapper
// ============================================================================

/// Caching decorator over a cloud implementation.
#[derive(Debug)]
pub struct CachedCloud<C> {
    inner: C,
    cache: ResponseCache,
}

impl<C: CloudApi> CachedCloud<C> {
    /// Wraps an implementation with a fresh per-run cache.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(),
        }
    }

    /// Returns the wrapped implementation.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

/// Rejects a cache value of the wrong variant.
///
/// Key and value variants correspond one-to-one, so a mismatch means cache
/// corruption rather than a provider fault.
fn variant_mismatch(operation: &str) -> CloudError {
    CloudError::Malformed {
        reason: format!("cache returned a mismatched variant for {operation}"),
        request_id: None,
    }
}

impl<C: CloudApi> CloudApi for CachedCloud<C> {
    fn get_subscription(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<SubscriptionInfo, CloudError> {
        self.inner.get_subscription(ctx, subscription)
    }

    fn list_role_assignments(
        &self,
        ctx: &CallContext,
        scope: &str,
        principal: &PrincipalId,
    ) -> Result<BTreeSet<RoleDefinitionId>, CloudError> {
        self.inner.list_role_assignments(ctx, scope, principal)
    }

    fn get_resource_group(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<ResourceGroupInfo, CloudError> {
        self.inner.get_resource_group(ctx, subscription, resource_group)
    }

    fn list_locations(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<BTreeSet<RegionCode>, CloudError> {
        let key = CacheKey::Locations {
            subscription: subscription.clone(),
        };
        let value = self.cache.get_or_fetch(key, || {
            self.inner.list_locations(ctx, subscription).map(CacheValue::Locations)
        })?;
        match value {
            CacheValue::Locations(locations) => Ok(locations),
            _ => Err(variant_mismatch("list_locations")),
        }
    }

    fn list_vm_skus(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
    ) -> Result<Vec<SkuInfo>, CloudError> {
        let key = CacheKey::VmSkus {
            subscription: subscription.clone(),
            region: region.clone(),
        };
        let value = self.cache.get_or_fetch(key, || {
            self.inner.list_vm_skus(ctx, subscription, region).map(CacheValue::VmSkus)
        })?;
        match value {
            CacheValue::VmSkus(skus) => Ok(skus),
            _ => Err(variant_mismatch("list_vm_skus")),
        }
    }

    fn get_vnet(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
    ) -> Result<VnetInfo, CloudError> {
        self.inner.get_vnet(ctx, subscription, resource_group, vnet)
    }

    fn get_subnet(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
        subnet: &str,
    ) -> Result<SubnetInfo, CloudError> {
        self.inner.get_subnet(ctx, subscription, resource_group, vnet, subnet)
    }

    fn get_storage_account(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        name: &str,
    ) -> Result<StorageAccountInfo, CloudError> {
        self.inner.get_storage_account(ctx, subscription, resource_group, name)
    }

    fn create_storage_account(
        &self,
        ctx: &CallContext,
        request: &CreateStorageRequest,
    ) -> Result<StorageAccountInfo, CloudError> {
        self.inner.create_storage_account(ctx, request)
    }

    fn get_vcpu_usage(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
        family: &str,
    ) -> Result<QuotaUsage, CloudError> {
        self.inner.get_vcpu_usage(ctx, subscription, region, family)
    }

    fn list_migrate_projects(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<Vec<ProjectInfo>, CloudError> {
        self.inner.list_migrate_projects(ctx, subscription, resource_group)
    }

    fn list_appliances(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<Appliance>, CloudError> {
        let key = CacheKey::Appliances {
            subscription: subscription.clone(),
            resource_group: resource_group.clone(),
            project: project.to_string(),
        };
        let value = self.cache.get_or_fetch(key, || {
            self.inner
                .list_appliances(ctx, subscription, resource_group, project)
                .map(CacheValue::Appliances)
        })?;
        match value {
            CacheValue::Appliances(appliances) => Ok(appliances),
            _ => Err(variant_mismatch("list_appliances")),
        }
    }

    fn list_discovered_machines(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<DiscoveredMachine>, CloudError> {
        let key = CacheKey::DiscoveredMachines {
            subscription: subscription.clone(),
            resource_group: resource_group.clone(),
            project: project.to_string(),
        };
        let value = self.cache.get_or_fetch(key, || {
            self.inner
                .list_discovered_machines(ctx, subscription, resource_group, project)
                .map(CacheValue::DiscoveredMachines)
        })?;
        match value {
            CacheValue::DiscoveredMachines(machines) => Ok(machines),
            _ => Err(variant_mismatch("list_discovered_machines")),
        }
    }
}
