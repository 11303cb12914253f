// crates/migrate-preflight-core/src/interfaces/mod.rs
// ============================================================================
// Module: Migrate Preflight Cloud Interfaces
// Description: Backend-agnostic cloud control-plane surface and taxonomy.
// Purpose: Define the contract between the check library and any provider.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The engine never talks to the cloud directly; every provider interaction
//! goes through [`CloudApi`]. Implementations hide pagination, retries,
//! credential plumbing, and response caching behind this typed surface and
//! report failures through the closed [`CloudError`] taxonomy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::cancel::CancelToken;
use crate::core::check::CauseTrace;
use crate::core::decl::ApplianceKind;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::RegionCode;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::ResourceGroupName;
use crate::core::identifiers::RoleDefinitionId;
use crate::core::identifiers::SubscriptionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Call Context
// ============================================================================

/// Context threaded through every cloud call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Cancellation handle for the enclosing scope.
    pub cancel: CancelToken,
}

impl CallContext {
    /// Creates a context carrying the given cancellation handle.
    #[must_use]
    pub const fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
        }
    }
}

// ============================================================================
// SECTION: Failure Taxonomy
// ============================================================================

/// Failures produced by the cloud access layer.
///
/// # Invariants
/// - `Throttled`, `Transient`, and `Network` are post-retry verdicts; the
///   retry budget lives below this surface.
/// - Values are cloneable so a single-flight cache can share one failure
///   with every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudError {
    /// Provider returned 404 for a specific resource request.
    #[error("resource not found: {resource}")]
    NotFound {
        /// Path or name of the missing resource.
        resource: String,
        /// Provider request identifier, when returned.
        request_id: Option<RequestId>,
    },
    /// Provider returned 401 or 403.
    #[error("access forbidden: {scope}")]
    Forbidden {
        /// Scope the caller could not access.
        scope: String,
        /// Provider request identifier, when returned.
        request_id: Option<RequestId>,
    },
    /// Provider throttled the request and the retry budget is exhausted.
    #[error("provider throttled the request")]
    Throttled {
        /// Provider request identifier, when returned.
        request_id: Option<RequestId>,
    },
    /// Provider kept failing transiently after retries.
    #[error("transient provider failure: {reason}")]
    Transient {
        /// Rendered transient cause.
        reason: String,
        /// Provider request identifier, when returned.
        request_id: Option<RequestId>,
    },
    /// Provider response violated the expected schema.
    #[error("malformed provider response: {reason}")]
    Malformed {
        /// What was wrong with the response.
        reason: String,
        /// Provider request identifier, when returned.
        request_id: Option<RequestId>,
    },
    /// Transport-level failure after retries.
    #[error("network failure: {reason}")]
    Network {
        /// Rendered transport cause.
        reason: String,
    },
    /// The call observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

impl CloudError {
    /// Returns the provider request identifier, when one was captured.
    #[must_use]
    pub const fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::NotFound {
                request_id, ..
            }
            | Self::Forbidden {
                request_id, ..
            }
            | Self::Throttled {
                request_id,
            }
            | Self::Transient {
                request_id, ..
            }
            | Self::Malformed {
                request_id, ..
            } => request_id.as_ref(),
            Self::Network {
                ..
            }
            | Self::Cancelled => None,
        }
    }

    /// Returns true for a 404-shaped failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for an auth-shaped failure.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// Builds a diagnostic trail for attaching to an outcome.
    #[must_use]
    pub fn cause_trace(&self) -> CauseTrace {
        CauseTrace {
            request_id: self.request_id().cloned(),
            cause: self.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Resource Views
// ============================================================================

/// Subscription existence and display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Subscription identifier.
    pub id: SubscriptionId,
    /// Display name.
    pub display_name: String,
    /// Provider-reported state, when available.
    #[serde(default)]
    pub state: Option<String>,
}

/// Resource group existence and metadata region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupInfo {
    /// Resource group name.
    pub name: ResourceGroupName,
    /// Region hosting the group's metadata.
    pub region: RegionCode,
}

/// Scope of a SKU restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionScope {
    /// Restriction applies to the whole location.
    Location,
    /// Restriction applies to specific availability zones.
    Zone,
}

/// One active restriction on a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuRestriction {
    /// Restriction scope.
    pub scope: RestrictionScope,
    /// Restricted zones, for zone-scoped restrictions.
    #[serde(default)]
    pub zones: BTreeSet<String>,
    /// Provider reason code, when given.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Machine SKU availability record for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuInfo {
    /// SKU name.
    pub name: String,
    /// SKU quota family, when reported.
    #[serde(default)]
    pub family: Option<String>,
    /// vCPU count, when reported.
    #[serde(default)]
    pub vcpus: Option<u32>,
    /// True when the SKU supports premium storage.
    pub premium_io: bool,
    /// True when the provider marks the SKU deprecated.
    pub deprecated: bool,
    /// Availability zones the SKU is offered in.
    #[serde(default)]
    pub zones: BTreeSet<String>,
    /// Active restrictions.
    #[serde(default)]
    pub restrictions: Vec<SkuRestriction>,
}

impl SkuInfo {
    /// Returns true when a restriction rules the SKU out entirely: a
    /// location-scoped restriction, or zone restrictions covering every
    /// offered zone.
    #[must_use]
    pub fn fully_restricted(&self) -> bool {
        if self.restrictions.iter().any(|r| r.scope == RestrictionScope::Location) {
            return true;
        }
        if self.zones.is_empty() {
            return false;
        }
        let restricted: BTreeSet<&String> = self
            .restrictions
            .iter()
            .filter(|r| r.scope == RestrictionScope::Zone)
            .flat_map(|r| r.zones.iter())
            .collect();
        self.zones.iter().all(|zone| restricted.contains(zone))
    }

    /// Returns true when some but not all offered zones are restricted.
    #[must_use]
    pub fn partially_restricted(&self) -> bool {
        !self.fully_restricted()
            && self
                .restrictions
                .iter()
                .any(|r| r.scope == RestrictionScope::Zone && !r.zones.is_empty())
    }
}

/// Virtual network with its subnet names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnetInfo {
    /// Virtual network name.
    pub name: String,
    /// Region of the network.
    pub region: RegionCode,
    /// Names of the subnets inside the network.
    pub subnets: Vec<String>,
}

/// Subnet address space and occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetInfo {
    /// Subnet name.
    pub name: String,
    /// IPv4 address prefix in CIDR form.
    pub address_prefix: String,
    /// Service delegations attached to the subnet.
    #[serde(default)]
    pub delegations: Vec<String>,
    /// IP configurations currently bound to the subnet.
    pub used_ip_count: u32,
}

/// Storage account existence and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAccountInfo {
    /// Account name.
    pub name: String,
    /// Account region.
    pub region: RegionCode,
    /// Provider account kind, when reported.
    #[serde(default)]
    pub kind: Option<String>,
}

/// Parameters for a gated storage-account creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStorageRequest {
    /// Subscription to create in.
    pub subscription_id: SubscriptionId,
    /// Resource group to create in.
    pub resource_group: ResourceGroupName,
    /// Account name.
    pub name: String,
    /// Region to create in.
    pub region: RegionCode,
    /// Storage SKU name.
    pub sku: String,
}

/// vCPU usage for one quota family in one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Quota family name.
    pub family: String,
    /// Cores currently in use.
    pub current: u32,
    /// Core limit.
    pub limit: u32,
}

/// Migrate project listing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name.
    pub name: String,
    /// Resource group hosting the project.
    pub resource_group: ResourceGroupName,
    /// Project region.
    pub region: RegionCode,
    /// Full provider resource id, when reported.
    #[serde(default)]
    pub id: Option<String>,
}

/// Health classification reported for an appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplianceHealth {
    /// Appliance reports healthy.
    Healthy,
    /// Appliance reports a warning condition.
    Warning,
    /// Appliance reports unhealthy.
    Unhealthy,
    /// Appliance reports a critical condition.
    Critical,
    /// Health was not reported.
    Unknown,
}

impl ApplianceHealth {
    /// Returns the stable label for this health state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Unhealthy => "unhealthy",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

/// Migration appliance registered in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appliance {
    /// Appliance name.
    pub name: String,
    /// Recognized appliance kind, when the provider reports one.
    #[serde(default)]
    pub kind: Option<ApplianceKind>,
    /// Reported health.
    pub health: ApplianceHealth,
    /// Last heartbeat, when reported.
    #[serde(default)]
    pub last_heartbeat: Option<Timestamp>,
    /// Appliance version, when reported.
    #[serde(default)]
    pub version: Option<String>,
}

/// Machine reported into a migrate project by an appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredMachine {
    /// Provider resource id of the discovery record.
    pub id: String,
    /// Record name.
    pub name: String,
    /// Display name from discovery data, when it differs.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Fully qualified domain name, when reported.
    #[serde(default)]
    pub fqdn: Option<String>,
    /// IP addresses reported for the machine.
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    /// CPU core count, when reported.
    #[serde(default)]
    pub cores: Option<u32>,
    /// Memory in MiB, when reported.
    #[serde(default)]
    pub memory_mb: Option<u64>,
    /// Replication state when the machine already has migration data.
    #[serde(default)]
    pub replication_state: Option<String>,
}

impl DiscoveredMachine {
    /// Iterates over every known name field.
    pub fn known_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.display_name.as_deref())
            .chain(self.fqdn.as_deref())
    }

    /// Returns true when any known name equals `name` case-insensitively.
    #[must_use]
    pub fn matches_exact(&self, name: &str) -> bool {
        self.known_names().any(|known| known.eq_ignore_ascii_case(name))
    }

    /// Returns true when any known name contains `needle` case-insensitively.
    #[must_use]
    pub fn matches_substring(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.known_names().any(|known| known.to_ascii_lowercase().contains(&needle))
    }
}

// ============================================================================
// SECTION: Credential Capability
// ============================================================================

/// Bearer token issued by the external credential provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    /// Opaque token value.
    pub token: String,
    /// Expiry, when the provider reports one.
    pub expires_at: Option<Timestamp>,
}

/// Opaque credential capability consumed by live cloud implementations.
///
/// Acquisition and refresh are the caller's responsibility; the access layer
/// only reads tokens.
pub trait TokenSource: Send + Sync {
    /// Returns a bearer token for the management control plane.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when a token cannot be produced.
    fn bearer_token(&self) -> Result<BearerToken, CloudError>;
}

// ============================================================================
// SECTION: Cloud API
// ============================================================================

/// Typed, read-mostly surface over the cloud control plane.
///
/// Implementations must be safe for concurrent use; orchestrators call them
/// from multiple worker threads.
pub trait CloudApi: Send + Sync {
    /// Resolves a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::NotFound`] when the subscription does not exist
    /// or is not visible to the caller.
    fn get_subscription(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<SubscriptionInfo, CloudError>;

    /// Lists role definition ids assigned to a principal at a scope.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the assignment listing fails.
    fn list_role_assignments(
        &self,
        ctx: &CallContext,
        scope: &str,
        principal: &PrincipalId,
    ) -> Result<BTreeSet<RoleDefinitionId>, CloudError>;

    /// Resolves a resource group.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::NotFound`] when the group does not exist.
    fn get_resource_group(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<ResourceGroupInfo, CloudError>;

    /// Lists region codes available to a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the listing fails.
    fn list_locations(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
    ) -> Result<BTreeSet<RegionCode>, CloudError>;

    /// Lists machine SKUs offered in a region.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the listing fails.
    fn list_vm_skus(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
    ) -> Result<Vec<SkuInfo>, CloudError>;

    /// Resolves a virtual network.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::NotFound`] when the network does not exist.
    fn get_vnet(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
    ) -> Result<VnetInfo, CloudError>;

    /// Resolves a subnet inside a virtual network.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::NotFound`] when the subnet does not exist.
    fn get_subnet(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        vnet: &str,
        subnet: &str,
    ) -> Result<SubnetInfo, CloudError>;

    /// Resolves a storage account.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::NotFound`] when the account does not exist.
    fn get_storage_account(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        name: &str,
    ) -> Result<StorageAccountInfo, CloudError>;

    /// Creates a storage account. Only invoked when auto-creation is
    /// explicitly enabled; this is the engine's only mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when creation fails.
    fn create_storage_account(
        &self,
        ctx: &CallContext,
        request: &CreateStorageRequest,
    ) -> Result<StorageAccountInfo, CloudError>;

    /// Returns vCPU usage for a quota family in a region.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when usage cannot be read.
    fn get_vcpu_usage(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        region: &RegionCode,
        family: &str,
    ) -> Result<QuotaUsage, CloudError>;

    /// Lists migrate projects in a resource group.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the listing fails.
    fn list_migrate_projects(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
    ) -> Result<Vec<ProjectInfo>, CloudError>;

    /// Lists appliances registered to a migrate project.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when both listing strategies fail.
    fn list_appliances(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<Appliance>, CloudError>;

    /// Lists machines discovered into a migrate project.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the listing fails.
    fn list_discovered_machines(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
    ) -> Result<Vec<DiscoveredMachine>, CloudError>;

    /// Searches the discovered-machine list for substring name matches.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] when the underlying listing fails.
    fn search_discovered_by_name(
        &self,
        ctx: &CallContext,
        subscription: &SubscriptionId,
        resource_group: &ResourceGroupName,
        project: &str,
        name: &str,
    ) -> Result<Vec<DiscoveredMachine>, CloudError> {
        let machines = self.list_discovered_machines(ctx, subscription, resource_group, project)?;
        Ok(machines.into_iter().filter(|machine| machine.matches_substring(name)).collect())
    }
}
