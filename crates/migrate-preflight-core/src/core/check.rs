// crates/migrate-preflight-core/src/core/check.rs
// ============================================================================
// Module: Migrate Preflight Check Catalogue
// Description: Closed check identifiers, severities, and per-check outcomes.
// Purpose: Provide the stable vocabulary shared by both validation tiers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The check catalogue is a closed set: every check the engine can run has a
//! [`CheckId`] here, and both tiers evaluate their checks in the canonical
//! orders defined below. Synthetic outcomes (skips, input errors, duplicate
//! conflicts, cancellation) use [`CheckRef`] markers so report consumers can
//! distinguish them from real check verdicts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RequestId;

// ============================================================================
// SECTION: Check Identifiers
// ============================================================================

/// Identifier of a single validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckId {
    /// Principal holds a required role on the migrate project.
    #[serde(rename = "access.rbac.migrate_project")]
    AccessRbacMigrateProject,
    /// Declared appliance exists, matches its kind, and heartbeats recently.
    #[serde(rename = "appliance.health")]
    ApplianceHealth,
    /// Cache storage account exists (or is auto-created) in the right region.
    #[serde(rename = "storage.cache")]
    StorageCache,
    /// Declared machines fit within the remaining vCPU quota.
    #[serde(rename = "quota.vcpu")]
    QuotaVcpu,
    /// Target region exists for the target subscription.
    #[serde(rename = "server.region")]
    ServerRegion,
    /// Target resource group exists.
    #[serde(rename = "server.resource_group")]
    ServerResourceGroup,
    /// Target vnet/subnet exist, are undelegated, and have free addresses.
    #[serde(rename = "server.vnet_subnet")]
    ServerVnetSubnet,
    /// Target SKU is available and unrestricted in the target region.
    #[serde(rename = "server.sku")]
    ServerSku,
    /// Target disk kind is supported by the SKU in the target region.
    #[serde(rename = "server.disk_type")]
    ServerDiskType,
    /// Machine is discovered exactly once in the migrate project.
    #[serde(rename = "server.discovery")]
    ServerDiscovery,
    /// Principal holds a required role on the target resource group.
    #[serde(rename = "server.rbac.rg")]
    ServerRbacRg,
}

/// Canonical tier-1 (landing zone) evaluation order. Access checks come
/// first so a critical access failure can short-circuit the scope.
pub const TIER1_ORDER: [CheckId; 4] = [
    CheckId::AccessRbacMigrateProject,
    CheckId::ApplianceHealth,
    CheckId::StorageCache,
    CheckId::QuotaVcpu,
];

/// Canonical tier-2 (servers) evaluation order.
pub const TIER2_ORDER: [CheckId; 7] = [
    CheckId::ServerRegion,
    CheckId::ServerResourceGroup,
    CheckId::ServerVnetSubnet,
    CheckId::ServerSku,
    CheckId::ServerDiskType,
    CheckId::ServerDiscovery,
    CheckId::ServerRbacRg,
];

impl CheckId {
    /// Returns the dotted string form of the identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccessRbacMigrateProject => "access.rbac.migrate_project",
            Self::ApplianceHealth => "appliance.health",
            Self::StorageCache => "storage.cache",
            Self::QuotaVcpu => "quota.vcpu",
            Self::ServerRegion => "server.region",
            Self::ServerResourceGroup => "server.resource_group",
            Self::ServerVnetSubnet => "server.vnet_subnet",
            Self::ServerSku => "server.sku",
            Self::ServerDiskType => "server.disk_type",
            Self::ServerDiscovery => "server.discovery",
            Self::ServerRbacRg => "server.rbac.rg",
        }
    }

    /// Parses a dotted check identifier.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        TIER1_ORDER
            .iter()
            .chain(TIER2_ORDER.iter())
            .copied()
            .find(|check| check.as_str() == value)
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Classification of a single check's result.
///
/// # Invariants
/// - Variant order is the escalation order; scope roll-up is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Check passed.
    Ok,
    /// Check passed with a caveat worth surfacing.
    Warning,
    /// Check failed; the entity is not provisionable as declared.
    Failure,
    /// Check failed in a way that invalidates the rest of the scope.
    Critical,
}

impl Severity {
    /// Returns the stable label for this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Failure => "failure",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Check References
// ============================================================================

/// Reference from an outcome to its origin: a real check or a synthetic
/// marker emitted by the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckRef {
    /// Outcome produced by a real check.
    Check(CheckId),
    /// Remaining check skipped after a critical failure in the same scope.
    Skipped,
    /// Declaration failed input validation.
    Input,
    /// Duplicate project declarations disagreed on a field.
    Conflict,
    /// Scope was cancelled before or during execution.
    Cancelled,
}

impl CheckRef {
    /// Returns the string form used in serialized reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Check(id) => id.as_str(),
            Self::Skipped => "__skipped__",
            Self::Input => "__input__",
            Self::Conflict => "__conflict__",
            Self::Cancelled => "__cancelled__",
        }
    }

    /// Parses the serialized string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "__skipped__" => Some(Self::Skipped),
            "__input__" => Some(Self::Input),
            "__conflict__" => Some(Self::Conflict),
            "__cancelled__" => Some(Self::Cancelled),
            other => CheckId::parse(other).map(Self::Check),
        }
    }
}

impl fmt::Display for CheckRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CheckRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CheckRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown check reference: {value}")))
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Diagnostic trail for a provider-originated failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseTrace {
    /// Provider request identifier, when the provider returned one.
    pub request_id: Option<RequestId>,
    /// Rendered originating cause.
    pub cause: String,
}

/// Result of a single check (or synthetic orchestration event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Originating check or synthetic marker.
    pub check: CheckRef,
    /// Outcome severity.
    pub severity: Severity,
    /// One-line human-readable summary.
    pub summary: String,
    /// Optional longer detail.
    #[serde(default)]
    pub detail: Option<String>,
    /// Optional provider diagnostic trail.
    #[serde(default)]
    pub cause_trace: Option<CauseTrace>,
}

impl CheckOutcome {
    /// Creates an outcome with the given severity.
    #[must_use]
    pub fn new(check: CheckRef, severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            check,
            severity,
            summary: summary.into(),
            detail: None,
            cause_trace: None,
        }
    }

    /// Creates a passing outcome for a check.
    #[must_use]
    pub fn ok(check: CheckId, summary: impl Into<String>) -> Self {
        Self::new(CheckRef::Check(check), Severity::Ok, summary)
    }

    /// Creates a warning outcome for a check.
    #[must_use]
    pub fn warning(check: CheckId, summary: impl Into<String>) -> Self {
        Self::new(CheckRef::Check(check), Severity::Warning, summary)
    }

    /// Creates a failure outcome for a check.
    #[must_use]
    pub fn failure(check: CheckId, summary: impl Into<String>) -> Self {
        Self::new(CheckRef::Check(check), Severity::Failure, summary)
    }

    /// Creates a critical outcome for a check.
    #[must_use]
    pub fn critical(check: CheckId, summary: impl Into<String>) -> Self {
        Self::new(CheckRef::Check(check), Severity::Critical, summary)
    }

    /// Creates the synthetic outcome appended for checks skipped after a
    /// critical failure.
    #[must_use]
    pub fn skipped() -> Self {
        Self::new(
            CheckRef::Skipped,
            Severity::Ok,
            "Remaining checks skipped due to critical failure",
        )
    }

    /// Creates the synthetic outcome for a cancelled scope.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(CheckRef::Cancelled, Severity::Warning, "run cancelled")
    }

    /// Attaches a detail string.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches a provider diagnostic trail.
    #[must_use]
    pub fn with_cause(mut self, cause_trace: CauseTrace) -> Self {
        self.cause_trace = Some(cause_trace);
        self
    }
}
