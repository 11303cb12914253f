// crates/migrate-preflight-core/src/core/decl.rs
// ============================================================================
// Module: Migrate Preflight Declarations
// Description: User-declared project and machine migration targets.
// Purpose: Provide immutable, validated inputs for both validation tiers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Declarations are produced by an external parsing layer and consumed by the
//! engine as-is. Field presence is validated here; resource existence and
//! topology consistency are the job of the checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ProjectKey;
use crate::core::identifiers::RegionCode;
use crate::core::identifiers::ResourceGroupName;
use crate::core::identifiers::SubscriptionId;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Kind of migration appliance declared for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplianceKind {
    /// VMware vSphere appliance.
    Vmware,
    /// Hyper-V appliance.
    Hyperv,
    /// Physical-server appliance.
    Physical,
}

impl ApplianceKind {
    /// Returns the declared kind's stable label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vmware => "vmware",
            Self::Hyperv => "hyperv",
            Self::Physical => "physical",
        }
    }

    /// Parses a kind label case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vmware" => Some(Self::Vmware),
            "hyperv" | "hyper-v" => Some(Self::Hyperv),
            "physical" => Some(Self::Physical),
            _ => None,
        }
    }
}

impl fmt::Display for ApplianceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Managed disk kinds supported as migration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskKind {
    /// Standard HDD, locally redundant.
    #[serde(rename = "Standard_LRS")]
    StandardLrs,
    /// Premium SSD, locally redundant.
    #[serde(rename = "Premium_LRS")]
    PremiumLrs,
    /// Standard SSD, locally redundant.
    #[serde(rename = "StandardSSD_LRS")]
    StandardSsdLrs,
    /// Premium SSD, zone redundant.
    #[serde(rename = "Premium_ZRS")]
    PremiumZrs,
    /// Standard SSD, zone redundant.
    #[serde(rename = "StandardSSD_ZRS")]
    StandardSsdZrs,
}

impl DiskKind {
    /// Returns the provider's disk-kind label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StandardLrs => "Standard_LRS",
            Self::PremiumLrs => "Premium_LRS",
            Self::StandardSsdLrs => "StandardSSD_LRS",
            Self::PremiumZrs => "Premium_ZRS",
            Self::StandardSsdZrs => "StandardSSD_ZRS",
        }
    }

    /// Returns true when the kind requires premium-capable machine storage.
    #[must_use]
    pub const fn requires_premium_io(&self) -> bool {
        matches!(self, Self::PremiumLrs | Self::PremiumZrs)
    }

    /// Returns true when the kind is zone redundant.
    #[must_use]
    pub const fn is_zone_redundant(&self) -> bool {
        matches!(self, Self::PremiumZrs | Self::StandardSsdZrs)
    }
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Project Declaration
// ============================================================================

/// User-declared migrate project context ("landing zone").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDecl {
    /// Subscription hosting the migrate project.
    pub subscription_id: SubscriptionId,
    /// Resource group hosting the migrate project.
    pub resource_group: ResourceGroupName,
    /// Migrate project name.
    pub project_name: String,
    /// Project region.
    pub region: RegionCode,
    /// Declared appliance name.
    pub appliance_name: String,
    /// Declared appliance kind.
    pub appliance_kind: ApplianceKind,
    /// Cache storage account used as the replication transfer buffer.
    pub cache_storage_account: String,
    /// Resource group hosting the cache storage account.
    pub cache_storage_resource_group: ResourceGroupName,
    /// Optional recovery vault name.
    #[serde(default)]
    pub recovery_vault_name: Option<String>,
}

impl ProjectDecl {
    /// Returns the deduplication key for this declaration.
    #[must_use]
    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(
            self.subscription_id.clone(),
            self.resource_group.clone(),
            self.project_name.clone(),
        )
    }

    /// Validates that all required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] naming every missing field.
    pub fn validate(&self) -> Result<(), InputError> {
        let mut missing = Vec::new();
        push_missing(&mut missing, "subscription_id", self.subscription_id.as_str());
        push_missing(&mut missing, "resource_group", self.resource_group.as_str());
        push_missing(&mut missing, "project_name", &self.project_name);
        push_missing(&mut missing, "region", self.region.as_str());
        push_missing(&mut missing, "appliance_name", &self.appliance_name);
        push_missing(&mut missing, "cache_storage_account", &self.cache_storage_account);
        push_missing(
            &mut missing,
            "cache_storage_resource_group",
            self.cache_storage_resource_group.as_str(),
        );
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InputError::MissingFields {
                entity: format!("project {}", self.project_name),
                fields: missing,
            })
        }
    }

    /// Returns the set of field values that differ from `other`.
    ///
    /// Used to flag conflicting duplicate declarations for the same key.
    #[must_use]
    pub fn conflicting_fields(&self, other: &Self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.region != other.region {
            fields.push("region");
        }
        if self.appliance_name != other.appliance_name {
            fields.push("appliance_name");
        }
        if self.appliance_kind != other.appliance_kind {
            fields.push("appliance_kind");
        }
        if self.cache_storage_account != other.cache_storage_account {
            fields.push("cache_storage_account");
        }
        if self.cache_storage_resource_group != other.cache_storage_resource_group {
            fields.push("cache_storage_resource_group");
        }
        if self.recovery_vault_name != other.recovery_vault_name {
            fields.push("recovery_vault_name");
        }
        fields
    }
}

// ============================================================================
// SECTION: Machine Declaration
// ============================================================================

/// User-declared per-machine migration target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDecl {
    /// Source machine name as discovered on-premises, when it differs from
    /// the target name.
    #[serde(default)]
    pub source_name: Option<String>,
    /// Target machine name.
    pub target_name: String,
    /// Target region.
    pub target_region: RegionCode,
    /// Target subscription.
    pub target_subscription: SubscriptionId,
    /// Target resource group.
    pub target_resource_group: ResourceGroupName,
    /// Target virtual network.
    pub target_vnet: String,
    /// Target subnet inside the virtual network.
    pub target_subnet: String,
    /// Target machine SKU.
    pub target_sku: String,
    /// Target managed disk kind.
    pub target_disk_type: DiskKind,
    /// Associated migrate project, when known. The matcher may fill this for
    /// declarations that leave it empty.
    #[serde(default)]
    pub project_key: Option<ProjectKey>,
}

impl MachineDecl {
    /// Returns the name used to look the machine up in discovery data.
    #[must_use]
    pub fn discovery_name(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.target_name)
    }

    /// Validates that all required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] naming every missing field.
    pub fn validate(&self) -> Result<(), InputError> {
        let mut missing = Vec::new();
        push_missing(&mut missing, "target_name", &self.target_name);
        push_missing(&mut missing, "target_region", self.target_region.as_str());
        push_missing(&mut missing, "target_subscription", self.target_subscription.as_str());
        push_missing(&mut missing, "target_resource_group", self.target_resource_group.as_str());
        push_missing(&mut missing, "target_vnet", &self.target_vnet);
        push_missing(&mut missing, "target_subnet", &self.target_subnet);
        push_missing(&mut missing, "target_sku", &self.target_sku);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InputError::MissingFields {
                entity: format!("machine {}", self.target_name),
                fields: missing,
            })
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Declaration-level input errors.
///
/// These never abort a run; the engine converts them into per-entity
/// critical outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// One or more required fields are empty.
    #[error("{entity} is missing required fields: {}", fields.join(", "))]
    MissingFields {
        /// Human-readable entity label.
        entity: String,
        /// Names of the missing fields.
        fields: Vec<&'static str>,
    },
}

/// Records a field name when its value is empty after trimming.
fn push_missing(missing: &mut Vec<&'static str>, name: &'static str, value: &str) {
    if value.trim().is_empty() {
        missing.push(name);
    }
}
