// crates/migrate-preflight-core/src/core/identifiers.rs
// ============================================================================
// Module: Migrate Preflight Identifiers
// Description: Canonical opaque identifiers for cloud resources and runs.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the string-based identifiers used throughout Migrate
//! Preflight. Identifiers are opaque and serialize as strings. Validation of
//! resource existence is handled by checks at runtime, never inside these
//! wrappers. The one exception is [`RegionCode`], which normalizes to the
//! provider's lowercase region form on construction so that all region
//! comparisons are case-insensitive by design of the type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Cloud subscription identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Creates a new subscription identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SubscriptionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Resource group name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceGroupName(String);

impl ResourceGroupName {
    /// Creates a new resource group name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceGroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ResourceGroupName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceGroupName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Provider region code, normalized to the lowercase canonical form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(String);

impl RegionCode {
    /// Creates a region code, trimming whitespace and lowercasing.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_lowercase())
    }

    /// Returns the normalized code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RegionCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RegionCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Directory object identifier of the caller's principal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Creates a new principal identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Role definition identifier (the trailing GUID of a role definition path).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleDefinitionId(String);

impl RoleDefinitionId {
    /// Creates a new role definition identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RoleDefinitionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Provider-issued request identifier attached to diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new request identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Project Key
// ============================================================================

/// Deduplication identity for a migrate project.
///
/// # Invariants
/// - Serializes as `subscription/resource-group/project-name` so it can act
///   as a stable JSON map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectKey {
    /// Subscription hosting the migrate project.
    pub subscription_id: SubscriptionId,
    /// Resource group hosting the migrate project.
    pub resource_group: ResourceGroupName,
    /// Migrate project name.
    pub project_name: String,
}

impl ProjectKey {
    /// Creates a new project key.
    #[must_use]
    pub fn new(
        subscription_id: impl Into<SubscriptionId>,
        resource_group: impl Into<ResourceGroupName>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            project_name: project_name.into(),
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.subscription_id, self.resource_group, self.project_name)
    }
}

/// Errors parsing a project key from its string form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectKeyError {
    /// The string form does not have three `/`-separated segments.
    #[error("invalid project key form: {0}")]
    InvalidForm(String),
}

impl FromStr for ProjectKey {
    type Err = ProjectKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(sub), Some(rg), Some(name)) if !sub.is_empty() && !rg.is_empty() => {
                Ok(Self::new(sub, rg, name))
            }
            _ => Err(ProjectKeyError::InvalidForm(value.to_string())),
        }
    }
}

impl Serialize for ProjectKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProjectKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
