// everest-control-core/src/core/objects.rs
// ============================================================================
// Module: Cluster Objects
// Description: Untyped cluster objects, resource kinds, and typed decoding.
// Purpose: Carry raw API objects through the access guards without losing fields.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The guards pass cluster objects through untouched, so objects stay as raw
//! JSON ([`ClusterObject`]) and are decoded into typed views only where a
//! decision needs a field. Decoding is strict about the fields the view
//! declares and ignores everything else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Resource Kinds
// ============================================================================

/// Cluster API group serving the database custom resources.
pub const EVEREST_API_GROUP: &str = "everest.percona.com";
/// Version of the database custom resources.
pub const EVEREST_API_VERSION: &str = "v1alpha1";

/// Kinds of cluster objects reached through the cluster client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Core namespace object (cluster-scoped).
    Namespace,
    /// Database cluster custom resource.
    DatabaseCluster,
    /// Database cluster backup custom resource.
    DatabaseClusterBackup,
    /// Database cluster restore custom resource.
    DatabaseClusterRestore,
}

impl ResourceKind {
    /// Returns the plural resource name used in API paths.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Namespace => "namespaces",
            Self::DatabaseCluster => "databaseclusters",
            Self::DatabaseClusterBackup => "databaseclusterbackups",
            Self::DatabaseClusterRestore => "databaseclusterrestores",
        }
    }

    /// Returns the object kind name.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::DatabaseCluster => "DatabaseCluster",
            Self::DatabaseClusterBackup => "DatabaseClusterBackup",
            Self::DatabaseClusterRestore => "DatabaseClusterRestore",
        }
    }

    /// Returns the API group, or `None` for the core group.
    #[must_use]
    pub const fn group(self) -> Option<&'static str> {
        match self {
            Self::Namespace => None,
            _ => Some(EVEREST_API_GROUP),
        }
    }

    /// Returns the `apiVersion` value for objects of this kind.
    #[must_use]
    pub fn api_version(self) -> String {
        self.group().map_or_else(
            || "v1".to_string(),
            |group| format!("{group}/{EVEREST_API_VERSION}"),
        )
    }

    /// Returns true when objects of this kind live inside a namespace.
    #[must_use]
    pub const fn namespaced(self) -> bool {
        !matches!(self, Self::Namespace)
    }
}

// ============================================================================
// SECTION: Objects
// ============================================================================

/// Standard object metadata fields read by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// Object namespace; empty for cluster-scoped objects.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Object labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Raw cluster object as returned by the cluster API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterObject(Value);

impl ClusterObject {
    /// Wraps a raw JSON object.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Serializes a typed value into a cluster object.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the value does not serialize to JSON.
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, DecodeError> {
        serde_json::to_value(value)
            .map(Self)
            .map_err(|err| DecodeError::Malformed(err.to_string()))
    }

    /// Returns `metadata.name` when present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    /// Returns `metadata.namespace` when present.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    /// Returns the value of a label when present.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.0.get("metadata")?.get("labels")?.get(key)?.as_str()
    }

    /// Returns the raw JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the object and returns the raw JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Decodes the object into a typed view.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the object does not match the view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        T::deserialize(&self.0).map_err(|err| DecodeError::Malformed(err.to_string()))
    }

    /// Reads a string field from `metadata`.
    fn metadata_str(&self, field: &str) -> Option<&str> {
        self.0.get("metadata")?.get(field)?.as_str()
    }
}

/// Typed decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Object does not match the expected shape.
    #[error("malformed object: {0}")]
    Malformed(String),
}
