// everest-control-core/src/core/restore.rs
// ============================================================================
// Module: Restore Views
// Description: Typed views over database cluster and restore objects.
// Purpose: Decode the fields restore authorization and conflict checks depend on.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Only the fields needed for decisions are modeled. A restore is authorized
//! by the cluster it restores (`spec.dbClusterName`), not by its own name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::objects::ObjectMeta;

// ============================================================================
// SECTION: Restores
// ============================================================================

/// Database cluster restore object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterRestore {
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Restore specification.
    pub spec: RestoreSpec,
}

/// Restore specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSpec {
    /// Target database cluster.
    #[serde(rename = "dbClusterName")]
    pub db_cluster_name: String,
    /// Restore data source.
    #[serde(default)]
    pub data_source: RestoreDataSource,
}

/// Restore data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreDataSource {
    /// Name of the source backup.
    #[serde(rename = "dbClusterBackupName", default, skip_serializing_if = "Option::is_none")]
    pub db_cluster_backup_name: Option<String>,
    /// Point-in-time recovery target, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitr: Option<serde_json::Value>,
}

// ============================================================================
// SECTION: Database Clusters
// ============================================================================

/// Database cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseCluster {
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Observed status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DatabaseClusterStatus>,
}

impl DatabaseCluster {
    /// Returns true when the cluster reports an in-progress restore.
    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.status.as_ref().and_then(|status| status.status) == Some(AppState::Restoring)
    }
}

/// Database cluster status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterStatus {
    /// Application state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppState>,
}

/// Application state reported by a database cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    /// Cluster is being created.
    Initializing,
    /// Cluster is serving.
    Ready,
    /// Cluster is paused.
    Paused,
    /// Cluster is being paused.
    Stopping,
    /// Cluster is being restored.
    Restoring,
    /// Cluster is in an error state.
    Error,
    /// Any state this build does not know.
    #[serde(other)]
    Unknown,
}
