// everest-control-core/src/interfaces/mod.rs
// ============================================================================
// Module: External Interfaces
// Description: Capability contracts for policy, authorization, cluster, and installer.
// Purpose: Keep the control-plane core independent of concrete backends.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! Every external collaborator is reached through one of these traits. Each
//! has a real backend (in `everest-control-cluster` or the config crate) and
//! an in-memory fake in [`crate::runtime`]; the core composes them by explicit
//! injection.
//!
//! ## Invariants
//! - Authorization returns [`AuthzDecision::Denied`] for a missing grant; an
//!   `Err` always means the decision could not be made.
//! - [`ClusterError::NotFound`] is a distinguished outcome, not a fault.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::ClusterObject;
use crate::core::ObjectId;
use crate::core::Policy;
use crate::core::ResourceKind;
use crate::core::SubjectId;
use crate::core::rbac::Action;
use crate::core::rbac::ResourceType;

// ============================================================================
// SECTION: Policy Source
// ============================================================================

/// Policy store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyStoreError {
    /// The store could not produce a snapshot.
    #[error("policy store unavailable: {0}")]
    Unavailable(String),
}

/// Source of immutable policy snapshots.
///
/// A request evaluates exactly one snapshot, so a concurrent reload never
/// changes a decision mid-request.
pub trait PolicySource: Send + Sync {
    /// Returns the current policy snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyStoreError`] when no snapshot is available.
    fn snapshot(&self) -> Result<Arc<Policy>, PolicyStoreError>;
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Single authorization question.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Caller identity.
    pub subject: &'a SubjectId,
    /// Resource type being accessed.
    pub resource: ResourceType,
    /// Action being performed.
    pub action: Action,
    /// Concrete object being accessed.
    pub object: &'a ObjectId,
}

/// Authorization outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthzDecision {
    /// At least one grant matched.
    Allowed,
    /// No grant matched.
    Denied,
}

impl AuthzDecision {
    /// Returns true for [`AuthzDecision::Allowed`].
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Failures that prevent an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// Policy snapshot unavailable.
    #[error(transparent)]
    PolicyStore(#[from] PolicyStoreError),
    /// Object identifier is empty or contains a wildcard.
    #[error("malformed object identifier: {0}")]
    MalformedObject(String),
}

/// Decides whether a subject may perform an action on an object.
pub trait Authorizer: Send + Sync {
    /// Authorizes one request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError`] when no decision can be made.
    fn authorize(&self, request: &AccessRequest<'_>) -> Result<AuthzDecision, AuthzError>;
}

// ============================================================================
// SECTION: Cluster Client
// ============================================================================

/// Cluster API failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// Object does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Object kind.
        kind: &'static str,
        /// Object name.
        name: String,
    },
    /// Cluster API could not be reached.
    #[error("cluster api unavailable: {0}")]
    Unavailable(String),
    /// Cluster API rejected the request.
    #[error("cluster api rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided message.
        message: String,
    },
    /// Cluster API returned an unparseable response.
    #[error("invalid cluster api response: {0}")]
    InvalidResponse(String),
}

impl ClusterError {
    /// Returns true for [`ClusterError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Object CRUD against the cluster API.
///
/// `namespace` is ignored for cluster-scoped kinds. Lists preserve the order
/// returned by the cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetches one object.
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ClusterObject, ClusterError>;

    /// Lists objects, optionally narrowed by a label selector.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<ClusterObject>, ClusterError>;

    /// Creates an object.
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        object: &ClusterObject,
    ) -> Result<ClusterObject, ClusterError>;

    /// Replaces an existing object.
    async fn replace(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        object: &ClusterObject,
    ) -> Result<ClusterObject, ClusterError>;

    /// Deletes an object.
    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), ClusterError>;
}

// ============================================================================
// SECTION: Release Installer
// ============================================================================

/// Chart to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRef {
    /// Chart name.
    pub name: String,
    /// Chart version; `None` installs the latest.
    pub version: Option<String>,
    /// Chart repository URL.
    pub repo_url: Option<String>,
    /// Local chart directory; overrides name and repository when set.
    pub directory: Option<PathBuf>,
}

/// One release install or upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Release name.
    pub release_name: String,
    /// Namespace the release is installed into.
    pub release_namespace: String,
    /// Chart to install.
    pub chart: ChartRef,
    /// Flat `key=value` settings, in application order.
    pub values: Vec<String>,
    /// Labels applied to the namespace as part of release creation.
    pub namespace_labels: BTreeMap<String, String>,
    /// Ask the installer to create the namespace.
    pub create_namespace: bool,
}

/// Release installer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
    /// Installer could not be started.
    #[error("release installer unavailable: {0}")]
    Unavailable(String),
    /// Installer ran and reported failure.
    #[error("release install failed: {0}")]
    Failed(String),
}

/// Installs or upgrades declarative releases.
#[async_trait]
pub trait ReleaseInstaller: Send + Sync {
    /// Installs or upgrades one release.
    async fn install(&self, request: &InstallRequest) -> Result<(), InstallError>;
}
