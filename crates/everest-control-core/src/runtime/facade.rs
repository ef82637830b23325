// everest-control-core/src/runtime/facade.rs
// ============================================================================
// Module: Resource Access Facade
// Description: Authorization-gated pass-through to the cluster API.
// Purpose: Provide the single call path for guarded resource reads and writes.
// Dependencies: tokio-util, crate::interfaces
// ============================================================================

//! ## Overview
//! Single-object operations are authorized before the cluster client is
//! touched; a denial never reaches the cluster. List operations fetch the raw
//! list and hand it to the [`CollectionFilter`]. Business invariants, such as
//! the in-progress restore conflict, are checked only after authorization has
//! succeeded.
//!
//! Restore objects are authorized by the cluster they restore. Reading,
//! updating, or deleting an existing restore therefore fetches it first to
//! learn that cluster.
//!
//! ## Invariants
//! - The facade mutates nothing itself; every write is the caller's body
//!   passed through unchanged.
//! - Infrastructure faults are recorded to the audit sink before propagation.
//!   Denials are recorded only as access decisions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::Action;
use crate::core::ClusterObject;
use crate::core::ConflictError;
use crate::core::DatabaseCluster;
use crate::core::DatabaseClusterRestore;
use crate::core::ObjectId;
use crate::core::PermissionDenied;
use crate::core::ResourceKind;
use crate::core::ResourceType;
use crate::core::SubjectId;
use crate::core::ValidationError;
use crate::core::constants::RESTORE_CLUSTER_LABEL;
use crate::interfaces::Authorizer;
use crate::interfaces::AuthzDecision;
use crate::interfaces::ClusterClient;
use crate::interfaces::ClusterError;
use crate::runtime::audit::AccessAuditEvent;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::FailureAuditEvent;
use crate::runtime::authorizer::AccessCheck;
use crate::runtime::authorizer::all_of;
use crate::runtime::cancel::run_cancellable;
use crate::runtime::error::ControlPlaneError;
use crate::runtime::error::InfrastructureError;
use crate::runtime::filter::CollectionFilter;
use crate::runtime::filter::ListProjection;
use crate::runtime::filter::RestoreProjection;
use crate::runtime::validator::validate_rfc1035;

// ============================================================================
// SECTION: Facade
// ============================================================================

/// Guarded access to cluster resources.
#[derive(Clone)]
pub struct ResourceAccess {
    /// Cluster API client.
    client: Arc<dyn ClusterClient>,
    /// Single-object authorizer.
    authorizer: Arc<dyn Authorizer>,
    /// List filter over the same authorizer.
    filter: CollectionFilter,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl ResourceAccess {
    /// Creates a facade.
    #[must_use]
    pub fn new(
        client: Arc<dyn ClusterClient>,
        authorizer: Arc<dyn Authorizer>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let filter = CollectionFilter::new(Arc::clone(&authorizer));
        Self {
            client,
            authorizer,
            filter,
            audit,
        }
    }

    // ------------------------------------------------------------------------
    // Generic guards
    // ------------------------------------------------------------------------

    /// Reads one object keyed by its own namespace and name.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::PermissionDenied`] without contacting the
    /// cluster when read is not granted.
    pub async fn get_object(
        &self,
        subject: &SubjectId,
        resource: ResourceType,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ClusterObject, ControlPlaneError> {
        let check = AccessCheck::new(resource, Action::Read, ObjectId::new(namespace, name));
        self.enforce(subject, &check)?;
        let scope = kind.namespaced().then_some(namespace);
        self.cluster_call(cancel, "get object", self.client.get(kind, scope, name)).await
    }

    /// Lists objects and keeps only those the subject may read.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Infrastructure`] when listing, decoding,
    /// or authorizing any item fails.
    #[allow(clippy::too_many_arguments, reason = "Mirrors the cluster list call plus guard inputs.")]
    pub async fn list_objects(
        &self,
        subject: &SubjectId,
        resource: ResourceType,
        kind: ResourceKind,
        namespace: Option<&str>,
        label_selector: Option<&str>,
        projection: &dyn ListProjection,
        cancel: &CancellationToken,
    ) -> Result<Vec<ClusterObject>, ControlPlaneError> {
        let items = self
            .cluster_call(cancel, "list objects", self.client.list(kind, namespace, label_selector))
            .await?;
        self.filter_items(subject, resource, items, projection)
    }

    // ------------------------------------------------------------------------
    // Restores
    // ------------------------------------------------------------------------

    /// Lists the restores of one database cluster the subject may read.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Validation`] for a non-compliant cluster
    /// name, or [`ControlPlaneError::Infrastructure`].
    pub async fn list_restores(
        &self,
        subject: &SubjectId,
        namespace: &str,
        cluster_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ClusterObject>, ControlPlaneError> {
        validate_rfc1035(cluster_name, "name")?;
        let selector = format!("{RESTORE_CLUSTER_LABEL}={cluster_name}");
        self.list_objects(
            subject,
            ResourceType::DatabaseClusterRestores,
            ResourceKind::DatabaseClusterRestore,
            Some(namespace),
            Some(&selector),
            &RestoreProjection,
            cancel,
        )
        .await
    }

    /// Reads one restore.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::PermissionDenied`] when read on the
    /// restored cluster is not granted.
    pub async fn get_restore(
        &self,
        subject: &SubjectId,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ClusterObject, ControlPlaneError> {
        self.guarded_restore(subject, namespace, name, Action::Read, cancel).await
    }

    /// Creates a restore.
    ///
    /// Requires read on the target cluster's credentials, read on the source
    /// backup, and read on the target cluster's restores.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Validation`] for a malformed body,
    /// [`ControlPlaneError::PermissionDenied`] when any grant is missing, or
    /// [`ControlPlaneError::Conflict`] when the cluster is already restoring.
    pub async fn create_restore(
        &self,
        subject: &SubjectId,
        namespace: &str,
        body: &ClusterObject,
        cancel: &CancellationToken,
    ) -> Result<ClusterObject, ControlPlaneError> {
        let (cluster_name, backup_name) = validate_restore_body(namespace, body)?;
        let checks = [
            AccessCheck::new(
                ResourceType::DatabaseClusterCredentials,
                Action::Read,
                ObjectId::new(namespace, &cluster_name),
            ),
            AccessCheck::new(
                ResourceType::DatabaseClusterBackups,
                Action::Read,
                ObjectId::new(namespace, backup_name),
            ),
            AccessCheck::new(
                ResourceType::DatabaseClusterRestores,
                Action::Read,
                ObjectId::new(namespace, &cluster_name),
            ),
        ];
        self.enforce_all(subject, &checks)?;
        let cluster: DatabaseCluster = self
            .cluster_call(
                cancel,
                "get database cluster",
                self.client.get(ResourceKind::DatabaseCluster, Some(namespace), &cluster_name),
            )
            .await?
            .decode()
            .map_err(|err| self.fault("decode database cluster", err))?;
        if cluster.is_restoring() {
            return Err(ConflictError::RestoreInProgress {
                namespace: namespace.to_string(),
                cluster: cluster_name,
            }
            .into());
        }
        self.cluster_call(
            cancel,
            "create restore",
            self.client.create(ResourceKind::DatabaseClusterRestore, Some(namespace), body),
        )
        .await
    }

    /// Replaces a restore.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::PermissionDenied`] when update on the
    /// restored cluster is not granted, or [`ControlPlaneError::Validation`]
    /// for a malformed body.
    pub async fn update_restore(
        &self,
        subject: &SubjectId,
        namespace: &str,
        name: &str,
        body: &ClusterObject,
        cancel: &CancellationToken,
    ) -> Result<ClusterObject, ControlPlaneError> {
        self.guarded_restore(subject, namespace, name, Action::Update, cancel).await?;
        validate_restore_body(namespace, body)?;
        self.cluster_call(
            cancel,
            "replace restore",
            self.client.replace(ResourceKind::DatabaseClusterRestore, Some(namespace), name, body),
        )
        .await
    }

    /// Deletes a restore.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::PermissionDenied`] when delete on the
    /// restored cluster is not granted.
    pub async fn delete_restore(
        &self,
        subject: &SubjectId,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ControlPlaneError> {
        self.guarded_restore(subject, namespace, name, Action::Delete, cancel).await?;
        self.cluster_call(
            cancel,
            "delete restore",
            self.client.delete(ResourceKind::DatabaseClusterRestore, Some(namespace), name),
        )
        .await
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Fetches a restore and authorizes the action on its restored cluster.
    async fn guarded_restore(
        &self,
        subject: &SubjectId,
        namespace: &str,
        name: &str,
        action: Action,
        cancel: &CancellationToken,
    ) -> Result<ClusterObject, ControlPlaneError> {
        let object = self
            .cluster_call(
                cancel,
                "get restore",
                self.client.get(ResourceKind::DatabaseClusterRestore, Some(namespace), name),
            )
            .await?;
        let restore: DatabaseClusterRestore =
            object.decode().map_err(|err| self.fault("decode restore", err))?;
        let check = AccessCheck::new(
            ResourceType::DatabaseClusterRestores,
            action,
            ObjectId::new(namespace, &restore.spec.db_cluster_name),
        );
        self.enforce(subject, &check)?;
        Ok(object)
    }

    /// Authorizes one check, recording the decision.
    fn enforce(&self, subject: &SubjectId, check: &AccessCheck) -> Result<(), ControlPlaneError> {
        let request = check.request(subject);
        let decision =
            self.authorizer.authorize(&request).map_err(|err| self.fault("authorize", err))?;
        self.audit.record_access(&AccessAuditEvent::new(&request, decision));
        match decision {
            AuthzDecision::Allowed => Ok(()),
            AuthzDecision::Denied => Err(denied(subject, check)),
        }
    }

    /// Authorizes a conjunction of checks, recording the outcome.
    fn enforce_all(
        &self,
        subject: &SubjectId,
        checks: &[AccessCheck],
    ) -> Result<(), ControlPlaneError> {
        let denial = all_of(self.authorizer.as_ref(), subject, checks)
            .map_err(|err| self.fault("authorize", err))?;
        if let Some(check) = denial {
            self.audit
                .record_access(&AccessAuditEvent::new(&check.request(subject), AuthzDecision::Denied));
            return Err(denied(subject, check));
        }
        for check in checks {
            self.audit
                .record_access(&AccessAuditEvent::new(&check.request(subject), AuthzDecision::Allowed));
        }
        Ok(())
    }

    /// Filters a fetched list, recording faults.
    fn filter_items(
        &self,
        subject: &SubjectId,
        resource: ResourceType,
        items: Vec<ClusterObject>,
        projection: &dyn ListProjection,
    ) -> Result<Vec<ClusterObject>, ControlPlaneError> {
        self.filter.filter(subject, resource, Action::Read, items, projection).inspect_err(|err| {
            if let ControlPlaneError::Infrastructure { context, .. } = err {
                self.audit.record_failure(&FailureAuditEvent::new(context.clone(), err.to_string()));
            }
        })
    }

    /// Runs a cluster call under cancellation, recording faults.
    async fn cluster_call<T>(
        &self,
        cancel: &CancellationToken,
        context: &str,
        call: impl Future<Output = Result<T, ClusterError>>,
    ) -> Result<T, ControlPlaneError> {
        run_cancellable(cancel, async { call.await.map_err(|err| self.fault(context, err)) }).await
    }

    /// Wraps and records an infrastructure fault.
    fn fault(&self, context: &str, err: impl Into<InfrastructureError>) -> ControlPlaneError {
        let error = ControlPlaneError::infrastructure(context, err);
        self.audit.record_failure(&FailureAuditEvent::new(context, error.to_string()));
        error
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the distinguished denial for a check.
fn denied(subject: &SubjectId, check: &AccessCheck) -> ControlPlaneError {
    PermissionDenied {
        subject: subject.clone(),
        resource: check.resource,
        action: check.action,
        object: check.object.clone(),
    }
    .into()
}

/// Validates a submitted restore body.
///
/// Returns the target cluster and source backup names.
fn validate_restore_body(
    namespace: &str,
    body: &ClusterObject,
) -> Result<(String, String), ValidationError> {
    let restore: DatabaseClusterRestore = body.decode().map_err(|_| {
        ValidationError::InvalidRequest(
            "could not get DatabaseClusterRestore from the request body".to_string(),
        )
    })?;
    validate_rfc1035(&restore.metadata.name, "metadata.name")?;
    if !restore.metadata.namespace.is_empty() && restore.metadata.namespace != namespace {
        return Err(ValidationError::InvalidRequest(format!(
            "metadata.namespace '{}' does not match request namespace '{namespace}'",
            restore.metadata.namespace
        )));
    }
    if restore.spec.db_cluster_name.is_empty() {
        return Err(ValidationError::InvalidRequest("spec.dbClusterName is required".to_string()));
    }
    let backup = restore
        .spec
        .data_source
        .db_cluster_backup_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ValidationError::InvalidRequest(
                "spec.dataSource.dbClusterBackupName is required".to_string(),
            )
        })?;
    Ok((restore.spec.db_cluster_name, backup))
}
