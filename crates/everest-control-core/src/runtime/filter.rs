// everest-control-core/src/runtime/filter.rs
// ============================================================================
// Module: Collection Filter
// Description: Per-item authorization of list responses.
// Purpose: Show a subject only the list items it may see, in input order.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Each item is decoded through a [`ListProjection`] into the object
//! identifier the policy is keyed by, then authorized.
//!
//! ## Invariants
//! - A decode failure aborts the whole list.
//! - A denied item is dropped without an error or an audit record.
//! - An authorization fault aborts the whole list.
//! - Surviving items keep their relative order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;

use crate::core::Action;
use crate::core::ClusterObject;
use crate::core::DatabaseClusterRestore;
use crate::core::DecodeError;
use crate::core::ObjectId;
use crate::core::ObjectMeta;
use crate::core::ResourceType;
use crate::core::SubjectId;
use crate::interfaces::AccessRequest;
use crate::interfaces::Authorizer;
use crate::runtime::error::ControlPlaneError;

// ============================================================================
// SECTION: Projections
// ============================================================================

/// Derives the authorization identifier of a list item.
pub trait ListProjection: Send + Sync {
    /// Decodes the item and returns the identifier the policy is keyed by.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the item does not have the expected shape.
    fn object_id(&self, item: &ClusterObject) -> Result<ObjectId, DecodeError>;
}

/// Metadata-only view of an object.
#[derive(Deserialize)]
struct MetadataView {
    /// Object metadata.
    metadata: ObjectMeta,
}

/// Keys an item by its own namespace and name.
///
/// Cluster-scoped objects use their own name as the namespace segment.
pub struct OwnNameProjection;

impl ListProjection for OwnNameProjection {
    fn object_id(&self, item: &ClusterObject) -> Result<ObjectId, DecodeError> {
        let view: MetadataView = item.decode()?;
        if view.metadata.name.is_empty() {
            return Err(DecodeError::Malformed("object has no metadata.name".to_string()));
        }
        let namespace = if view.metadata.namespace.is_empty() {
            view.metadata.name.clone()
        } else {
            view.metadata.namespace
        };
        Ok(ObjectId::new(namespace, view.metadata.name))
    }
}

/// Keys a restore by its namespace and the cluster it restores.
pub struct RestoreProjection;

impl ListProjection for RestoreProjection {
    fn object_id(&self, item: &ClusterObject) -> Result<ObjectId, DecodeError> {
        let restore: DatabaseClusterRestore = item.decode()?;
        Ok(ObjectId::new(restore.metadata.namespace, restore.spec.db_cluster_name))
    }
}

// ============================================================================
// SECTION: Filter
// ============================================================================

/// Filters list responses through an authorizer.
#[derive(Clone)]
pub struct CollectionFilter {
    /// Authorizer consulted per item.
    authorizer: Arc<dyn Authorizer>,
}

impl CollectionFilter {
    /// Creates a filter over an authorizer.
    #[must_use]
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }

    /// Returns the items the subject may act on, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Infrastructure`] when an item cannot be
    /// decoded or an authorization decision cannot be made.
    pub fn filter(
        &self,
        subject: &SubjectId,
        resource: ResourceType,
        action: Action,
        items: Vec<ClusterObject>,
        projection: &dyn ListProjection,
    ) -> Result<Vec<ClusterObject>, ControlPlaneError> {
        let mut allowed = Vec::with_capacity(items.len());
        for item in items {
            let object = projection
                .object_id(&item)
                .map_err(|err| ControlPlaneError::infrastructure("decode list item", err))?;
            let request = AccessRequest {
                subject,
                resource,
                action,
                object: &object,
            };
            let decision = self
                .authorizer
                .authorize(&request)
                .map_err(|err| ControlPlaneError::infrastructure("authorize list item", err))?;
            if decision.is_allowed() {
                allowed.push(item);
            }
        }
        Ok(allowed)
    }
}
