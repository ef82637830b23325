// everest-control-core/src/runtime/resolver.rs
// ============================================================================
// Module: Namespace State Resolver
// Description: Reads a namespace from the cluster and classifies its ownership.
// Purpose: Feed the provisioning decision table with observed state.
// Dependencies: tokio-util
// ============================================================================

//! ## Overview
//! A missing namespace is [`NamespaceState::Absent`], not an error. Any other
//! cluster failure is fatal. Ownership is the exact label pair
//! `app.kubernetes.io/managed-by=everest`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::NamespaceName;
use crate::core::NamespaceState;
use crate::core::ResourceKind;
use crate::core::constants::MANAGED_BY_LABEL;
use crate::core::constants::MANAGED_BY_VALUE;
use crate::interfaces::ClusterClient;
use crate::runtime::cancel::run_cancellable;
use crate::runtime::error::ControlPlaneError;

/// Resolves namespace existence and ownership.
#[derive(Clone)]
pub struct NamespaceStateResolver {
    /// Cluster API client.
    client: Arc<dyn ClusterClient>,
}

impl NamespaceStateResolver {
    /// Creates a resolver over a cluster client.
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Resolves the state of one namespace.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Infrastructure`] for any cluster failure
    /// other than not-found, or [`ControlPlaneError::Cancelled`].
    pub async fn resolve(
        &self,
        namespace: &NamespaceName,
        cancel: &CancellationToken,
    ) -> Result<NamespaceState, ControlPlaneError> {
        run_cancellable(cancel, async {
            match self.client.get(ResourceKind::Namespace, None, namespace.as_str()).await {
                Ok(object) if object.label(MANAGED_BY_LABEL) == Some(MANAGED_BY_VALUE) => {
                    Ok(NamespaceState::PresentManaged)
                }
                Ok(_) => Ok(NamespaceState::PresentUnmanaged),
                Err(err) if err.is_not_found() => Ok(NamespaceState::Absent),
                Err(err) => Err(ControlPlaneError::infrastructure(
                    format!("resolve namespace {namespace}"),
                    err,
                )),
            }
        })
        .await
    }
}
