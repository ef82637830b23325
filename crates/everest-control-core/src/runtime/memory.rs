// everest-control-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Backends
// Description: Process-local cluster client and release installer.
// Purpose: Exercise the facade and provisioner without a cluster.
// Dependencies: async-trait, serde_json
// ============================================================================

//! ## Overview
//! [`InMemoryClusterClient`] keeps objects in insertion order and records
//! every call, so tests can assert that a denied request never reached the
//! cluster. [`RecordingInstaller`] records install requests and, when linked
//! to a cluster, creates or labels the release namespace the way a real
//! install would.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::ClusterObject;
use crate::core::ResourceKind;
use crate::interfaces::ClusterClient;
use crate::interfaces::ClusterError;
use crate::interfaces::InstallError;
use crate::interfaces::InstallRequest;
use crate::interfaces::ReleaseInstaller;

// ============================================================================
// SECTION: Cluster Client
// ============================================================================

/// Cluster call observed by [`InMemoryClusterClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Verb: `get`, `list`, `create`, `replace`, or `delete`.
    pub verb: &'static str,
    /// Object kind.
    pub kind: ResourceKind,
    /// Namespace scope.
    pub namespace: Option<String>,
    /// Object name, when the call names one.
    pub name: Option<String>,
}

/// Stored object with its kind and scope.
#[derive(Debug, Clone)]
struct StoredObject {
    /// Object kind.
    kind: ResourceKind,
    /// Namespace scope; `None` for cluster-scoped kinds.
    namespace: Option<String>,
    /// Object name.
    name: String,
    /// Object body.
    object: ClusterObject,
}

/// Mutable state behind the client lock.
#[derive(Debug, Default)]
struct ClusterState {
    /// Objects in insertion order.
    objects: Vec<StoredObject>,
    /// Calls in arrival order.
    calls: Vec<RecordedCall>,
    /// Failure returned by every call when set.
    failure: Option<ClusterError>,
}

/// Cluster client backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryClusterClient {
    /// Client state.
    state: Mutex<ClusterState>,
}

impl InMemoryClusterClient {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object, replacing any object with the same identity.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidResponse`] when the object has no name.
    pub fn insert(&self, kind: ResourceKind, object: ClusterObject) -> Result<(), ClusterError> {
        let name = object
            .name()
            .ok_or_else(|| ClusterError::InvalidResponse("object has no metadata.name".to_string()))?
            .to_string();
        let namespace = if kind.namespaced() { object.namespace().map(str::to_string) } else { None };
        let mut state = self.lock()?;
        upsert(&mut state.objects, StoredObject {
            kind,
            namespace,
            name,
            object,
        });
        Ok(())
    }

    /// Makes every subsequent call fail with the given error.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Unavailable`] when the state lock is poisoned.
    pub fn fail_with(&self, error: ClusterError) -> Result<(), ClusterError> {
        self.lock()?.failure = Some(error);
        Ok(())
    }

    /// Returns the calls observed so far.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Unavailable`] when the state lock is poisoned.
    pub fn calls(&self) -> Result<Vec<RecordedCall>, ClusterError> {
        Ok(self.lock()?.calls.clone())
    }

    /// Locks the client state.
    fn lock(&self) -> Result<MutexGuard<'_, ClusterState>, ClusterError> {
        self.state
            .lock()
            .map_err(|_| ClusterError::Unavailable("in-memory cluster lock poisoned".to_string()))
    }

    /// Locks the state, records the call, and applies any injected failure.
    fn begin(
        &self,
        verb: &'static str,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Result<MutexGuard<'_, ClusterState>, ClusterError> {
        let mut state = self.lock()?;
        state.calls.push(RecordedCall {
            verb,
            kind,
            namespace: namespace.map(str::to_string),
            name: name.map(str::to_string),
        });
        match state.failure.clone() {
            Some(failure) => Err(failure),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ClusterClient for InMemoryClusterClient {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ClusterObject, ClusterError> {
        let state = self.begin("get", kind, namespace, Some(name))?;
        state
            .objects
            .iter()
            .find(|stored| matches_identity(stored, kind, namespace, name))
            .map(|stored| stored.object.clone())
            .ok_or_else(|| not_found(kind, name))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<ClusterObject>, ClusterError> {
        let state = self.begin("list", kind, namespace, None)?;
        let selector = parse_selector(label_selector)?;
        Ok(state
            .objects
            .iter()
            .filter(|stored| stored.kind == kind)
            .filter(|stored| namespace.is_none() || stored.namespace.as_deref() == namespace)
            .filter(|stored| {
                selector.iter().all(|(key, value)| stored.object.label(key) == Some(value.as_str()))
            })
            .map(|stored| stored.object.clone())
            .collect())
    }

    async fn create(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        object: &ClusterObject,
    ) -> Result<ClusterObject, ClusterError> {
        let name = object
            .name()
            .ok_or_else(|| ClusterError::Rejected {
                status: 422,
                message: "metadata.name is required".to_string(),
            })?
            .to_string();
        let mut state = self.begin("create", kind, namespace, Some(&name))?;
        let scope = scope_for(kind, namespace);
        if state.objects.iter().any(|stored| matches_identity(stored, kind, scope, &name)) {
            return Err(ClusterError::Rejected {
                status: 409,
                message: format!("{} '{name}' already exists", kind.kind()),
            });
        }
        state.objects.push(StoredObject {
            kind,
            namespace: scope.map(str::to_string),
            name,
            object: object.clone(),
        });
        Ok(object.clone())
    }

    async fn replace(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        object: &ClusterObject,
    ) -> Result<ClusterObject, ClusterError> {
        let mut state = self.begin("replace", kind, namespace, Some(name))?;
        let scope = scope_for(kind, namespace);
        let stored = state
            .objects
            .iter_mut()
            .find(|stored| matches_identity(stored, kind, scope, name))
            .ok_or_else(|| not_found(kind, name))?;
        stored.object = object.clone();
        Ok(object.clone())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), ClusterError> {
        let mut state = self.begin("delete", kind, namespace, Some(name))?;
        let scope = scope_for(kind, namespace);
        let before = state.objects.len();
        state.objects.retain(|stored| !matches_identity(stored, kind, scope, name));
        if state.objects.len() == before {
            return Err(not_found(kind, name));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Release Installer
// ============================================================================

/// Mutable state behind the installer lock.
#[derive(Debug, Default)]
struct InstallerState {
    /// Requests in arrival order.
    requests: Vec<InstallRequest>,
    /// Failure returned for installs into the named namespace.
    failures: Vec<(String, InstallError)>,
}

/// Release installer that records requests.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    /// Installer state.
    state: Mutex<InstallerState>,
    /// Cluster updated on successful installs.
    cluster: Option<Arc<InMemoryClusterClient>>,
}

impl RecordingInstaller {
    /// Creates an installer that only records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an installer that also applies namespaces to a cluster.
    #[must_use]
    pub fn with_cluster(cluster: Arc<InMemoryClusterClient>) -> Self {
        Self {
            state: Mutex::default(),
            cluster: Some(cluster),
        }
    }

    /// Makes installs into a namespace fail.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Unavailable`] when the state lock is poisoned.
    pub fn fail_namespace(
        &self,
        namespace: impl Into<String>,
        error: InstallError,
    ) -> Result<(), InstallError> {
        self.lock()?.failures.push((namespace.into(), error));
        Ok(())
    }

    /// Returns the requests observed so far.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Unavailable`] when the state lock is poisoned.
    pub fn requests(&self) -> Result<Vec<InstallRequest>, InstallError> {
        Ok(self.lock()?.requests.clone())
    }

    /// Locks the installer state.
    fn lock(&self) -> Result<MutexGuard<'_, InstallerState>, InstallError> {
        self.state
            .lock()
            .map_err(|_| InstallError::Unavailable("recording installer lock poisoned".to_string()))
    }
}

#[async_trait]
impl ReleaseInstaller for RecordingInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<(), InstallError> {
        {
            let mut state = self.lock()?;
            state.requests.push(request.clone());
            if let Some((_, failure)) =
                state.failures.iter().find(|(namespace, _)| *namespace == request.release_namespace)
            {
                return Err(failure.clone());
            }
        }
        if let Some(cluster) = &self.cluster {
            apply_namespace(cluster, request).map_err(|err| InstallError::Failed(err.to_string()))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the effective namespace scope for a kind.
fn scope_for(kind: ResourceKind, namespace: Option<&str>) -> Option<&str> {
    if kind.namespaced() { namespace } else { None }
}

/// Returns true when a stored object has the given identity.
fn matches_identity(
    stored: &StoredObject,
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
) -> bool {
    stored.kind == kind
        && stored.name == name
        && stored.namespace.as_deref() == scope_for(kind, namespace)
}

/// Inserts or replaces a stored object.
fn upsert(objects: &mut Vec<StoredObject>, entry: StoredObject) {
    let existing = objects.iter_mut().find(|stored| {
        matches_identity(stored, entry.kind, entry.namespace.as_deref(), &entry.name)
    });
    match existing {
        Some(stored) => *stored = entry,
        None => objects.push(entry),
    }
}

/// Builds a not-found error.
fn not_found(kind: ResourceKind, name: &str) -> ClusterError {
    ClusterError::NotFound {
        kind: kind.kind(),
        name: name.to_string(),
    }
}

/// Parses an equality-only label selector (`k=v,k2=v2`).
fn parse_selector(selector: Option<&str>) -> Result<Vec<(String, String)>, ClusterError> {
    let Some(selector) = selector.filter(|selector| !selector.is_empty()) else {
        return Ok(Vec::new());
    };
    selector
        .split(',')
        .map(|term| {
            term.split_once('=').map(|(key, value)| (key.to_string(), value.to_string())).ok_or_else(
                || ClusterError::Rejected {
                    status: 400,
                    message: format!("unsupported label selector term '{term}'"),
                },
            )
        })
        .collect()
}

/// Creates or labels the release namespace after a successful install.
fn apply_namespace(
    cluster: &InMemoryClusterClient,
    request: &InstallRequest,
) -> Result<(), ClusterError> {
    let existing = {
        let state = cluster.lock()?;
        state
            .objects
            .iter()
            .find(|stored| {
                matches_identity(stored, ResourceKind::Namespace, None, &request.release_namespace)
            })
            .map(|stored| stored.object.clone())
    };
    let mut object = match existing {
        Some(object) => object.into_value(),
        None if request.create_namespace => json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": request.release_namespace },
        }),
        None => {
            return Err(ClusterError::NotFound {
                kind: ResourceKind::Namespace.kind(),
                name: request.release_namespace.clone(),
            });
        }
    };
    if let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) {
        let labels = metadata.entry("labels").or_insert_with(|| Value::Object(Map::new()));
        if let Some(labels) = labels.as_object_mut() {
            for (key, value) in &request.namespace_labels {
                labels.insert(key.clone(), Value::String(value.clone()));
            }
        }
    }
    cluster.insert(ResourceKind::Namespace, ClusterObject::new(object))
}
