// everest-control-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Policy builders, cluster object fixtures, and a recording sink.
// Purpose: Keep integration tests focused on behavior instead of setup.
// Dependencies: everest-control-core, serde_json
// ============================================================================

#![allow(dead_code, reason = "Each test binary uses a different subset of fixtures.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures use unwrap on deterministic inputs."
)]

use std::sync::Arc;
use std::sync::Mutex;

use everest_control_core::AccessAuditEvent;
use everest_control_core::Action;
use everest_control_core::AuditSink;
use everest_control_core::ClusterObject;
use everest_control_core::FailureAuditEvent;
use everest_control_core::ObjectPattern;
use everest_control_core::Permission;
use everest_control_core::Policy;
use everest_control_core::PolicySource;
use everest_control_core::PolicyStoreError;
use everest_control_core::ProvisionAuditEvent;
use everest_control_core::ResourceType;
use everest_control_core::Role;
use everest_control_core::RoleName;
use everest_control_core::SubjectId;
use serde_json::json;

// ============================================================================
// SECTION: Policy Builders
// ============================================================================

pub fn perm(resource: ResourceType, action: Action, pattern: &str) -> Permission {
    Permission::new(resource, action, pattern.parse::<ObjectPattern>().unwrap())
}

pub fn role(name: &str, permissions: Vec<Permission>) -> Role {
    Role::new(name, permissions)
}

pub fn policy(roles: Vec<Role>, bindings: &[(&str, &[&str])]) -> Policy {
    let bindings = bindings
        .iter()
        .map(|(subject, roles)| {
            (SubjectId::new(*subject), roles.iter().map(|role| RoleName::new(*role)).collect())
        })
        .collect();
    Policy::new(roles, bindings).unwrap()
}

/// Policy source that is never reachable.
pub struct UnreachablePolicySource;

impl PolicySource for UnreachablePolicySource {
    fn snapshot(&self) -> Result<Arc<Policy>, PolicyStoreError> {
        Err(PolicyStoreError::Unavailable("policy backend offline".to_string()))
    }
}

// ============================================================================
// SECTION: Cluster Objects
// ============================================================================

pub fn namespace_object(name: &str, managed: bool) -> ClusterObject {
    let labels = if managed {
        json!({ "app.kubernetes.io/managed-by": "everest" })
    } else {
        json!({ "team": "data" })
    };
    ClusterObject::new(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name, "labels": labels },
    }))
}

pub fn restore_object(namespace: &str, name: &str, cluster: &str, backup: &str) -> ClusterObject {
    ClusterObject::new(json!({
        "apiVersion": "everest.percona.com/v1alpha1",
        "kind": "DatabaseClusterRestore",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": { "clusterName": cluster },
        },
        "spec": {
            "dbClusterName": cluster,
            "dataSource": { "dbClusterBackupName": backup },
        },
    }))
}

pub fn cluster_object(namespace: &str, name: &str, status: Option<&str>) -> ClusterObject {
    let mut value = json!({
        "apiVersion": "everest.percona.com/v1alpha1",
        "kind": "DatabaseCluster",
        "metadata": { "name": name, "namespace": namespace },
        "spec": { "engine": { "type": "pxc", "replicas": 3 } },
    });
    if let Some(status) = status {
        value["status"] = json!({ "status": status });
    }
    ClusterObject::new(value)
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    pub access: Mutex<Vec<AccessAuditEvent>>,
    pub failures: Mutex<Vec<FailureAuditEvent>>,
    pub provisions: Mutex<Vec<ProvisionAuditEvent>>,
}

impl RecordingAuditSink {
    pub fn access_events(&self) -> Vec<AccessAuditEvent> {
        self.access.lock().unwrap().clone()
    }

    pub fn failure_events(&self) -> Vec<FailureAuditEvent> {
        self.failures.lock().unwrap().clone()
    }

    pub fn provision_events(&self) -> Vec<ProvisionAuditEvent> {
        self.provisions.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record_access(&self, event: &AccessAuditEvent) {
        self.access.lock().unwrap().push(event.clone());
    }

    fn record_failure(&self, event: &FailureAuditEvent) {
        self.failures.lock().unwrap().push(event.clone());
    }

    fn record_provision(&self, event: &ProvisionAuditEvent) {
        self.provisions.lock().unwrap().push(event.clone());
    }
}
