// everest-control-core/tests/provisioner.rs
// ============================================================================
// Module: Namespace Provisioner Tests
// Description: Decision table, ordered fail-fast steps, and installer requests.
// Purpose: Validate the provisioning state machine against in-memory backends.
// Dependencies: everest-control-core, tokio, tokio-util
// ============================================================================
//! ## Overview
//! Exercises validation-before-provisioning, the install/update decision
//! table, fail-fast ordering, cancellation, and the installer contract.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use everest_control_core::AppliedAction;
use everest_control_core::ChartRef;
use everest_control_core::ClusterError;
use everest_control_core::ConflictError;
use everest_control_core::ControlPlaneError;
use everest_control_core::ErrorKind;
use everest_control_core::InMemoryClusterClient;
use everest_control_core::InstallError;
use everest_control_core::InstallRequest;
use everest_control_core::NamespaceDecision;
use everest_control_core::NamespaceName;
use everest_control_core::NamespaceProvisioner;
use everest_control_core::NamespaceState;
use everest_control_core::NamespaceStateResolver;
use everest_control_core::NoopProgress;
use everest_control_core::OperatorSelection;
use everest_control_core::ProvisionMode;
use everest_control_core::ProvisionPhase;
use everest_control_core::ProvisionRequest;
use everest_control_core::RecordingInstaller;
use everest_control_core::ReleaseInstaller;
use everest_control_core::ResourceKind;
use everest_control_core::TextProgress;
use everest_control_core::ValidationError;
use everest_control_core::decide;
use tokio_util::sync::CancellationToken;

use crate::common::RecordingAuditSink;
use crate::common::namespace_object;

struct Harness {
    cluster: Arc<InMemoryClusterClient>,
    installer: Arc<RecordingInstaller>,
    audit: Arc<RecordingAuditSink>,
    provisioner: NamespaceProvisioner,
}

fn chart() -> ChartRef {
    ChartRef {
        name: "everest-db-namespace".to_string(),
        version: Some("1.2.0".to_string()),
        repo_url: Some("https://percona.github.io/percona-helm-charts/".to_string()),
        directory: None,
    }
}

fn harness_with_chart(chart: ChartRef) -> Harness {
    let cluster = Arc::new(InMemoryClusterClient::new());
    let installer = Arc::new(RecordingInstaller::with_cluster(cluster.clone()));
    let audit = Arc::new(RecordingAuditSink::default());
    let provisioner = NamespaceProvisioner::new(
        NamespaceStateResolver::new(cluster.clone()),
        installer.clone(),
        chart,
        audit.clone(),
    );
    Harness {
        cluster,
        installer,
        audit,
        provisioner,
    }
}

/// Installer that cancels the run from inside its first install and then
/// never completes.
struct CancellingInstaller {
    cancel: CancellationToken,
    requests: Mutex<Vec<InstallRequest>>,
}

#[async_trait]
impl ReleaseInstaller for CancellingInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<(), InstallError> {
        self.requests.lock().unwrap().push(request.clone());
        self.cancel.cancel();
        std::future::pending::<()>().await;
        Ok(())
    }
}

fn harness() -> Harness {
    harness_with_chart(chart())
}

fn install(namespaces: &str, take_ownership: bool) -> ProvisionRequest {
    ProvisionRequest::install(namespaces, take_ownership, OperatorSelection::all())
}

// ============================================================================
// SECTION: Decision Table
// ============================================================================

#[test]
fn decision_table_holds_for_every_row() {
    let ns = NamespaceName::new("db1");
    let plain = ProvisionMode::Install {
        take_ownership: false,
    };
    let owning = ProvisionMode::Install {
        take_ownership: true,
    };
    let rows = [
        (plain, NamespaceState::Absent, NamespaceDecision::Install {
            create_namespace: true,
        }),
        (
            plain,
            NamespaceState::PresentUnmanaged,
            NamespaceDecision::Conflict(ConflictError::AlreadyExists(ns.clone())),
        ),
        (
            plain,
            NamespaceState::PresentManaged,
            NamespaceDecision::Conflict(ConflictError::AlreadyExists(ns.clone())),
        ),
        (owning, NamespaceState::Absent, NamespaceDecision::Install {
            create_namespace: true,
        }),
        (owning, NamespaceState::PresentUnmanaged, NamespaceDecision::Install {
            create_namespace: false,
        }),
        (owning, NamespaceState::PresentManaged, NamespaceDecision::Install {
            create_namespace: false,
        }),
        (
            ProvisionMode::Update,
            NamespaceState::Absent,
            NamespaceDecision::Conflict(ConflictError::DoesNotExist(ns.clone())),
        ),
        (
            ProvisionMode::Update,
            NamespaceState::PresentUnmanaged,
            NamespaceDecision::Conflict(ConflictError::NotManaged(ns.clone())),
        ),
        (ProvisionMode::Update, NamespaceState::PresentManaged, NamespaceDecision::Update),
    ];
    for (mode, state, expected) in rows {
        assert_eq!(decide(mode, &ns, state), expected, "{mode:?} {state:?}");
    }
}

#[test]
fn conflict_messages_match_operator_wording() {
    let ns = NamespaceName::new("db1");
    assert_eq!(ConflictError::AlreadyExists(ns.clone()).to_string(), "namespace (db1) already exists");
    assert_eq!(ConflictError::DoesNotExist(ns.clone()).to_string(), "namespace (db1) does not exist");
    assert_eq!(ConflictError::NotManaged(ns).to_string(), "namespace (db1) is not managed by Everest");
}

// ============================================================================
// SECTION: End-to-End Scenarios
// ============================================================================

#[tokio::test]
async fn reserved_name_fails_before_any_step() {
    let h = harness();
    let err = h
        .provisioner
        .provision(&install("db1,db1,everest-system", false), &NoopProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, ControlPlaneError::Validation(ValidationError::Reserved("everest-system".to_string())));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.cluster.calls().unwrap().is_empty());
    assert!(h.installer.requests().unwrap().is_empty());
    assert!(h.audit.provision_events().is_empty());
}

#[tokio::test]
async fn update_on_unmanaged_namespace_never_installs() {
    let h = harness();
    h.cluster.insert(ResourceKind::Namespace, namespace_object("db1", false)).unwrap();

    let err = h
        .provisioner
        .provision(
            &ProvisionRequest::update("db1", OperatorSelection::all()),
            &NoopProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err, ControlPlaneError::Conflict(ConflictError::NotManaged(NamespaceName::new("db1"))));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(h.installer.requests().unwrap().is_empty());
}

#[tokio::test]
async fn install_into_absent_namespace_creates_and_labels_it() {
    let h = harness();
    let request = ProvisionRequest::install("db1", false, OperatorSelection {
        pxc: true,
        psmdb: false,
        pg: true,
    })
    .with_telemetry_disabled(true);

    let report =
        h.provisioner.provision(&request, &NoopProgress, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].record.state, NamespaceState::Absent);
    assert_eq!(report.outcomes[0].action, AppliedAction::Installed {
        created_namespace: true
    });

    let requests = h.installer.requests().unwrap();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.release_name, "db1");
    assert_eq!(sent.release_namespace, "db1");
    assert!(sent.create_namespace);
    assert_eq!(sent.chart, chart());
    assert_eq!(sent.values, vec![
        "cleanupOnUninstall=false",
        "pxc=true",
        "postgresql=true",
        "psmdb=false",
        "telemetry=false",
    ]);
    assert_eq!(
        sent.namespace_labels,
        BTreeMap::from([("app.kubernetes.io/managed-by".to_string(), "everest".to_string())])
    );

    let resolver = NamespaceStateResolver::new(h.cluster.clone());
    let state = resolver.resolve(&NamespaceName::new("db1"), &CancellationToken::new()).await.unwrap();
    assert_eq!(state, NamespaceState::PresentManaged);
}

#[tokio::test]
async fn take_ownership_installs_without_creating_namespace() {
    let h = harness();
    h.cluster.insert(ResourceKind::Namespace, namespace_object("legacy", false)).unwrap();

    let report = h
        .provisioner
        .provision(&install("legacy", true), &NoopProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].record.state, NamespaceState::PresentUnmanaged);
    let requests = h.installer.requests().unwrap();
    assert!(!requests[0].create_namespace);
}

#[tokio::test]
async fn install_then_update_round_trip() {
    let h = harness();
    let cancel = CancellationToken::new();
    h.provisioner.provision(&install("db1", false), &NoopProgress, &cancel).await.unwrap();

    let report = h
        .provisioner
        .provision(&ProvisionRequest::update("db1", OperatorSelection::all()), &NoopProgress, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].record.state, NamespaceState::PresentManaged);
    assert_eq!(report.outcomes[0].action, AppliedAction::Updated);
    let requests = h.installer.requests().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(!requests[1].create_namespace);
}

#[tokio::test]
async fn first_failure_halts_remaining_namespaces() {
    let h = harness();
    h.cluster.insert(ResourceKind::Namespace, namespace_object("db2", true)).unwrap();

    let err = h
        .provisioner
        .provision(&install("db1,db2,db3", false), &NoopProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, ControlPlaneError::Conflict(ConflictError::AlreadyExists(NamespaceName::new("db2"))));
    let installed: Vec<String> =
        h.installer.requests().unwrap().into_iter().map(|request| request.release_namespace).collect();
    assert_eq!(installed, vec!["db1"]);
    let resolved: Vec<Option<String>> = h
        .cluster
        .calls()
        .unwrap()
        .into_iter()
        .filter(|call| call.verb == "get")
        .map(|call| call.name)
        .collect();
    assert_eq!(resolved, vec![Some("db1".to_string()), Some("db2".to_string())]);

    let phases: Vec<(String, ProvisionPhase)> = h
        .audit
        .provision_events()
        .into_iter()
        .map(|event| (event.namespace, event.phase))
        .collect();
    assert_eq!(phases, vec![
        ("db1".to_string(), ProvisionPhase::Started),
        ("db1".to_string(), ProvisionPhase::Applied),
        ("db2".to_string(), ProvisionPhase::Started),
        ("db2".to_string(), ProvisionPhase::Failed),
    ]);
    assert!(h.audit.failure_events().is_empty());
}

#[tokio::test]
async fn installer_failure_is_infrastructure_and_halts() {
    let h = harness();
    h.installer
        .fail_namespace("db1", InstallError::Failed("chart not found".to_string()))
        .unwrap();

    let err = h
        .provisioner
        .provision(&install("db1,db2", false), &NoopProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    assert_eq!(h.installer.requests().unwrap().len(), 1);
    assert_eq!(h.audit.failure_events().len(), 1);
}

#[tokio::test]
async fn cluster_outage_is_infrastructure() {
    let h = harness();
    h.cluster.fail_with(ClusterError::Unavailable("connection refused".to_string())).unwrap();

    let err = h
        .provisioner
        .provision(&install("db1", false), &NoopProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    assert_eq!(err.kind().status_code(), 500);
    assert!(h.installer.requests().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_token_starts_no_step() {
    let h = harness();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h.provisioner.provision(&install("db1", false), &NoopProgress, &cancel).await.unwrap_err();

    assert_eq!(err, ControlPlaneError::Cancelled);
    assert_eq!(err.kind().status_code(), 499);
    assert!(h.cluster.calls().unwrap().is_empty());
}

#[tokio::test]
async fn cancellation_during_install_aborts_and_skips_later_steps() {
    let cluster = Arc::new(InMemoryClusterClient::new());
    let audit = Arc::new(RecordingAuditSink::default());
    let cancel = CancellationToken::new();
    let installer = Arc::new(CancellingInstaller {
        cancel: cancel.clone(),
        requests: Mutex::new(Vec::new()),
    });
    let provisioner = NamespaceProvisioner::new(
        NamespaceStateResolver::new(cluster.clone()),
        installer.clone(),
        chart(),
        audit.clone(),
    );

    let err = provisioner.provision(&install("db1,db2", false), &NoopProgress, &cancel).await.unwrap_err();

    assert_eq!(err, ControlPlaneError::Cancelled);
    let installs = installer.requests.lock().unwrap().clone();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].release_namespace, "db1");
    let calls = cluster.calls().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].verb, "get");
    assert_eq!(calls[0].name.as_deref(), Some("db1"));
    assert!(!calls.iter().any(|call| call.name.as_deref() == Some("db2")));
    let phases: Vec<_> = audit.provision_events().iter().map(|event| event.phase).collect();
    assert_eq!(phases, vec![ProvisionPhase::Started, ProvisionPhase::Failed]);
}

#[tokio::test]
async fn no_operator_selected_is_rejected() {
    let h = harness();
    let request = ProvisionRequest::install("db1", false, OperatorSelection::default());

    let err = h.provisioner.provision(&request, &NoopProgress, &CancellationToken::new()).await.unwrap_err();

    assert_eq!(err, ControlPlaneError::Validation(ValidationError::NoOperatorsSelected));
    assert!(h.cluster.calls().unwrap().is_empty());
}

#[tokio::test]
async fn chart_directory_points_at_subchart() {
    let h = harness_with_chart(ChartRef {
        directory: Some(PathBuf::from("/src/everest")),
        ..chart()
    });

    h.provisioner.provision(&install("db1", false), &NoopProgress, &CancellationToken::new()).await.unwrap();

    let requests = h.installer.requests().unwrap();
    assert_eq!(
        requests[0].chart.directory,
        Some(PathBuf::from("/src/everest/charts/everest-db-namespace"))
    );
}

#[tokio::test]
async fn text_progress_reports_each_step() {
    let h = harness();
    h.cluster.insert(ResourceKind::Namespace, namespace_object("db2", false)).unwrap();
    let progress = TextProgress::new(Vec::new(), false);

    let result =
        h.provisioner.provision(&install("db1,db2", false), &progress, &CancellationToken::new()).await;
    assert!(result.is_err());

    let output = String::from_utf8(progress.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec![
        "Installing namespace 'db1'",
        "Installing namespace 'db1': ok",
        "Installing namespace 'db2'",
        "Installing namespace 'db2': failed: namespace (db2) already exists",
    ]);
}
