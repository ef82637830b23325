// everest-control-core/src/runtime/provisioner.rs
// ============================================================================
// Module: Namespace Provisioner
// Description: Ordered install/update pipeline for database namespaces.
// Purpose: Validate, resolve, decide, and apply one release per namespace.
// Dependencies: tokio-util, crate::interfaces
// ============================================================================

//! ## Overview
//! Each namespace moves through `Requested -> Resolved -> Decided -> Applied`
//! or ends in `Failed`. Validation of the whole request runs before the first
//! step. Steps run strictly in input order, one at a time, and the first
//! failure of any kind stops the pipeline. Nothing is retried or rolled back.
//!
//! ## Decision Table
//! | mode                      | state             | decision                  |
//! |---------------------------|-------------------|---------------------------|
//! | install                   | absent            | install, create namespace |
//! | install                   | present (any)     | conflict: already exists  |
//! | install + take-ownership  | absent            | install, create namespace |
//! | install + take-ownership  | present (any)     | install                   |
//! | update                    | absent            | conflict: does not exist  |
//! | update                    | present-unmanaged | conflict: not managed     |
//! | update                    | present-managed   | update                    |

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::ConflictError;
use crate::core::NamespaceDecision;
use crate::core::NamespaceName;
use crate::core::NamespaceRecord;
use crate::core::NamespaceState;
use crate::core::OperatorSelection;
use crate::core::ProvisionMode;
use crate::core::ValidationError;
use crate::core::constants::DB_NAMESPACE_SUBCHART_PATH;
use crate::core::constants::MANAGED_BY_LABEL;
use crate::core::constants::MANAGED_BY_VALUE;
use crate::interfaces::ChartRef;
use crate::interfaces::InstallRequest;
use crate::interfaces::ReleaseInstaller;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::FailureAuditEvent;
use crate::runtime::audit::ProvisionAuditEvent;
use crate::runtime::audit::ProvisionPhase;
use crate::runtime::cancel::ensure_not_cancelled;
use crate::runtime::cancel::run_cancellable;
use crate::runtime::error::ControlPlaneError;
use crate::runtime::resolver::NamespaceStateResolver;
use crate::runtime::steps::ProgressReporter;
use crate::runtime::validator::validate_namespaces;

// ============================================================================
// SECTION: Decision Table
// ============================================================================

/// Maps a requested mode and resolved state to a provisioning decision.
#[must_use]
pub fn decide(
    mode: ProvisionMode,
    namespace: &NamespaceName,
    state: NamespaceState,
) -> NamespaceDecision {
    match (mode, state) {
        (ProvisionMode::Install { .. }, NamespaceState::Absent) => NamespaceDecision::Install {
            create_namespace: true,
        },
        (
            ProvisionMode::Install {
                take_ownership: false,
            },
            NamespaceState::PresentUnmanaged | NamespaceState::PresentManaged,
        ) => NamespaceDecision::Conflict(ConflictError::AlreadyExists(namespace.clone())),
        (
            ProvisionMode::Install {
                take_ownership: true,
            },
            NamespaceState::PresentUnmanaged | NamespaceState::PresentManaged,
        ) => NamespaceDecision::Install {
            create_namespace: false,
        },
        (ProvisionMode::Update, NamespaceState::Absent) => {
            NamespaceDecision::Conflict(ConflictError::DoesNotExist(namespace.clone()))
        }
        (ProvisionMode::Update, NamespaceState::PresentUnmanaged) => {
            NamespaceDecision::Conflict(ConflictError::NotManaged(namespace.clone()))
        }
        (ProvisionMode::Update, NamespaceState::PresentManaged) => NamespaceDecision::Update,
    }
}

// ============================================================================
// SECTION: Requests and Reports
// ============================================================================

/// Provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Raw comma-separated namespace list.
    pub namespaces: String,
    /// Requested mode.
    pub mode: ProvisionMode,
    /// Operators to enable in every namespace.
    pub operators: OperatorSelection,
    /// Disable telemetry in the installed release.
    pub disable_telemetry: bool,
}

impl ProvisionRequest {
    /// Creates an install request.
    #[must_use]
    pub fn install(
        namespaces: impl Into<String>,
        take_ownership: bool,
        operators: OperatorSelection,
    ) -> Self {
        Self {
            namespaces: namespaces.into(),
            mode: ProvisionMode::Install { take_ownership },
            operators,
            disable_telemetry: false,
        }
    }

    /// Creates an update request.
    #[must_use]
    pub fn update(namespaces: impl Into<String>, operators: OperatorSelection) -> Self {
        Self {
            namespaces: namespaces.into(),
            mode: ProvisionMode::Update,
            operators,
            disable_telemetry: false,
        }
    }

    /// Sets the telemetry toggle.
    #[must_use]
    pub const fn with_telemetry_disabled(mut self, disabled: bool) -> Self {
        self.disable_telemetry = disabled;
        self
    }
}

/// Action applied to one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum AppliedAction {
    /// Release installed.
    Installed {
        /// The installer created the namespace.
        created_namespace: bool,
    },
    /// Release upgraded.
    Updated,
}

/// Outcome for one applied namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    /// Namespace as observed before the step.
    pub record: NamespaceRecord,
    /// Action applied.
    pub action: AppliedAction,
}

/// Outcomes of a fully applied request, in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Per-namespace outcomes.
    pub outcomes: Vec<ProvisionOutcome>,
}

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Drives the per-namespace provisioning pipeline.
pub struct NamespaceProvisioner {
    /// Namespace state resolver.
    resolver: NamespaceStateResolver,
    /// Release installer.
    installer: Arc<dyn ReleaseInstaller>,
    /// Chart installed into each namespace.
    chart: ChartRef,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl NamespaceProvisioner {
    /// Creates a provisioner.
    ///
    /// A chart directory is taken to be a checkout of the main chart; the
    /// database namespace sub-chart inside it is installed.
    #[must_use]
    pub fn new(
        resolver: NamespaceStateResolver,
        installer: Arc<dyn ReleaseInstaller>,
        mut chart: ChartRef,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        chart.directory = chart.directory.map(|dir| dir.join(DB_NAMESPACE_SUBCHART_PATH));
        Self {
            resolver,
            installer,
            chart,
            audit,
        }
    }

    /// Validates the request, then provisions each namespace in order.
    ///
    /// # Errors
    ///
    /// Returns the first error of any kind; later namespaces are not touched.
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ProvisionReport, ControlPlaneError> {
        let namespaces = validate_namespaces(&request.namespaces)?;
        if !request.operators.any() {
            return Err(ValidationError::NoOperatorsSelected.into());
        }
        let mut report = ProvisionReport::default();
        for namespace in &namespaces {
            ensure_not_cancelled(cancel)?;
            let description = step_description(request.mode, namespace);
            progress.step_started(&description);
            self.audit.record_provision(&ProvisionAuditEvent::new(
                namespace.as_str(),
                ProvisionPhase::Started,
                None,
            ));
            match self.run_step(request, namespace, cancel).await {
                Ok(outcome) => {
                    progress.step_succeeded(&description);
                    self.audit.record_provision(&ProvisionAuditEvent::new(
                        namespace.as_str(),
                        ProvisionPhase::Applied,
                        None,
                    ));
                    report.outcomes.push(outcome);
                }
                Err(err) => {
                    progress.step_failed(&description, &err);
                    self.audit.record_provision(&ProvisionAuditEvent::new(
                        namespace.as_str(),
                        ProvisionPhase::Failed,
                        Some(err.to_string()),
                    ));
                    if let ControlPlaneError::Infrastructure { context, .. } = &err {
                        self.audit
                            .record_failure(&FailureAuditEvent::new(context.clone(), err.to_string()));
                    }
                    return Err(err);
                }
            }
        }
        Ok(report)
    }

    /// Resolves, decides, and applies one namespace.
    async fn run_step(
        &self,
        request: &ProvisionRequest,
        namespace: &NamespaceName,
        cancel: &CancellationToken,
    ) -> Result<ProvisionOutcome, ControlPlaneError> {
        let state = self.resolver.resolve(namespace, cancel).await?;
        let action = match decide(request.mode, namespace, state) {
            NamespaceDecision::Conflict(conflict) => return Err(conflict.into()),
            NamespaceDecision::Install { create_namespace } => {
                AppliedAction::Installed {
                    created_namespace: create_namespace,
                }
            }
            NamespaceDecision::Update => AppliedAction::Updated,
        };
        let install = self.install_request(request, namespace, action);
        ensure_not_cancelled(cancel)?;
        run_cancellable(cancel, async {
            self.installer.install(&install).await.map_err(|err| {
                ControlPlaneError::infrastructure(format!("install release {namespace}"), err)
            })
        })
        .await?;
        Ok(ProvisionOutcome {
            record: NamespaceRecord {
                name: namespace.clone(),
                state,
                operators: request.operators,
            },
            action,
        })
    }

    /// Builds the installer request for one namespace.
    fn install_request(
        &self,
        request: &ProvisionRequest,
        namespace: &NamespaceName,
        action: AppliedAction,
    ) -> InstallRequest {
        InstallRequest {
            release_name: namespace.to_string(),
            release_namespace: namespace.to_string(),
            chart: self.chart.clone(),
            values: release_values(request.operators, request.disable_telemetry),
            namespace_labels: BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )]),
            create_namespace: matches!(
                action,
                AppliedAction::Installed {
                    created_namespace: true
                }
            ),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the operator-facing step description.
fn step_description(mode: ProvisionMode, namespace: &NamespaceName) -> String {
    match mode {
        ProvisionMode::Install { .. } => format!("Installing namespace '{namespace}'"),
        ProvisionMode::Update => format!("Updating namespace '{namespace}'"),
    }
}

/// Returns the release values in their fixed order.
fn release_values(operators: OperatorSelection, disable_telemetry: bool) -> Vec<String> {
    vec![
        "cleanupOnUninstall=false".to_string(),
        format!("pxc={}", operators.pxc),
        format!("postgresql={}", operators.pg),
        format!("psmdb={}", operators.psmdb),
        format!("telemetry={}", !disable_telemetry),
    ]
}

#[cfg(test)]
mod tests;
