// everest-control-core/src/lib.rs
// ============================================================================
// Module: Everest Control Core Library
// Description: Public API surface for the Everest control-plane core.
// Purpose: Expose the access-control engine and namespace provisioning pipeline.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Everest control core gates every operation on cluster-scoped database
//! resources by subject, action, and object identity, and drives the ordered
//! install/update pipeline for tenant database namespaces. It is
//! backend-agnostic: the cluster API, the release installer, and the policy
//! source are reached only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AccessRequest;
pub use interfaces::Authorizer;
pub use interfaces::AuthzDecision;
pub use interfaces::AuthzError;
pub use interfaces::ChartRef;
pub use interfaces::ClusterClient;
pub use interfaces::ClusterError;
pub use interfaces::InstallError;
pub use interfaces::InstallRequest;
pub use interfaces::PolicySource;
pub use interfaces::PolicyStoreError;
pub use interfaces::ReleaseInstaller;
pub use runtime::AccessAuditEvent;
pub use runtime::AccessCheck;
pub use runtime::AppliedAction;
pub use runtime::AuditSink;
pub use runtime::CollectionFilter;
pub use runtime::ControlPlaneError;
pub use runtime::ErrorKind;
pub use runtime::ErrorPayload;
pub use runtime::FailureAuditEvent;
pub use runtime::FileAuditSink;
pub use runtime::InMemoryClusterClient;
pub use runtime::InMemoryPolicyStore;
pub use runtime::InfrastructureError;
pub use runtime::ListProjection;
pub use runtime::NamespaceProvisioner;
pub use runtime::NamespaceSet;
pub use runtime::NamespaceStateResolver;
pub use runtime::NoopAuditSink;
pub use runtime::NoopProgress;
pub use runtime::OwnNameProjection;
pub use runtime::PermitAllAuthorizer;
pub use runtime::PolicyAuthorizer;
pub use runtime::ProgressReporter;
pub use runtime::ProvisionAuditEvent;
pub use runtime::ProvisionOutcome;
pub use runtime::ProvisionPhase;
pub use runtime::ProvisionReport;
pub use runtime::ProvisionRequest;
pub use runtime::RecordedCall;
pub use runtime::RecordingInstaller;
pub use runtime::ResourceAccess;
pub use runtime::RestoreProjection;
pub use runtime::StderrAuditSink;
pub use runtime::TextProgress;
pub use runtime::all_of;
pub use runtime::any_of;
pub use runtime::decide;
pub use runtime::validate_namespaces;
pub use runtime::validate_rfc1035;
