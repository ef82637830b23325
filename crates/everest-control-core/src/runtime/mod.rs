// everest-control-core/src/runtime/mod.rs
// ============================================================================
// Module: Everest Control Runtime
// Description: Authorization, list filtering, guarded access, and provisioning.
// Purpose: Compose core types with the external interfaces.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime components are re-entrant and hold no per-request state. Every
//! external call is raced against a caller-owned cancellation token.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod authorizer;
pub mod cancel;
pub mod error;
pub mod facade;
pub mod filter;
pub mod memory;
pub mod policy_store;
pub mod provisioner;
pub mod resolver;
pub mod steps;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessAuditEvent;
pub use audit::AuditSink;
pub use audit::FailureAuditEvent;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ProvisionAuditEvent;
pub use audit::ProvisionPhase;
pub use audit::StderrAuditSink;
pub use authorizer::AccessCheck;
pub use authorizer::PermitAllAuthorizer;
pub use authorizer::PolicyAuthorizer;
pub use authorizer::all_of;
pub use authorizer::any_of;
pub use cancel::ensure_not_cancelled;
pub use cancel::run_cancellable;
pub use error::ControlPlaneError;
pub use error::ErrorKind;
pub use error::ErrorPayload;
pub use error::InfrastructureError;
pub use facade::ResourceAccess;
pub use filter::CollectionFilter;
pub use filter::ListProjection;
pub use filter::OwnNameProjection;
pub use filter::RestoreProjection;
pub use memory::InMemoryClusterClient;
pub use memory::RecordedCall;
pub use memory::RecordingInstaller;
pub use policy_store::InMemoryPolicyStore;
pub use provisioner::AppliedAction;
pub use provisioner::NamespaceProvisioner;
pub use provisioner::ProvisionOutcome;
pub use provisioner::ProvisionReport;
pub use provisioner::ProvisionRequest;
pub use provisioner::decide;
pub use resolver::NamespaceStateResolver;
pub use steps::NoopProgress;
pub use steps::ProgressReporter;
pub use steps::TextProgress;
pub use validator::NamespaceSet;
pub use validator::validate_namespaces;
pub use validator::validate_rfc1035;
