// everest-control-core/src/core/mod.rs
// ============================================================================
// Module: Everest Core Types
// Description: Data model shared by the authorization and provisioning paths.
// Purpose: Group identifiers, RBAC model, cluster objects, and domain errors.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain data: they carry no I/O and make no authorization
//! decisions on their own. Runtime components in [`crate::runtime`] compose
//! them with the external interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod constants;
pub mod errors;
pub mod identifiers;
pub mod namespace;
pub mod objects;
pub mod rbac;
pub mod restore;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use errors::ConflictError;
pub use errors::PermissionDenied;
pub use errors::ValidationError;
pub use identifiers::NamespaceName;
pub use identifiers::ObjectId;
pub use identifiers::RoleName;
pub use identifiers::SubjectId;
pub use namespace::NamespaceDecision;
pub use namespace::NamespaceRecord;
pub use namespace::NamespaceState;
pub use namespace::OperatorSelection;
pub use namespace::ProvisionMode;
pub use objects::ClusterObject;
pub use objects::DecodeError;
pub use objects::ObjectMeta;
pub use objects::ResourceKind;
pub use rbac::Action;
pub use rbac::ObjectPattern;
pub use rbac::PatternError;
pub use rbac::PatternSegment;
pub use rbac::Permission;
pub use rbac::Policy;
pub use rbac::PolicyError;
pub use rbac::ResourceType;
pub use rbac::Role;
pub use restore::AppState;
pub use restore::DatabaseCluster;
pub use restore::DatabaseClusterRestore;
pub use restore::DatabaseClusterStatus;
pub use restore::RestoreDataSource;
pub use restore::RestoreSpec;
