// everest-control-core/src/core/errors.rs
// ============================================================================
// Module: Domain Errors
// Description: Caller-correctable error types for validation, access, and conflicts.
// Purpose: Keep recoverable failures distinct from infrastructure faults.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! These errors never wrap an infrastructure cause. Each one is recoverable by
//! the caller changing input or intent; infrastructure faults live in
//! [`crate::runtime::InfrastructureError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::NamespaceName;
use crate::core::identifiers::ObjectId;
use crate::core::identifiers::SubjectId;
use crate::core::rbac::Action;
use crate::core::rbac::ResourceType;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No namespace remained after trimming and dropping blanks.
    #[error("namespace list is empty. Specify at least one namespace")]
    EmptyList,
    /// A requested namespace is reserved by the platform.
    #[error("'{0}' namespace is reserved for Everest internals. Please specify another namespace")]
    Reserved(String),
    /// A value does not satisfy the RFC 1035 label rule.
    #[error(
        "'{value}' is not RFC 1035 compatible. The {field} should contain only lowercase \
         alphanumeric characters or '-', start with an alphabetic character, end with an \
         alphanumeric character"
    )]
    NotCompliant {
        /// Field the value was supplied for.
        field: String,
        /// Offending value.
        value: String,
    },
    /// No operator family was selected for provisioning.
    #[error("no operators selected for installation. Minimum one operator must be selected")]
    NoOperatorsSelected,
    /// Request body is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// ============================================================================
// SECTION: Conflicts
// ============================================================================

/// Requests that conflict with the current cluster state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// Install without take-ownership against an existing namespace.
    #[error("namespace ({0}) already exists")]
    AlreadyExists(NamespaceName),
    /// Update against an absent namespace.
    #[error("namespace ({0}) does not exist")]
    DoesNotExist(NamespaceName),
    /// Update against a namespace this platform does not manage.
    #[error("namespace ({0}) is not managed by Everest")]
    NotManaged(NamespaceName),
    /// Restore creation while the target cluster is already restoring.
    #[error(
        "Another restore process for DB cluster {namespace}/{cluster} is currently in progress. \
         Wait for its completion before initiating another."
    )]
    RestoreInProgress {
        /// Namespace of the target cluster.
        namespace: String,
        /// Target cluster name.
        cluster: String,
    },
}

// ============================================================================
// SECTION: Permission Denied
// ============================================================================

/// Distinguished authorization denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("subject '{subject}' may not {action} {resource} '{object}'")]
pub struct PermissionDenied {
    /// Denied subject.
    pub subject: SubjectId,
    /// Resource type checked.
    pub resource: ResourceType,
    /// Action checked.
    pub action: Action,
    /// Object checked.
    pub object: ObjectId,
}
