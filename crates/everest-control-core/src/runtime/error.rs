// everest-control-core/src/runtime/error.rs
// ============================================================================
// Module: Control Plane Errors
// Description: Unified error taxonomy returned by the facade and provisioner.
// Purpose: Let transports distinguish denials, conflicts, and faults by kind.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`ControlPlaneError`] is the only error surfaced by the runtime. Its
//! [`ErrorKind`] is what a transport branches on; message text is for humans
//! and must never be matched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ConflictError;
use crate::core::DecodeError;
use crate::core::PermissionDenied;
use crate::core::ValidationError;
use crate::interfaces::AuthzError;
use crate::interfaces::ClusterError;
use crate::interfaces::InstallError;
use crate::interfaces::PolicyStoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal faults in an external dependency or in stored data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfrastructureError {
    /// Cluster API failure.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    /// Release installer failure.
    #[error(transparent)]
    Install(#[from] InstallError),
    /// Stored object could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Policy store failure.
    #[error(transparent)]
    Policy(#[from] PolicyStoreError),
    /// Authorization could not be evaluated.
    #[error(transparent)]
    Authz(#[from] AuthzError),
}

/// Error returned by every control-plane operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    /// Caller input is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Caller lacks a required grant.
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    /// Request conflicts with cluster state.
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    /// External dependency failed.
    #[error("{context}: {source}")]
    Infrastructure {
        /// Operation that failed.
        context: String,
        /// Underlying fault.
        source: InfrastructureError,
    },
    /// Caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl ControlPlaneError {
    /// Wraps an infrastructure fault with the operation it interrupted.
    pub fn infrastructure(
        context: impl Into<String>,
        source: impl Into<InfrastructureError>,
    ) -> Self {
        Self::Infrastructure {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns the transport-facing error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Infrastructure { .. } => ErrorKind::Infrastructure,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns the user-visible payload.
    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            message: self.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Kinds and Payloads
// ============================================================================

/// Error classification for transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input.
    Validation,
    /// Insufficient permission.
    PermissionDenied,
    /// Conflicting state.
    Conflict,
    /// Infrastructure fault.
    Infrastructure,
    /// Cancelled by the caller.
    Cancelled,
}

impl ErrorKind {
    /// Returns the HTTP-equivalent status code.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::PermissionDenied => 403,
            Self::Conflict => 409,
            Self::Infrastructure => 500,
            Self::Cancelled => 499,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::PermissionDenied => "permission_denied",
            Self::Conflict => "conflict",
            Self::Infrastructure => "infrastructure",
            Self::Cancelled => "cancelled",
        }
    }
}

/// User-visible error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable message.
    pub message: String,
}
