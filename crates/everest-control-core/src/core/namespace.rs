// everest-control-core/src/core/namespace.rs
// ============================================================================
// Module: Namespace Model
// Description: Namespace ownership state, operator selection, and provisioning decisions.
// Purpose: Give the provisioning state machine explicit, immutable inputs and outputs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A database namespace moves from absent, to present but unmanaged (created
//! by something else), to present and managed once the installer has applied
//! the ownership label. Ownership is derived from the label at resolve time;
//! it is never stored separately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::errors::ConflictError;
use crate::core::identifiers::NamespaceName;

// ============================================================================
// SECTION: State
// ============================================================================

/// Existence and ownership state of a namespace in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceState {
    /// Namespace does not exist.
    Absent,
    /// Namespace exists without the ownership label.
    PresentUnmanaged,
    /// Namespace exists and carries the ownership label.
    PresentManaged,
}

impl NamespaceState {
    /// Returns true when the namespace exists.
    #[must_use]
    pub const fn exists(self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Returns true when the namespace carries the ownership label.
    #[must_use]
    pub const fn managed(self) -> bool {
        matches!(self, Self::PresentManaged)
    }
}

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Immutable selection of database operator families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorSelection {
    /// Percona XtraDB Cluster (MySQL).
    pub pxc: bool,
    /// Percona Server for MongoDB.
    pub psmdb: bool,
    /// Percona Operator for PostgreSQL.
    pub pg: bool,
}

impl OperatorSelection {
    /// Selection with every operator family enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            pxc: true,
            psmdb: true,
            pg: true,
        }
    }

    /// Returns true when at least one operator family is selected.
    #[must_use]
    pub const fn any(self) -> bool {
        self.pxc || self.psmdb || self.pg
    }
}

/// Observed record for one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    /// Namespace name.
    pub name: NamespaceName,
    /// Resolved state.
    pub state: NamespaceState,
    /// Operators requested for the namespace.
    pub operators: OperatorSelection,
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Requested provisioning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ProvisionMode {
    /// Install a new database namespace.
    Install {
        /// Permit install into a pre-existing namespace.
        take_ownership: bool,
    },
    /// Update a managed database namespace.
    Update,
}

/// Outcome of the provisioning decision table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceDecision {
    /// Install the release.
    Install {
        /// Ask the installer to create the namespace.
        create_namespace: bool,
    },
    /// Upgrade the existing release.
    Update,
    /// Terminal conflict, reported verbatim.
    Conflict(ConflictError),
}
