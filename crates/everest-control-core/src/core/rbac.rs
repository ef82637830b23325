// everest-control-core/src/core/rbac.rs
// ============================================================================
// Module: RBAC Model
// Description: Resource types, actions, object patterns, permissions, and roles.
// Purpose: Define the immutable policy model consulted by the authorizer.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Permission`] is the triple `(resource type, action, object pattern)`.
//! Object patterns are two segments, `namespace/name`, where either segment
//! may be the wildcard `*`. Matching is exact-or-wildcard per segment and
//! case-sensitive; there is no regex or glob support.
//!
//! A [`Policy`] binds subjects to roles. There are no deny rules: absence of
//! a grant is a deny.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::constants::ADMIN_ROLE;
use crate::core::constants::WILDCARD;
use crate::core::identifiers::ObjectId;
use crate::core::identifiers::RoleName;
use crate::core::identifiers::SubjectId;

// ============================================================================
// SECTION: Resource Types
// ============================================================================

/// Resource families guarded by RBAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    /// Database namespaces.
    Namespaces,
    /// Database engines (operators) installed in a namespace.
    DatabaseEngines,
    /// Database clusters.
    DatabaseClusters,
    /// Database cluster backups.
    DatabaseClusterBackups,
    /// Database cluster restores.
    DatabaseClusterRestores,
    /// Database cluster credentials.
    DatabaseClusterCredentials,
    /// Backup storage definitions.
    BackupStorages,
    /// Monitoring instances.
    MonitoringInstances,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Namespaces,
        Self::DatabaseEngines,
        Self::DatabaseClusters,
        Self::DatabaseClusterBackups,
        Self::DatabaseClusterRestores,
        Self::DatabaseClusterCredentials,
        Self::BackupStorages,
        Self::MonitoringInstances,
    ];

    /// Returns the stable policy label for this resource type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::DatabaseEngines => "database-engines",
            Self::DatabaseClusters => "database-clusters",
            Self::DatabaseClusterBackups => "database-cluster-backups",
            Self::DatabaseClusterRestores => "database-cluster-restores",
            Self::DatabaseClusterCredentials => "database-cluster-credentials",
            Self::BackupStorages => "backup-storages",
            Self::MonitoringInstances => "monitoring-instances",
        }
    }

    /// Parses a policy label into a resource type.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|resource| resource.as_str() == value)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Actions a subject may perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read or list.
    Read,
    /// Create.
    Create,
    /// Update or replace.
    Update,
    /// Delete.
    Delete,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Self; 4] = [Self::Read, Self::Create, Self::Update, Self::Delete];

    /// Returns the stable policy label for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parses a policy label into an action.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == value)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Object Patterns
// ============================================================================

/// One segment of an object pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    /// Matches any value.
    Any,
    /// Matches exactly this value.
    Exact(String),
}

impl PatternSegment {
    /// Returns true when the segment admits the given value.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
        }
    }

    /// Parses a single segment.
    fn parse(value: &str) -> Self {
        if value == WILDCARD { Self::Any } else { Self::Exact(value.to_string()) }
    }
}

impl fmt::Display for PatternSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Exact(value) => f.write_str(value),
        }
    }
}

/// Object pattern of the form `namespace/name`.
///
/// # Invariants
/// - Exactly two non-empty segments separated by a single `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPattern {
    /// Namespace segment.
    namespace: PatternSegment,
    /// Name segment.
    name: PatternSegment,
}

impl ObjectPattern {
    /// Pattern matching every object (`*/*`).
    #[must_use]
    pub const fn any() -> Self {
        Self {
            namespace: PatternSegment::Any,
            name: PatternSegment::Any,
        }
    }

    /// Returns the namespace segment.
    #[must_use]
    pub const fn namespace(&self) -> &PatternSegment {
        &self.namespace
    }

    /// Returns the name segment.
    #[must_use]
    pub const fn name(&self) -> &PatternSegment {
        &self.name
    }

    /// Returns true when both segments admit the object identifier.
    #[must_use]
    pub fn matches(&self, object: &ObjectId) -> bool {
        self.namespace.matches(&object.namespace) && self.name.matches(&object.name)
    }
}

impl FromStr for ObjectPattern {
    type Err = PatternError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((namespace, name)) = value.split_once('/') else {
            return Err(PatternError::MissingSeparator(value.to_string()));
        };
        if namespace.is_empty() || name.is_empty() {
            return Err(PatternError::EmptySegment(value.to_string()));
        }
        if name.contains('/') {
            return Err(PatternError::TooManySegments(value.to_string()));
        }
        Ok(Self {
            namespace: PatternSegment::parse(namespace),
            name: PatternSegment::parse(name),
        })
    }
}

impl TryFrom<String> for ObjectPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectPattern> for String {
    fn from(value: ObjectPattern) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ObjectPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object pattern parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// Pattern has no `/` separator.
    #[error("object pattern '{0}' must have the form namespace/name")]
    MissingSeparator(String),
    /// One of the segments is empty.
    #[error("object pattern '{0}' has an empty segment")]
    EmptySegment(String),
    /// Pattern has more than two segments.
    #[error("object pattern '{0}' has more than two segments")]
    TooManySegments(String),
}

// ============================================================================
// SECTION: Permissions and Roles
// ============================================================================

/// Grant of one action on one resource type for an object pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Resource type the grant applies to.
    pub resource: ResourceType,
    /// Action granted.
    pub action: Action,
    /// Objects the grant covers.
    pub object: ObjectPattern,
}

impl Permission {
    /// Creates a permission.
    #[must_use]
    pub const fn new(resource: ResourceType, action: Action, object: ObjectPattern) -> Self {
        Self {
            resource,
            action,
            object,
        }
    }

    /// Returns true when this permission grants the action on the object.
    #[must_use]
    pub fn grants(&self, resource: ResourceType, action: Action, object: &ObjectId) -> bool {
        self.resource == resource && self.action == action && self.object.matches(object)
    }
}

/// Named, ordered bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub name: RoleName,
    /// Ordered permissions.
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Creates a role.
    #[must_use]
    pub fn new(name: impl Into<RoleName>, permissions: Vec<Permission>) -> Self {
        Self {
            name: name.into(),
            permissions,
        }
    }

    /// Returns true when any permission of the role grants the request.
    #[must_use]
    pub fn grants(&self, resource: ResourceType, action: Action, object: &ObjectId) -> bool {
        self.permissions.iter().any(|permission| permission.grants(resource, action, object))
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Immutable role and binding set evaluated by the authorizer.
///
/// # Invariants
/// - Every bound role except [`ADMIN_ROLE`] is defined in `roles`.
/// - Role names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Roles keyed by name.
    roles: BTreeMap<RoleName, Role>,
    /// Role names bound to each subject, in binding order.
    bindings: BTreeMap<SubjectId, Vec<RoleName>>,
}

impl Policy {
    /// Builds a policy from role definitions and subject bindings.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when a role is defined twice or a binding
    /// references an undefined role.
    pub fn new(
        roles: Vec<Role>,
        bindings: Vec<(SubjectId, Vec<RoleName>)>,
    ) -> Result<Self, PolicyError> {
        let mut by_name = BTreeMap::new();
        for role in roles {
            if role.name.as_str() == ADMIN_ROLE {
                return Err(PolicyError::ReservedRole(role.name));
            }
            if by_name.contains_key(&role.name) {
                return Err(PolicyError::DuplicateRole(role.name));
            }
            by_name.insert(role.name.clone(), role);
        }
        let mut bound: BTreeMap<SubjectId, Vec<RoleName>> = BTreeMap::new();
        for (subject, role_names) in bindings {
            for role_name in &role_names {
                if role_name.as_str() != ADMIN_ROLE && !by_name.contains_key(role_name) {
                    return Err(PolicyError::UndefinedRole {
                        subject: subject.clone(),
                        role: role_name.clone(),
                    });
                }
            }
            bound.entry(subject).or_default().extend(role_names);
        }
        Ok(Self {
            roles: by_name,
            bindings: bound,
        })
    }

    /// Returns true when the subject is bound to the reserved admin role.
    #[must_use]
    pub fn is_admin(&self, subject: &SubjectId) -> bool {
        self.bindings
            .get(subject)
            .is_some_and(|roles| roles.iter().any(|role| role.as_str() == ADMIN_ROLE))
    }

    /// Returns the roles bound to a subject, in binding order.
    pub fn roles_for<'a>(&'a self, subject: &SubjectId) -> impl Iterator<Item = &'a Role> + 'a {
        self.bindings
            .get(subject)
            .into_iter()
            .flatten()
            .filter_map(|name| self.roles.get(name))
    }

    /// Returns a role by name.
    #[must_use]
    pub fn role(&self, name: &RoleName) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Returns the number of defined roles.
    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Returns the number of bound subjects.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.bindings.len()
    }
}

/// Policy construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The reserved admin role cannot be redefined.
    #[error("role '{0}' is reserved and cannot carry permissions")]
    ReservedRole(RoleName),
    /// A role name appears more than once.
    #[error("role '{0}' is defined more than once")]
    DuplicateRole(RoleName),
    /// A binding references a role that is not defined.
    #[error("subject '{subject}' is bound to undefined role '{role}'")]
    UndefinedRole {
        /// Subject carrying the binding.
        subject: SubjectId,
        /// Missing role name.
        role: RoleName,
    },
}
