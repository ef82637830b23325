// everest-control-core/src/runtime/authorizer.rs
// ============================================================================
// Module: Policy Authorizer
// Description: Role-based authorization and composable any/all checks.
// Purpose: Decide subject access from policy snapshots, failing closed.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`PolicyAuthorizer`] short-circuits for the admin role, then grants access
//! when any permission of any bound role matches. Nothing is cached: every
//! call reads a fresh snapshot.
//!
//! Role aggregation is disjunctive, but some operations need several grants
//! at once. [`any_of`] and [`all_of`] are the two composition primitives and
//! are deliberately kept apart.
//!
//! ## Invariants
//! - A missing grant is [`AuthzDecision::Denied`], never an error.
//! - A malformed object identifier is an error, never a denial.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::Action;
use crate::core::ObjectId;
use crate::core::ResourceType;
use crate::core::SubjectId;
use crate::interfaces::AccessRequest;
use crate::interfaces::Authorizer;
use crate::interfaces::AuthzDecision;
use crate::interfaces::AuthzError;
use crate::interfaces::PolicySource;

// ============================================================================
// SECTION: Authorizers
// ============================================================================

/// Authorizer backed by a policy source.
#[derive(Clone)]
pub struct PolicyAuthorizer {
    /// Policy snapshot source.
    source: Arc<dyn PolicySource>,
}

impl PolicyAuthorizer {
    /// Creates an authorizer over a policy source.
    #[must_use]
    pub fn new(source: Arc<dyn PolicySource>) -> Self {
        Self { source }
    }
}

impl Authorizer for PolicyAuthorizer {
    fn authorize(&self, request: &AccessRequest<'_>) -> Result<AuthzDecision, AuthzError> {
        if !request.object.is_well_formed() {
            return Err(AuthzError::MalformedObject(request.object.to_string()));
        }
        let policy = self.source.snapshot()?;
        if policy.is_admin(request.subject) {
            return Ok(AuthzDecision::Allowed);
        }
        let granted = policy
            .roles_for(request.subject)
            .any(|role| role.grants(request.resource, request.action, request.object));
        Ok(if granted { AuthzDecision::Allowed } else { AuthzDecision::Denied })
    }
}

/// Authorizer used when RBAC is disabled.
///
/// # Invariants
/// - Always returns an allow decision.
pub struct PermitAllAuthorizer;

impl Authorizer for PermitAllAuthorizer {
    fn authorize(&self, _request: &AccessRequest<'_>) -> Result<AuthzDecision, AuthzError> {
        Ok(AuthzDecision::Allowed)
    }
}

// ============================================================================
// SECTION: Composition
// ============================================================================

/// One `(resource, action, object)` check for a composite decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    /// Resource type.
    pub resource: ResourceType,
    /// Action.
    pub action: Action,
    /// Object identifier.
    pub object: ObjectId,
}

impl AccessCheck {
    /// Creates a check.
    #[must_use]
    pub const fn new(resource: ResourceType, action: Action, object: ObjectId) -> Self {
        Self {
            resource,
            action,
            object,
        }
    }

    /// Builds the authorization request for a subject.
    #[must_use]
    pub const fn request<'a>(&'a self, subject: &'a SubjectId) -> AccessRequest<'a> {
        AccessRequest {
            subject,
            resource: self.resource,
            action: self.action,
            object: &self.object,
        }
    }
}

/// Allows when at least one check is allowed.
///
/// Checks run in order and stop at the first allow. An empty slice denies.
///
/// # Errors
///
/// Returns the first [`AuthzError`] encountered.
pub fn any_of(
    authorizer: &dyn Authorizer,
    subject: &SubjectId,
    checks: &[AccessCheck],
) -> Result<AuthzDecision, AuthzError> {
    for check in checks {
        if authorizer.authorize(&check.request(subject))?.is_allowed() {
            return Ok(AuthzDecision::Allowed);
        }
    }
    Ok(AuthzDecision::Denied)
}

/// Requires every check to be allowed.
///
/// Checks run in order and stop at the first denial. Returns the denied
/// check, or `None` when every check is allowed.
///
/// # Errors
///
/// Returns the first [`AuthzError`] encountered.
pub fn all_of<'c>(
    authorizer: &dyn Authorizer,
    subject: &SubjectId,
    checks: &'c [AccessCheck],
) -> Result<Option<&'c AccessCheck>, AuthzError> {
    for check in checks {
        if !authorizer.authorize(&check.request(subject))?.is_allowed() {
            return Ok(Some(check));
        }
    }
    Ok(None)
}
