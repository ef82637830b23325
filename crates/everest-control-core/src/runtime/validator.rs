// everest-control-core/src/runtime/validator.rs
// ============================================================================
// Module: Namespace Validator
// Description: Parses and validates comma-separated namespace lists.
// Purpose: Reject reserved and non-compliant names before any cluster call.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Validation is pure. Tokens are trimmed and blanks dropped; each remaining
//! token is checked against the reserved set, then against the RFC 1035 label
//! rule. The first offending token is reported. An empty result is reported
//! only after every token passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::NamespaceName;
use crate::core::ValidationError;
use crate::core::constants::RESERVED_NAMESPACES;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of an RFC 1035 label.
const MAX_LABEL_LEN: usize = 63;

/// Field name reported for namespace values.
const NAMESPACE_FIELD: &str = "namespace";

// ============================================================================
// SECTION: Namespace Set
// ============================================================================

/// Deduplicated namespace names.
///
/// Iteration follows first occurrence in the input, which is the order the
/// provisioner runs steps in. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct NamespaceSet {
    /// Unique names in first-occurrence order.
    names: Vec<NamespaceName>,
}

impl NamespaceSet {
    /// Returns the number of names.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns true when the set contains the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing.as_str() == name)
    }

    /// Iterates names in first-occurrence order.
    pub fn iter(&self) -> std::slice::Iter<'_, NamespaceName> {
        self.names.iter()
    }

    /// Inserts a name unless already present.
    fn insert(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(NamespaceName::new(name));
        }
    }
}

impl PartialEq for NamespaceSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|name| other.contains(name.as_str()))
    }
}

impl Eq for NamespaceSet {}

impl<'a> IntoIterator for &'a NamespaceSet {
    type IntoIter = std::slice::Iter<'a, NamespaceName>;
    type Item = &'a NamespaceName;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for NamespaceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a comma-separated namespace list.
///
/// # Errors
///
/// Returns [`ValidationError::Reserved`] or [`ValidationError::NotCompliant`]
/// for the first offending token, or [`ValidationError::EmptyList`] when no
/// token remains.
pub fn validate_namespaces(raw: &str) -> Result<NamespaceSet, ValidationError> {
    let mut set = NamespaceSet::default();
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        if RESERVED_NAMESPACES.contains(&token) {
            return Err(ValidationError::Reserved(token.to_string()));
        }
        validate_rfc1035(token, NAMESPACE_FIELD)?;
        set.insert(token);
    }
    if set.is_empty() {
        return Err(ValidationError::EmptyList);
    }
    Ok(set)
}

/// Validates a value against the RFC 1035 label rule.
///
/// The value must be 1 to 63 characters of lowercase ASCII alphanumerics and
/// `-`, start with a letter, and end with an alphanumeric.
///
/// # Errors
///
/// Returns [`ValidationError::NotCompliant`] naming the field and value.
pub fn validate_rfc1035(value: &str, field: &str) -> Result<(), ValidationError> {
    if is_rfc1035_label(value) {
        Ok(())
    } else {
        Err(ValidationError::NotCompliant {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Returns true when the value is an RFC 1035 label.
fn is_rfc1035_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    bytes.len() <= MAX_LABEL_LEN
        && first.is_ascii_lowercase()
        && (last.is_ascii_lowercase() || last.is_ascii_digit())
        && bytes.iter().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || *byte == b'-')
}
