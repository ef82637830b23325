// everest-control-core/src/runtime/policy_store.rs
// ============================================================================
// Module: In-Memory Policy Store
// Description: Read-shared policy holder with whole-snapshot replacement.
// Purpose: Serve immutable policy snapshots to concurrent requests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Readers clone an `Arc<Policy>` under a read lock and evaluate it without
//! holding the lock. [`InMemoryPolicyStore::replace`] swaps the whole snapshot,
//! so an in-flight request keeps seeing the policy it started with.

use std::sync::Arc;
use std::sync::RwLock;

use crate::core::Policy;
use crate::interfaces::PolicySource;
use crate::interfaces::PolicyStoreError;

/// Policy store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    /// Current snapshot.
    policy: RwLock<Arc<Policy>>,
}

impl InMemoryPolicyStore {
    /// Creates a store serving the given policy.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            policy: RwLock::new(Arc::new(policy)),
        }
    }

    /// Replaces the served policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyStoreError`] when the store lock is poisoned.
    pub fn replace(&self, policy: Policy) -> Result<(), PolicyStoreError> {
        let mut guard = self
            .policy
            .write()
            .map_err(|_| PolicyStoreError::Unavailable("policy store lock poisoned".to_string()))?;
        *guard = Arc::new(policy);
        Ok(())
    }
}

impl PolicySource for InMemoryPolicyStore {
    fn snapshot(&self) -> Result<Arc<Policy>, PolicyStoreError> {
        self.policy
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| PolicyStoreError::Unavailable("policy store lock poisoned".to_string()))
    }
}
