//! Audit policy resolution.
//!
//! The policy object is kept current by an external watch loop that calls
//! [`InMemoryPolicyStore::apply`] and [`InMemoryPolicyStore::delete`]. Every
//! request reads it synchronously through [`PolicyResolver`]; nothing on the
//! request path performs I/O.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use kaudit_core::{AuditLevel, PolicyConfig};
use parking_lot::RwLock;
use tracing::debug;

/// Read-only, name-keyed view of policy objects.
pub trait PolicyLookup: Send + Sync + Debug {
    /// Returns the policy with the given name, if present.
    fn by_name(&self, name: &str) -> Option<Arc<PolicyConfig>>;
}

/// Process-wide policy cache shared by all requests.
///
/// Reads take a shared lock and clone an [`Arc`], so concurrent requests never
/// contend with each other; only updates from the watch loop take the
/// exclusive lock.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: RwLock<HashMap<String, Arc<PolicyConfig>>>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given policies.
    #[must_use]
    pub fn with_policies(policies: impl IntoIterator<Item = PolicyConfig>) -> Self {
        let store = Self::new();
        for policy in policies {
            store.apply(policy);
        }
        store
    }

    /// Inserts or replaces a policy, returning the previous version.
    pub fn apply(&self, policy: PolicyConfig) -> Option<Arc<PolicyConfig>> {
        debug!(
            policy = %policy.name,
            level = %policy.level,
            k8s_auditing = policy.k8s_auditing_enabled,
            "Applying audit policy"
        );
        self.policies
            .write()
            .insert(policy.name.clone(), Arc::new(policy))
    }

    /// Removes a policy, returning it if it was present.
    pub fn delete(&self, name: &str) -> Option<Arc<PolicyConfig>> {
        debug!(policy = name, "Deleting audit policy");
        self.policies.write().remove(name)
    }

    /// Returns the names of all stored policies, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.policies.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of stored policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    /// Returns true if no policies are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}

impl PolicyLookup for InMemoryPolicyStore {
    fn by_name(&self, name: &str) -> Option<Arc<PolicyConfig>> {
        self.policies.read().get(name).cloned()
    }
}

/// Derives the audit gate from the well-known policy object.
///
/// Only the policy whose name matches the configured one is consulted; any
/// other policy objects in the store are ignored.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    lookup: Arc<dyn PolicyLookup>,
    policy_name: String,
}

impl PolicyResolver {
    /// Creates a resolver reading `policy_name` from `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<dyn PolicyLookup>, policy_name: impl Into<String>) -> Self {
        Self {
            lookup,
            policy_name: policy_name.into(),
        }
    }

    /// Returns the name of the consulted policy.
    #[must_use]
    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    /// Returns the configured level, or [`AuditLevel::None`] if the policy is absent.
    #[must_use]
    pub fn audit_level(&self) -> AuditLevel {
        self.current().map_or(AuditLevel::None, |policy| policy.level)
    }

    /// Returns true if requests should be audited.
    #[must_use]
    pub fn is_auditing_enabled(&self) -> bool {
        self.audit_level().is_enabled()
    }

    /// Returns true if the orchestrator's own audit stream should be collected.
    #[must_use]
    pub fn is_k8s_auditing_enabled(&self) -> bool {
        self.current()
            .is_some_and(|policy| policy.k8s_auditing_enabled)
    }

    fn current(&self) -> Option<Arc<PolicyConfig>> {
        let policy = self.lookup.by_name(&self.policy_name);
        if policy.is_none() {
            debug!(policy = %self.policy_name, "Audit policy not synced, auditing disabled");
        }
        policy
    }
}
