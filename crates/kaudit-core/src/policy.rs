//! The cluster-wide auditing policy object.
//!
//! A [`PolicyConfig`] is created and updated by an external controller; the
//! pipeline only ever reads it. Policy documents use the same camelCase field
//! names the control plane stores:
//!
//! ```yaml
//! name: kube-auditing-webhook
//! auditLevel: RequestResponse
//! k8sAuditingEnabled: true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::level::AuditLevel;

/// Name of the policy object the pipeline consults by default.
pub const DEFAULT_POLICY_NAME: &str = "kube-auditing-webhook";

/// Auditing policy for a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Object name; lookups are keyed by it.
    pub name: String,

    /// Verbosity applied to every audited request.
    #[serde(rename = "auditLevel", default)]
    pub level: AuditLevel,

    /// Whether the orchestrator's own audit stream should be collected too.
    #[serde(rename = "k8sAuditingEnabled", default)]
    pub k8s_auditing_enabled: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyDocument {
    Many(Vec<PolicyConfig>),
    One(PolicyConfig),
}

impl PolicyConfig {
    /// Creates a policy with the given name and level.
    #[must_use]
    pub fn new(name: impl Into<String>, level: AuditLevel) -> Self {
        Self {
            name: name.into(),
            level,
            k8s_auditing_enabled: false,
        }
    }

    /// Sets the orchestrator auditing flag.
    #[must_use]
    pub const fn with_k8s_auditing(mut self, enabled: bool) -> Self {
        self.k8s_auditing_enabled = enabled;
        self
    }

    /// Checks the policy for structural problems.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains whitespace.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::PolicyValidationError {
                reason: "policy name cannot be empty".to_string(),
            });
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(Error::PolicyValidationError {
                reason: format!("policy name '{}' contains whitespace", self.name),
            });
        }
        Ok(())
    }

    /// Parses one policy or a list of policies from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or any policy fails
    /// [`validate`](Self::validate).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kaudit_core::{AuditLevel, PolicyConfig};
    ///
    /// let policies = PolicyConfig::from_yaml("name: audit\nauditLevel: Request\n").unwrap();
    /// assert_eq!(policies[0].level, AuditLevel::Request);
    /// ```
    pub fn from_yaml(content: &str) -> Result<Vec<Self>> {
        let document: PolicyDocument =
            serde_yaml::from_str(content).map_err(|e| Error::PolicyParseError {
                reason: e.to_string(),
            })?;

        let policies = match document {
            PolicyDocument::Many(policies) => policies,
            PolicyDocument::One(policy) => vec![policy],
        };

        for policy in &policies {
            policy.validate()?;
        }

        Ok(policies)
    }
}
