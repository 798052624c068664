//! Policies and routing metadata for common audit scenarios.

use kaudit_core::{AuditLevel, PolicyConfig, RequestInfo, DEFAULT_POLICY_NAME};

/// Path of the workspace collection endpoint.
pub const WORKSPACES_PATH: &str = "/kapis/tenant.kubesphere.io/v1alpha2/workspaces";

/// The well-known policy at `level`.
#[must_use]
pub fn policy(level: AuditLevel) -> PolicyConfig {
    PolicyConfig::new(DEFAULT_POLICY_NAME, level)
}

/// A YAML document holding the well-known policy and one unrelated policy.
#[must_use]
pub fn policy_store_yaml(level: AuditLevel) -> String {
    format!(
        "- name: {DEFAULT_POLICY_NAME}\n  auditLevel: {level}\n  k8sAuditingEnabled: true\n\
         - name: unrelated-webhook\n  auditLevel: RequestResponse\n"
    )
}

/// Routing metadata for creating the workspace `test`.
///
/// The router resolves the resource coordinates of this aggregated API path
/// without flagging it as a resource request.
#[must_use]
pub fn workspace_create_info() -> RequestInfo {
    RequestInfo::resource("create", "tenant.kubesphere.io", "v1alpha2", "workspaces")
        .with_resource_request(false)
        .with_name("test")
        .with_path(WORKSPACES_PATH)
}

/// Routing metadata for reading a pod.
#[must_use]
pub fn pod_get_info(namespace: &str, name: &str) -> RequestInfo {
    RequestInfo::resource("get", "", "v1", "pods")
        .with_namespace(namespace)
        .with_name(name)
        .with_path(format!("/api/v1/namespaces/{namespace}/pods/{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_store_yaml_parses() {
        let policies = PolicyConfig::from_yaml(&policy_store_yaml(AuditLevel::Metadata)).unwrap();

        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0], policy(AuditLevel::Metadata).with_k8s_auditing(true));
    }

    #[test]
    fn test_workspace_create_info() {
        let info = workspace_create_info();

        assert!(!info.is_resource_request);
        assert!(info.names_resource());
        assert_eq!(info.path, WORKSPACES_PATH);
    }

    #[test]
    fn test_pod_get_info() {
        let info = pod_get_info("default", "web-0");
        assert_eq!(info.path, "/api/v1/namespaces/default/pods/web-0");
    }
}
