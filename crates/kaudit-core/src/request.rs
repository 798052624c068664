//! Routing metadata for an inbound request.
//!
//! [`RequestInfo`] is computed by the host's router before (or while) the
//! handler runs. The pipeline treats it as an already-resolved description of
//! what the request targets and never parses URLs itself.

use serde::{Deserialize, Serialize};

/// Pre-resolved description of the logical target of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestInfo {
    /// Whether the router classified the request as a resource request.
    pub is_resource_request: bool,

    /// Normalized request path.
    pub path: String,

    /// Action verb (`get`, `list`, `create`, ...).
    pub verb: String,

    /// API group of the target resource.
    pub api_group: String,

    /// API version of the target resource.
    pub api_version: String,

    /// Namespace of the target, if namespaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Resource kind (plural form).
    pub resource: String,

    /// Subresource, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subresource: Option<String>,

    /// Name of the target object; empty for collection requests.
    pub name: String,

    /// Tenant workspace the request is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Member cluster the request is routed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    /// DevOps project the request is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devops: Option<String>,
}

impl RequestInfo {
    /// Creates routing metadata for a resource request.
    #[must_use]
    pub fn resource(
        verb: impl Into<String>,
        api_group: impl Into<String>,
        api_version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            is_resource_request: true,
            verb: verb.into(),
            api_group: api_group.into(),
            api_version: api_version.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// Creates routing metadata for a non-resource request such as `/healthz`.
    #[must_use]
    pub fn non_resource(verb: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the resource-request flag.
    #[must_use]
    pub const fn with_resource_request(mut self, is_resource_request: bool) -> Self {
        self.is_resource_request = is_resource_request;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the object name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the subresource.
    #[must_use]
    pub fn with_subresource(mut self, subresource: impl Into<String>) -> Self {
        self.subresource = Some(subresource.into());
        self
    }

    /// Sets the workspace.
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Sets the cluster.
    #[must_use]
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Sets the DevOps project.
    #[must_use]
    pub fn with_devops(mut self, devops: impl Into<String>) -> Self {
        self.devops = Some(devops.into());
        self
    }

    /// Returns true if the metadata identifies a concrete resource target.
    ///
    /// Some routers resolve resource coordinates for aggregated API paths
    /// without setting `is_resource_request`, so a named resource kind counts
    /// as a target on its own.
    #[must_use]
    pub fn names_resource(&self) -> bool {
        self.is_resource_request || !self.resource.is_empty()
    }
}
