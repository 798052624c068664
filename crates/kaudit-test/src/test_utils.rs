//! Request builder and assertion helpers.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use kaudit_core::{RequestInfo, UserInfo};
use serde_json::Value;
use std::net::SocketAddr;

/// Fluent builder for inbound requests.
///
/// The principal, routing metadata and remote address are attached as
/// request extensions, the way authentication and routing layers leave them.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    method: Option<String>,
    uri: Option<String>,
    headers: Vec<(String, String)>,
    user: Option<UserInfo>,
    info: Option<RequestInfo>,
    remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
    /// Creates a `GET /` request builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the request URI.
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds an `X-Client-IP` header.
    #[must_use]
    pub fn client_ip(self, ip: impl Into<String>) -> Self {
        self.header("X-Client-IP", ip)
    }

    /// Attaches the authenticated principal.
    #[must_use]
    pub fn user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }

    /// Attaches routing metadata.
    #[must_use]
    pub fn info(mut self, info: RequestInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Attaches the peer address of the connection.
    #[must_use]
    pub const fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Builds the request with an empty body.
    ///
    /// # Panics
    ///
    /// Panics if the method, URI or a header is malformed.
    #[must_use]
    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder()
            .method(self.method.as_deref().unwrap_or("GET"))
            .uri(self.uri.as_deref().unwrap_or("/"));
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut request = builder
            .body(Body::empty())
            .expect("request parts should be valid");
        let extensions = request.extensions_mut();
        if let Some(user) = self.user {
            extensions.insert(user);
        }
        if let Some(info) = self.info {
            extensions.insert(info);
        }
        if let Some(addr) = self.remote_addr {
            extensions.insert(ConnectInfo(addr));
        }
        request
    }
}

/// Parses a serialized event.
///
/// # Panics
///
/// Panics if `json` is not a JSON object.
#[must_use]
pub fn parse_event(json: &str) -> Value {
    let value: Value = serde_json::from_str(json).expect("event should be valid JSON");
    assert!(value.is_object(), "event should be a JSON object: {json}");
    value
}

/// Asserts that none of `fields` appear in `event`.
///
/// # Panics
///
/// Panics on the first field that is present.
pub fn assert_absent(event: &Value, fields: &[&str]) {
    for field in fields {
        assert!(
            event.get(field).is_none(),
            "expected '{field}' to be omitted, got {}",
            event[field]
        );
    }
}
