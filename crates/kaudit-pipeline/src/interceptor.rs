//! Request entry: builds the pending event for an inbound request.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, HeaderName, Request};
use kaudit_core::UserInfo;
use kaudit_event::{now, PendingEvent};
use tracing::trace;

use crate::policy::PolicyResolver;

/// Creates a [`PendingEvent`] for each audited request.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    resolver: Arc<PolicyResolver>,
    client_ip_headers: Vec<HeaderName>,
}

impl RequestInterceptor {
    /// Creates an interceptor trusting `client_ip_headers`, in priority order.
    #[must_use]
    pub const fn new(resolver: Arc<PolicyResolver>, client_ip_headers: Vec<HeaderName>) -> Self {
        Self {
            resolver,
            client_ip_headers,
        }
    }

    /// Returns the trusted client address headers.
    #[must_use]
    pub fn client_ip_headers(&self) -> &[HeaderName] {
        &self.client_ip_headers
    }

    /// Builds the pending event for `request`.
    ///
    /// The audit level is resolved once here and fixed for the lifetime of
    /// the event. A missing principal yields an empty user. Never fails.
    pub fn on_request_received<B>(
        &self,
        request: &Request<B>,
        user: Option<&UserInfo>,
        remote_addr: Option<SocketAddr>,
    ) -> PendingEvent {
        let level = self.resolver.audit_level();
        let source_ips = source_ips(request.headers(), &self.client_ip_headers, remote_addr);

        let mut pending =
            PendingEvent::new(level, user.cloned().unwrap_or_default(), source_ips, now());
        if let Some(agent) = request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
        {
            pending = pending.with_user_agent(agent);
        }

        trace!(
            audit_id = %pending.audit_id(),
            level = %level,
            method = %request.method(),
            "Audit event created"
        );
        pending
    }
}

/// Determines the client address of a request.
///
/// The value of the first `trusted` header that is present and non-empty is
/// used verbatim. Otherwise the IP of `remote_addr` is used, with the IPv6
/// loopback reported as `127.0.0.1`. Returns an empty list when neither is
/// available.
#[must_use]
pub fn source_ips(
    headers: &HeaderMap,
    trusted: &[HeaderName],
    remote_addr: Option<SocketAddr>,
) -> Vec<String> {
    let forwarded = trusted.iter().find_map(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    });

    if let Some(ip) = forwarded {
        return vec![ip.to_string()];
    }

    remote_addr
        .map(|addr| vec![normalize_ip(addr.ip()).to_string()])
        .unwrap_or_default()
}

fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip.to_canonical() {
        IpAddr::V6(v6) if v6 == Ipv6Addr::LOCALHOST => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other,
    }
}
