//! Entry point tying the pipeline stages together.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Request;
use kaudit_core::{AuditLevel, RequestInfo, UserInfo};
use kaudit_event::{Event, EventDispatcher, PendingEvent};
use tracing::{debug, error};

use crate::capture::CapturedResponse;
use crate::config::{AuditingConfig, ConfigError};
use crate::finalizer::ResponseFinalizer;
use crate::interceptor::RequestInterceptor;
use crate::policy::{PolicyLookup, PolicyResolver};

/// The auditing pipeline for one server.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self`.
#[derive(Debug)]
pub struct Auditing {
    resolver: Arc<PolicyResolver>,
    interceptor: RequestInterceptor,
    finalizer: ResponseFinalizer,
    dispatcher: EventDispatcher,
}

impl Auditing {
    /// Creates the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: &AuditingConfig,
        lookup: Arc<dyn PolicyLookup>,
        dispatcher: EventDispatcher,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolver = Arc::new(PolicyResolver::new(lookup, config.policy_name.as_str()));
        let interceptor = RequestInterceptor::new(resolver.clone(), config.header_names()?);

        Ok(Self {
            resolver,
            interceptor,
            finalizer: ResponseFinalizer::new(),
            dispatcher,
        })
    }

    /// Returns the policy resolver.
    #[must_use]
    pub const fn resolver(&self) -> &Arc<PolicyResolver> {
        &self.resolver
    }

    /// Returns true if requests should currently be audited.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.resolver.is_auditing_enabled()
    }

    /// Returns true if the orchestrator's own audit stream should be collected.
    #[must_use]
    pub fn is_k8s_auditing_enabled(&self) -> bool {
        self.resolver.is_k8s_auditing_enabled()
    }

    /// Returns the current audit level.
    #[must_use]
    pub fn audit_level(&self) -> AuditLevel {
        self.resolver.audit_level()
    }

    /// See [`RequestInterceptor::on_request_received`].
    pub fn on_request_received<B>(
        &self,
        request: &Request<B>,
        user: Option<&UserInfo>,
        remote_addr: Option<SocketAddr>,
    ) -> PendingEvent {
        self.interceptor
            .on_request_received(request, user, remote_addr)
    }

    /// See [`ResponseFinalizer::on_response_complete`].
    #[must_use]
    pub fn on_response_complete(
        &self,
        pending: PendingEvent,
        captured: CapturedResponse,
        info: &RequestInfo,
    ) -> Event {
        self.finalizer.on_response_complete(pending, captured, info)
    }

    /// Hands a finished event to the dispatcher.
    ///
    /// Delivery problems are logged and never surface to the caller.
    pub fn emit(&self, event: &Event) {
        if !event.level().is_enabled() {
            debug!(audit_id = %event.audit_id(), "Audit level is None, event not emitted");
            return;
        }
        if let Err(e) = self.dispatcher.dispatch(event) {
            error!(audit_id = %event.audit_id(), error = %e, "Failed to emit audit event");
        }
    }

    /// Finalizes `pending` and emits the result.
    pub fn finish(&self, pending: PendingEvent, captured: CapturedResponse, info: &RequestInfo) {
        let event = self.on_response_complete(pending, captured, info);
        self.emit(&event);
    }
}
