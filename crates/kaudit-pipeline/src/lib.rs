//! # kaudit-pipeline
//!
//! Request auditing for an HTTP control plane.
//!
//! A request passes through three stages:
//!
//! 1. [`RequestInterceptor::on_request_received`] resolves the audit level
//!    from the well-known policy object and builds a [`PendingEvent`] with the
//!    principal and client address.
//! 2. [`ResponseCapture`] wraps the response sink and records the status the
//!    handler sends.
//! 3. [`ResponseFinalizer::on_response_complete`] consumes the pending event
//!    and produces the finished [`Event`].
//!
//! [`Auditing`] bundles the stages with an [`EventDispatcher`], and
//! [`AuditLayer`] runs them as tower middleware.
//!
//! [`PendingEvent`]: kaudit_event::PendingEvent
//! [`Event`]: kaudit_event::Event
//! [`EventDispatcher`]: kaudit_event::EventDispatcher

pub mod auditing;
pub mod capture;
pub mod config;
pub mod finalizer;
pub mod interceptor;
pub mod layer;
pub mod policy;

pub use auditing::Auditing;
pub use capture::{CaptureHandle, CapturedResponse, MemoryResponse, ResponseCapture, ResponseWriter};
pub use config::{AuditingConfig, ConfigError, X_CLIENT_IP, X_REAL_IP};
pub use finalizer::ResponseFinalizer;
pub use interceptor::{source_ips, RequestInterceptor};
pub use layer::{AuditBody, AuditLayer, AuditService};
pub use policy::{InMemoryPolicyStore, PolicyLookup, PolicyResolver};
