//! Audit events for the kaudit request-auditing pipeline.
//!
//! This crate provides the record produced for every audited request:
//! - [`PendingEvent`] - the event as built at request entry
//! - [`Event`] - the terminal event after the response completed
//! - [`EventDispatcher`] - hands finished events to one or more backends
//!
//! # Features
//!
//! - Stable correlation ids (UUID v7) fixed at creation
//! - Level-gated request/response bodies, enforced when they are recorded
//! - Compact serialization: absent fields are omitted, field order is fixed
//! - Tracing, in-memory, and bounded-queue delivery backends
//!
//! # Example
//!
//! ```rust
//! use kaudit_core::{AuditLevel, UserInfo};
//! use kaudit_event::{now, Completion, EventDispatcher, InMemoryBackend, PendingEvent};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! let dispatcher = EventDispatcher::builder()
//!     .with_backend(backend.clone())
//!     .build();
//!
//! let pending = PendingEvent::new(
//!     AuditLevel::Metadata,
//!     UserInfo::new("admin"),
//!     vec!["10.0.0.1".to_string()],
//!     now(),
//! );
//! let event = pending.complete(Completion::at(now()).with_verb("get"));
//! dispatcher.dispatch(&event).unwrap();
//!
//! assert_eq!(backend.events().len(), 1);
//! ```

mod dispatch;
mod event;
mod schema;

pub use dispatch::{
    ChannelBackend, DispatchError, EventBackend, EventDispatcher, EventDispatcherBuilder,
    InMemoryBackend, TracingBackend,
};
pub use event::{
    now, AuditId, Completion, Event, ObjectReference, PendingEvent, ResponseStatus, Stage,
};
pub use schema::{
    audit_event_schema, EventSchema, FieldDefinition, FieldType, Phase, CURRENT_SCHEMA_VERSION,
};
