//! Delivery of finished audit events.
//!
//! The dispatcher serializes each event once and hands the JSON to every
//! configured backend. Shipping events to a remote collector is the job of
//! whatever consumes a backend (for example the receiving end of a
//! [`ChannelBackend`]).

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::event::Event;

/// Backend trait for audit event delivery.
pub trait EventBackend: Send + Sync + Debug {
    /// Delivers one serialized audit event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be accepted.
    fn log(&self, event_json: &str) -> Result<(), DispatchError>;

    /// Flushes any buffered events.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> Result<(), DispatchError>;

    /// Returns the backend name for identification.
    fn name(&self) -> &'static str;
}

/// Errors that can occur during event delivery.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Serialization error
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The delivery queue is full; the event was dropped
    #[error("Event queue full, dropped event")]
    QueueFull,

    /// The receiving side of the delivery queue is gone
    #[error("Event queue closed")]
    QueueClosed,

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Sends finished events to the configured backends.
#[derive(Debug)]
pub struct EventDispatcher {
    /// Backends to send events to
    backends: Vec<Arc<dyn EventBackend>>,

    /// Whether dispatch is enabled
    enabled: bool,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    /// Creates a new dispatcher with no backends.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backends: Vec::new(),
            enabled: true,
        }
    }

    /// Creates a builder for configuring the dispatcher.
    #[must_use]
    pub fn builder() -> EventDispatcherBuilder {
        EventDispatcherBuilder::new()
    }

    /// Sends an event to all configured backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be serialized.
    /// Backend errors are logged but do not cause this method to fail.
    pub fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        if !self.enabled {
            debug!(audit_id = %event.audit_id(), "Event dispatch disabled, skipping event");
            return Ok(());
        }

        let json = event.to_json()?;

        for backend in &self.backends {
            if let Err(e) = backend.log(&json) {
                error!(
                    audit_id = %event.audit_id(),
                    backend = backend.name(),
                    error = %e,
                    "Failed to deliver audit event"
                );
            }
        }

        Ok(())
    }

    /// Returns the number of configured backends.
    #[must_use]
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }
}

/// Builder for configuring an event dispatcher.
#[derive(Debug)]
pub struct EventDispatcherBuilder {
    backends: Vec<Arc<dyn EventBackend>>,
    enabled: bool,
}

impl Default for EventDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcherBuilder {
    /// Creates a new builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backends: Vec::new(),
            enabled: true,
        }
    }

    /// Adds a backend to the dispatcher.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn EventBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Enables or disables the dispatcher.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds the dispatcher.
    #[must_use]
    pub fn build(self) -> EventDispatcher {
        EventDispatcher {
            backends: self.backends,
            enabled: self.enabled,
        }
    }
}

/// Tracing-based backend that logs events via tracing macros.
#[derive(Debug, Default)]
pub struct TracingBackend;

impl TracingBackend {
    /// Creates a new tracing backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventBackend for TracingBackend {
    fn log(&self, event_json: &str) -> Result<(), DispatchError> {
        let value: serde_json::Value = serde_json::from_str(event_json)?;

        let code = value
            .pointer("/responseStatus/code")
            .and_then(serde_json::Value::as_u64);

        match code {
            Some(code) if code >= 500 => warn!(audit_event = %event_json, "Audit event"),
            _ => info!(audit_event = %event_json, "Audit event"),
        }

        Ok(())
    }

    fn flush(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// In-memory backend for testing.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    events: Mutex<Vec<String>>,
}

impl InMemoryBackend {
    /// Creates a new in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all delivered events.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Clears all delivered events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventBackend for InMemoryBackend {
    fn log(&self, event_json: &str) -> Result<(), DispatchError> {
        self.events.lock().push(event_json.to_string());
        Ok(())
    }

    fn flush(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Backend that queues events on a bounded channel for a shipping task.
///
/// Never blocks the request path: when the queue is full the event is
/// dropped and [`DispatchError::QueueFull`] is returned.
#[derive(Debug, Clone)]
pub struct ChannelBackend {
    sender: mpsc::Sender<String>,
}

impl ChannelBackend {
    /// Creates a backend and the receiver the shipping task drains.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Returns the number of events that can still be queued.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

impl EventBackend for ChannelBackend {
    fn log(&self, event_json: &str) -> Result<(), DispatchError> {
        self.sender
            .try_send(event_json.to_string())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("Audit event queue full, dropping event");
                    DispatchError::QueueFull
                }
                mpsc::error::TrySendError::Closed(_) => DispatchError::QueueClosed,
            })
    }

    fn flush(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{now, Completion, PendingEvent, ResponseStatus};
    use kaudit_core::{AuditLevel, UserInfo};

    fn finished_event(code: u16) -> Event {
        PendingEvent::new(
            AuditLevel::Metadata,
            UserInfo::new("admin"),
            vec!["10.0.0.1".to_string()],
            now(),
        )
        .complete(Completion::at(now()).with_response_status(ResponseStatus::from(code)))
    }

    #[test]
    fn test_dispatcher_with_in_memory_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let dispatcher = EventDispatcher::builder()
            .with_backend(backend.clone())
            .build();

        let event = finished_event(200);
        dispatcher.dispatch(&event).unwrap();

        let events = backend.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].contains(&event.audit_id().to_string()));
    }

    #[test]
    fn test_dispatcher_disabled() {
        let backend = Arc::new(InMemoryBackend::new());
        let dispatcher = EventDispatcher::builder()
            .with_backend(backend.clone())
            .enabled(false)
            .build();

        dispatcher.dispatch(&finished_event(200)).unwrap();

        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_multiple_backends() {
        let backend1 = Arc::new(InMemoryBackend::new());
        let backend2 = Arc::new(InMemoryBackend::new());

        let dispatcher = EventDispatcher::builder()
            .with_backend(backend1.clone())
            .with_backend(backend2.clone())
            .build();

        dispatcher.dispatch(&finished_event(200)).unwrap();

        assert_eq!(backend1.events().len(), 1);
        assert_eq!(backend2.events().len(), 1);
        assert_eq!(dispatcher.backend_count(), 2);
    }

    #[test]
    fn test_backend_failure_does_not_fail_dispatch() {
        let (channel, receiver) = ChannelBackend::new(1);
        drop(receiver);
        let memory = Arc::new(InMemoryBackend::new());

        let dispatcher = EventDispatcher::builder()
            .with_backend(Arc::new(channel))
            .with_backend(memory.clone())
            .build();

        dispatcher.dispatch(&finished_event(200)).unwrap();
        assert_eq!(memory.events().len(), 1);
    }

    #[test]
    fn test_tracing_backend() {
        let backend = TracingBackend::new();

        backend.log(r#"{"level":"Metadata","responseStatus":{"code":503}}"#).unwrap();
        backend.log(r#"{"level":"Metadata"}"#).unwrap();
        backend.flush().unwrap();
        assert_eq!(backend.name(), "tracing");
    }

    #[test]
    fn test_in_memory_backend_clear() {
        let backend = InMemoryBackend::new();
        backend.log(r#"{"event":"test"}"#).unwrap();
        assert_eq!(backend.events().len(), 1);

        backend.clear();
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_channel_backend_drops_when_full() {
        let (backend, _receiver) = ChannelBackend::new(1);

        backend.log("first").unwrap();
        assert!(matches!(backend.log("second"), Err(DispatchError::QueueFull)));
        assert_eq!(backend.remaining_capacity(), 0);
    }

    #[tokio::test]
    async fn test_channel_backend_delivers_in_order() {
        let (backend, mut receiver) = ChannelBackend::new(8);
        let dispatcher = EventDispatcher::builder()
            .with_backend(Arc::new(backend))
            .build();

        let first = finished_event(200);
        let second = finished_event(404);
        dispatcher.dispatch(&first).unwrap();
        dispatcher.dispatch(&second).unwrap();

        assert_eq!(receiver.recv().await.unwrap(), first.to_json().unwrap());
        assert_eq!(receiver.recv().await.unwrap(), second.to_json().unwrap());
    }
}
