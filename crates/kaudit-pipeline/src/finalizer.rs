//! Response completion: turns a pending event into a finished one.

use kaudit_core::RequestInfo;
use kaudit_event::{now, Completion, Event, ObjectReference, PendingEvent, ResponseStatus};
use tracing::debug;

use crate::capture::CapturedResponse;

/// Completes pending events once their response is done.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFinalizer;

impl ResponseFinalizer {
    /// Creates a finalizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Finalizes `pending` with what was observed about the response.
    ///
    /// Takes the pending event by value; an event can only be finalized once.
    /// `responseStatus` is omitted when the handler never wrote a status, for
    /// example because the client went away first.
    #[must_use]
    pub fn on_response_complete(
        &self,
        pending: PendingEvent,
        captured: CapturedResponse,
        info: &RequestInfo,
    ) -> Event {
        let mut completion = Completion::at(now())
            .with_verb(info.verb.as_str())
            .with_request_uri(info.path.as_str())
            .with_scope(
                info.workspace.clone(),
                info.cluster.clone(),
                info.devops.clone(),
            );

        if info.names_resource() {
            completion = completion.with_object_ref(ObjectReference::from(info));
        }
        if let Some(code) = captured.status_code() {
            completion = completion.with_response_status(ResponseStatus::from(code));
        }

        let event = pending.complete(completion);
        debug!(
            audit_id = %event.audit_id(),
            verb = event.verb().unwrap_or_default(),
            code = captured.status_code(),
            "Audit event completed"
        );
        event
    }
}
