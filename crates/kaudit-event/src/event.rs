//! Audit event definitions.

use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, SubsecRound, Utc};
use kaudit_core::{AuditLevel, RequestInfo, UserInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::{Timestamp, Uuid};

/// Returns the current time at the microsecond precision audit events carry.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Correlation id linking a request's entry and completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(Uuid);

impl AuditId {
    /// Generates a new time-ordered (v7) id.
    #[must_use]
    pub fn generate() -> Self {
        let ts = Timestamp::now(uuid::NoContext);
        Self(Uuid::new_v7(ts))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle marker of an event.
///
/// Only the terminal stage is modeled; an event without a stage is still
/// pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// The response has been fully produced (or the request was aborted).
    ResponseComplete,
}

/// Reference to the object a request targeted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// Resource kind (plural form).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,

    /// Namespace of the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Object name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// API group.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_group: String,

    /// API version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Subresource, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subresource: Option<String>,
}

impl From<&RequestInfo> for ObjectReference {
    fn from(info: &RequestInfo) -> Self {
        Self {
            resource: info.resource.clone(),
            namespace: info.namespace.clone(),
            name: info.name.clone(),
            api_group: info.api_group.clone(),
            api_version: info.api_version.clone(),
            subresource: info.subresource.clone(),
        }
    }
}

/// Status of the response sent for the audited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// HTTP status code.
    pub code: u16,
}

impl From<u16> for ResponseStatus {
    fn from(code: u16) -> Self {
        Self { code }
    }
}

/// One audited request/response cycle.
///
/// Fields fixed at creation (`auditID`, `level`, `user`, `sourceIPs`,
/// `requestReceivedTimestamp`) have no setters. The remaining fields are
/// written once, by [`PendingEvent::complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    level: AuditLevel,

    #[serde(rename = "auditID")]
    audit_id: AuditId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,

    #[serde(rename = "requestURI", default, skip_serializing_if = "Option::is_none")]
    request_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    verb: Option<String>,

    #[serde(default, skip_serializing_if = "UserInfo::is_empty")]
    user: UserInfo,

    #[serde(rename = "sourceIPs", default, skip_serializing_if = "Vec::is_empty")]
    source_ips: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_ref: Option<ObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_status: Option<ResponseStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_object: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_object: Option<Value>,

    request_received_timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    stage_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    workspace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    cluster: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    devops: Option<String>,
}

impl Event {
    /// Returns the correlation id.
    #[must_use]
    pub const fn audit_id(&self) -> AuditId {
        self.audit_id
    }

    /// Returns the level resolved when the event was created.
    #[must_use]
    pub const fn level(&self) -> AuditLevel {
        self.level
    }

    /// Returns the lifecycle stage, `None` while pending.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Returns the principal that issued the request.
    #[must_use]
    pub const fn user(&self) -> &UserInfo {
        &self.user
    }

    /// Returns the client addresses, most trusted first.
    #[must_use]
    pub fn source_ips(&self) -> &[String] {
        &self.source_ips
    }

    /// Returns the client's user agent.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the request URI.
    #[must_use]
    pub fn request_uri(&self) -> Option<&str> {
        self.request_uri.as_deref()
    }

    /// Returns the verb.
    #[must_use]
    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    /// Returns the targeted object.
    #[must_use]
    pub const fn object_ref(&self) -> Option<&ObjectReference> {
        self.object_ref.as_ref()
    }

    /// Returns the response status.
    #[must_use]
    pub const fn response_status(&self) -> Option<ResponseStatus> {
        self.response_status
    }

    /// Returns the recorded request body.
    #[must_use]
    pub const fn request_object(&self) -> Option<&Value> {
        self.request_object.as_ref()
    }

    /// Returns the recorded response body.
    #[must_use]
    pub const fn response_object(&self) -> Option<&Value> {
        self.response_object.as_ref()
    }

    /// Returns when the request was received.
    #[must_use]
    pub const fn request_received_timestamp(&self) -> DateTime<Utc> {
        self.request_received_timestamp
    }

    /// Returns when the event reached its stage.
    #[must_use]
    pub const fn stage_timestamp(&self) -> Option<DateTime<Utc>> {
        self.stage_timestamp
    }

    /// Returns the workspace scope.
    #[must_use]
    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    /// Returns the cluster scope.
    #[must_use]
    pub fn cluster(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    /// Returns the DevOps project scope.
    #[must_use]
    pub fn devops(&self) -> Option<&str> {
        self.devops.as_deref()
    }

    /// Returns true if the level permits recording the request body.
    #[must_use]
    pub fn can_record_request_object(&self) -> bool {
        self.level.records_request_body()
    }

    /// Returns true if the level permits recording the response body.
    #[must_use]
    pub fn can_record_response_object(&self) -> bool {
        self.level.records_response_body()
    }

    /// Serializes the event to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorded body cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An event between request entry and response completion.
///
/// Dereferences to [`Event`] for reading. The only way to reach the terminal
/// stage is [`complete`](Self::complete), which consumes the pending event, so
/// an event cannot be finalized twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PendingEvent {
    event: Event,
}

impl PendingEvent {
    /// Creates a pending event with a fresh correlation id.
    #[must_use]
    pub fn new(
        level: AuditLevel,
        user: UserInfo,
        source_ips: Vec<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event: Event {
                level,
                audit_id: AuditId::generate(),
                stage: None,
                request_uri: None,
                verb: None,
                user,
                source_ips,
                user_agent: None,
                object_ref: None,
                response_status: None,
                request_object: None,
                response_object: None,
                request_received_timestamp: received_at,
                stage_timestamp: None,
                workspace: None,
                cluster: None,
                devops: None,
            },
        }
    }

    /// Sets the client's user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.event.user_agent = non_empty(user_agent.into());
        self
    }

    /// Records the request body if the level permits it.
    ///
    /// `body` is only invoked when the level is at least
    /// [`AuditLevel::Request`]. Returns true if a body was recorded.
    pub fn record_request_object<F>(&mut self, body: F) -> bool
    where
        F: FnOnce() -> Option<Value>,
    {
        if !self.event.can_record_request_object() {
            return false;
        }
        self.event.request_object = body();
        self.event.request_object.is_some()
    }

    /// Records the response body if the level permits it.
    ///
    /// `body` is only invoked when the level is
    /// [`AuditLevel::RequestResponse`]. Returns true if a body was recorded.
    pub fn record_response_object<F>(&mut self, body: F) -> bool
    where
        F: FnOnce() -> Option<Value>,
    {
        if !self.event.can_record_response_object() {
            return false;
        }
        self.event.response_object = body();
        self.event.response_object.is_some()
    }

    /// Moves the event to [`Stage::ResponseComplete`].
    #[must_use]
    pub fn complete(self, completion: Completion) -> Event {
        let mut event = self.event;
        event.stage = Some(Stage::ResponseComplete);
        event.stage_timestamp = Some(completion.stage_timestamp);
        event.verb = completion.verb;
        event.request_uri = completion.request_uri;
        event.object_ref = completion.object_ref;
        event.response_status = completion.response_status;
        event.workspace = completion.workspace;
        event.cluster = completion.cluster;
        event.devops = completion.devops;
        event
    }

    /// Returns the event as built so far.
    #[must_use]
    pub const fn as_event(&self) -> &Event {
        &self.event
    }
}

impl Deref for PendingEvent {
    type Target = Event;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

/// Fields written when an event reaches its terminal stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    stage_timestamp: DateTime<Utc>,
    verb: Option<String>,
    request_uri: Option<String>,
    object_ref: Option<ObjectReference>,
    response_status: Option<ResponseStatus>,
    workspace: Option<String>,
    cluster: Option<String>,
    devops: Option<String>,
}

impl Completion {
    /// Creates a completion stamped at `stage_timestamp` with nothing else set.
    #[must_use]
    pub const fn at(stage_timestamp: DateTime<Utc>) -> Self {
        Self {
            stage_timestamp,
            verb: None,
            request_uri: None,
            object_ref: None,
            response_status: None,
            workspace: None,
            cluster: None,
            devops: None,
        }
    }

    /// Sets the verb; empty strings are ignored.
    #[must_use]
    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = non_empty(verb.into());
        self
    }

    /// Sets the request URI; empty strings are ignored.
    #[must_use]
    pub fn with_request_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = non_empty(uri.into());
        self
    }

    /// Sets the targeted object.
    #[must_use]
    pub fn with_object_ref(mut self, object_ref: ObjectReference) -> Self {
        self.object_ref = Some(object_ref);
        self
    }

    /// Sets the response status.
    #[must_use]
    pub const fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = Some(status);
        self
    }

    /// Sets the tenancy scope; `None` and empty values are ignored.
    #[must_use]
    pub fn with_scope(
        mut self,
        workspace: Option<String>,
        cluster: Option<String>,
        devops: Option<String>,
    ) -> Self {
        self.workspace = workspace.and_then(non_empty);
        self.cluster = cluster.and_then(non_empty);
        self.devops = devops.and_then(non_empty);
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
