//! Audit event schema description.
//!
//! The schema documents every field an [`Event`](crate::Event) can carry, the
//! minimum audit level at which it is populated, and the phase that writes it.

use kaudit_core::AuditLevel;
use serde::{Deserialize, Serialize};

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Event schema definition for documentation and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSchema {
    /// Schema name
    pub name: String,

    /// Schema version
    pub version: String,

    /// Schema description
    pub description: String,

    /// Fields present on every event
    pub required_fields: Vec<FieldDefinition>,

    /// Fields omitted when unset
    pub optional_fields: Vec<FieldDefinition>,
}

/// Field definition within a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Serialized field name
    pub name: String,

    /// Field type
    pub field_type: FieldType,

    /// Field description
    pub description: String,

    /// Lowest level at which the field is populated
    pub min_level: AuditLevel,

    /// Pipeline phase that writes the field
    pub phase: Phase,
}

/// Supported field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// String field
    String,
    /// Timestamp field
    Timestamp,
    /// UUID field
    Uuid,
    /// Array field
    Array,
    /// Object field
    Object,
}

/// Pipeline phase that writes a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Written when the request is received
    RequestReceived,
    /// Written when the response completes
    ResponseComplete,
}

impl EventSchema {
    /// Creates a new event schema.
    #[must_use]
    pub fn new(name: &str, version: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
            required_fields: Vec::new(),
            optional_fields: Vec::new(),
        }
    }

    /// Adds a required field written at request receipt.
    #[must_use]
    pub fn required(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.required_fields.push(FieldDefinition::new(
            name,
            field_type,
            description,
            Phase::RequestReceived,
        ));
        self
    }

    /// Adds an optional field.
    #[must_use]
    pub fn optional(
        mut self,
        name: &str,
        field_type: FieldType,
        phase: Phase,
        description: &str,
    ) -> Self {
        self.optional_fields
            .push(FieldDefinition::new(name, field_type, description, phase));
        self
    }

    /// Adds an optional field populated only from `min_level` upwards.
    #[must_use]
    pub fn gated(
        mut self,
        name: &str,
        field_type: FieldType,
        min_level: AuditLevel,
        phase: Phase,
        description: &str,
    ) -> Self {
        let mut field = FieldDefinition::new(name, field_type, description, phase);
        field.min_level = min_level;
        self.optional_fields.push(field);
        self
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.required_fields
            .iter()
            .chain(&self.optional_fields)
            .find(|f| f.name == name)
    }

    /// Returns the names of the fields populated at `level`.
    #[must_use]
    pub fn fields_at(&self, level: AuditLevel) -> Vec<&str> {
        self.required_fields
            .iter()
            .chain(&self.optional_fields)
            .filter(|f| level.at_least(f.min_level))
            .map(|f| f.name.as_str())
            .collect()
    }
}

impl FieldDefinition {
    /// Creates a new field definition populated from [`AuditLevel::Metadata`].
    #[must_use]
    pub fn new(name: &str, field_type: FieldType, description: &str, phase: Phase) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
            min_level: AuditLevel::Metadata,
            phase,
        }
    }
}

/// Returns the schema for audit events.
#[must_use]
pub fn audit_event_schema() -> EventSchema {
    use FieldType as F;
    use Phase::{RequestReceived, ResponseComplete};

    EventSchema::new(
        "Event",
        CURRENT_SCHEMA_VERSION,
        "One audited request/response cycle",
    )
    .required("level", F::String, "Audit level resolved at request receipt")
    .required("auditID", F::Uuid, "Correlation id")
    .required("requestReceivedTimestamp", F::Timestamp, "When the request was received")
    .optional("stage", F::String, ResponseComplete, "Lifecycle stage")
    .optional("requestURI", F::String, ResponseComplete, "Request path")
    .optional("verb", F::String, ResponseComplete, "Action verb")
    .optional("user", F::Object, RequestReceived, "Authenticated principal")
    .optional("sourceIPs", F::Array, RequestReceived, "Client addresses")
    .optional("userAgent", F::String, RequestReceived, "Client user agent")
    .optional("objectRef", F::Object, ResponseComplete, "Targeted object")
    .optional("responseStatus", F::Object, ResponseComplete, "Response status code")
    .optional("stageTimestamp", F::Timestamp, ResponseComplete, "When the stage was reached")
    .optional("workspace", F::String, ResponseComplete, "Workspace scope")
    .optional("cluster", F::String, ResponseComplete, "Cluster scope")
    .optional("devops", F::String, ResponseComplete, "DevOps project scope")
    .gated(
        "requestObject",
        F::Object,
        AuditLevel::Request,
        RequestReceived,
        "Request body",
    )
    .gated(
        "responseObject",
        F::Object,
        AuditLevel::RequestResponse,
        ResponseComplete,
        "Response body",
    )
}
