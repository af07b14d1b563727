// crates/telemetry-datastore-core/src/core/document.rs
// ============================================================================
// Module: Telemetry Datastore Marshalling
// Description: Marshalling contracts between domain entities and documents.
// Purpose: Convert messages and registry entries to and from the backend
//          document form without embedding backend specifics.
// Dependencies: serde_json, base64, thiserror, crate::core
// ============================================================================

//! ## Overview
//! A [`Document`] is a plain JSON object map, the only shape the storage
//! interface understands. [`StorableEntity`] is the marshalling contract:
//! each stored entity kind knows how to project itself into a document and
//! how to rebuild itself from one. A failure is fatal for that single call
//! only and never aborts surrounding batch work.
//!
//! Registry documents never carry the derived row identity or the
//! transient last-published fields; the identity is the document id and
//! the last-published fields are computed at read time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::identifiers::ChannelPath;
use crate::core::identifiers::ClientId;
use crate::core::identifiers::MetricName;
use crate::core::identifiers::ScopeId;
use crate::core::identifiers::StorableId;
use crate::core::message::DatastoreMessage;
use crate::core::message::MetricType;
use crate::core::message::MetricValue;
use crate::core::message::Payload;
use crate::core::message::Position;
use crate::core::message::StoredMessage;
use crate::core::registry::ChannelRegistryEntry;
use crate::core::registry::ClientRegistryEntry;
use crate::core::registry::MetricRegistryEntry;
use crate::core::registry::RegistryEntry;
use crate::core::registry::RegistryKind;
use crate::core::schema;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Document Type
// ============================================================================

/// A stored document: a JSON object map.
pub type Document = Map<String, Value>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while marshalling or unmarshalling a single document.
///
/// # Invariants
/// - Fatal for the affected call only; never aborts surrounding batches.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A required field was absent from the document.
    #[error("document is missing required field '{field}'")]
    MissingField {
        /// Name of the absent field.
        field: String,
    },
    /// A field carried a value of an unexpected shape.
    #[error("document field '{field}' is not a valid {expected}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// Expected value shape.
        expected: &'static str,
    },
    /// A metric carried an unknown type acronym.
    #[error("unknown metric type acronym '{acronym}'")]
    UnknownMetricType {
        /// Offending acronym.
        acronym: String,
    },
    /// A registry document carried an unknown kind discriminator.
    #[error("unknown registry kind '{kind}'")]
    UnknownKind {
        /// Offending discriminator value.
        kind: String,
    },
    /// A value cannot be represented in the document form.
    #[error("unsupported value: {detail}")]
    UnsupportedValue {
        /// Description of the offending value.
        detail: String,
    },
}

// ============================================================================
// SECTION: Marshalling Contract
// ============================================================================

/// Marshalling contract between a stored entity and its document form.
pub trait StorableEntity: Sized {
    /// Projects the entity into its stored document form.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] when a value cannot be represented.
    fn marshal(&self) -> Result<Document, MappingError>;

    /// Rebuilds the entity from a stored document and its identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] when the document is malformed.
    fn unmarshal(id: &StorableId, document: &Document) -> Result<Self, MappingError>;
}

// ============================================================================
// SECTION: Field Helpers
// ============================================================================

/// Reads a required string field.
fn get_str<'doc>(document: &'doc Document, field: &str) -> Result<&'doc str, MappingError> {
    document
        .get(field)
        .ok_or_else(|| MappingError::MissingField {
            field: field.to_string(),
        })?
        .as_str()
        .ok_or(MappingError::InvalidField {
            field: field.to_string(),
            expected: "string",
        })
}

/// Reads a required integer field.
fn get_i64(document: &Document, field: &str) -> Result<i64, MappingError> {
    document
        .get(field)
        .ok_or_else(|| MappingError::MissingField {
            field: field.to_string(),
        })?
        .as_i64()
        .ok_or(MappingError::InvalidField {
            field: field.to_string(),
            expected: "integer",
        })
}

// ============================================================================
// SECTION: Metric Value Marshalling
// ============================================================================

/// Projects a metric value into its stored JSON form.
fn metric_value_to_json(value: &MetricValue) -> Value {
    match value {
        MetricValue::String(text) => Value::from(text.clone()),
        MetricValue::Integer(number) => Value::from(*number),
        MetricValue::Long(number) => Value::from(*number),
        MetricValue::Float(number) => Value::from(f64::from(*number)),
        MetricValue::Double(number) => Value::from(*number),
        MetricValue::Boolean(flag) => Value::from(*flag),
        MetricValue::Date(timestamp) => Value::from(timestamp.as_millis()),
        MetricValue::Binary(bytes) => Value::from(STANDARD.encode(bytes)),
    }
}

/// Rebuilds a metric value from its stored JSON form and type.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Float metrics are stored as f64 on the wire and re-narrowed on read."
)]
fn metric_value_from_json(
    name: &str,
    metric_type: MetricType,
    value: &Value,
) -> Result<MetricValue, MappingError> {
    let invalid = |expected: &'static str| MappingError::InvalidField {
        field: format!("{}.{name}", schema::MSG_METRICS),
        expected,
    };
    match metric_type {
        MetricType::String => value
            .as_str()
            .map(|text| MetricValue::String(text.to_string()))
            .ok_or_else(|| invalid("string")),
        MetricType::Integer => value
            .as_i64()
            .map(i32::try_from)
            .and_then(Result::ok)
            .map(MetricValue::Integer)
            .ok_or_else(|| invalid("32-bit integer")),
        MetricType::Long => value.as_i64().map(MetricValue::Long).ok_or_else(|| invalid("integer")),
        MetricType::Float => value
            .as_f64()
            .map(|number| MetricValue::Float(number as f32))
            .ok_or_else(|| invalid("number")),
        MetricType::Double => {
            value.as_f64().map(MetricValue::Double).ok_or_else(|| invalid("number"))
        }
        MetricType::Boolean => {
            value.as_bool().map(MetricValue::Boolean).ok_or_else(|| invalid("boolean"))
        }
        MetricType::Date => value
            .as_i64()
            .map(|millis| MetricValue::Date(Timestamp::from_millis(millis)))
            .ok_or_else(|| invalid("integer")),
        MetricType::Binary => value
            .as_str()
            .and_then(|encoded| STANDARD.decode(encoded).ok())
            .map(MetricValue::Binary)
            .ok_or_else(|| invalid("base64 string")),
    }
}

/// Projects a payload into the nested `metrics` object.
fn payload_to_json(payload: &Payload) -> Document {
    let mut metrics = Document::new();
    for (name, value) in payload.iter() {
        let mut typed = Document::new();
        typed.insert(value.metric_type().acronym().to_string(), metric_value_to_json(value));
        metrics.insert(name.as_str().to_string(), Value::Object(typed));
    }
    metrics
}

/// Rebuilds a payload from the nested `metrics` object.
fn payload_from_json(metrics: &Document) -> Result<Payload, MappingError> {
    let mut payload = Payload::new();
    for (name, typed) in metrics {
        let typed = typed.as_object().ok_or(MappingError::InvalidField {
            field: format!("{}.{name}", schema::MSG_METRICS),
            expected: "object",
        })?;
        for (acronym, value) in typed {
            let metric_type = MetricType::from_acronym(acronym).ok_or_else(|| {
                MappingError::UnknownMetricType {
                    acronym: acronym.clone(),
                }
            })?;
            payload.insert(
                MetricName::new(name.clone()),
                metric_value_from_json(name, metric_type, value)?,
            );
        }
    }
    Ok(payload)
}

// ============================================================================
// SECTION: Message Marshalling
// ============================================================================

impl StorableEntity for StoredMessage {
    fn marshal(&self) -> Result<Document, MappingError> {
        let message = &self.message;
        let mut document = Document::new();
        document.insert(
            schema::MSG_SCOPE_ID.to_string(),
            Value::from(message.scope_id.as_str()),
        );
        document.insert(
            schema::MSG_CLIENT_ID.to_string(),
            Value::from(message.client_id.as_str()),
        );
        document
            .insert(schema::MSG_CHANNEL.to_string(), Value::from(message.channel.as_str()));
        document.insert(
            schema::MSG_TIMESTAMP.to_string(),
            Value::from(message.timestamp.as_millis()),
        );
        if let Some(position) = &message.position {
            document.insert(
                schema::MSG_POSITION.to_string(),
                json!({
                    "latitude": position.latitude,
                    "longitude": position.longitude,
                    "altitude": position.altitude,
                }),
            );
        }
        document.insert(
            schema::MSG_METRICS.to_string(),
            Value::Object(payload_to_json(&message.payload)),
        );
        Ok(document)
    }

    fn unmarshal(id: &StorableId, document: &Document) -> Result<Self, MappingError> {
        let scope_id = ScopeId::new(get_str(document, schema::MSG_SCOPE_ID)?);
        let client_id = ClientId::new(get_str(document, schema::MSG_CLIENT_ID)?);
        let channel = ChannelPath::new(get_str(document, schema::MSG_CHANNEL)?);
        let timestamp = Timestamp::from_millis(get_i64(document, schema::MSG_TIMESTAMP)?);
        let position = match document.get(schema::MSG_POSITION) {
            Some(value) => {
                let object = value.as_object().ok_or(MappingError::InvalidField {
                    field: schema::MSG_POSITION.to_string(),
                    expected: "object",
                })?;
                Some(Position {
                    latitude: object.get("latitude").and_then(Value::as_f64).ok_or(
                        MappingError::InvalidField {
                            field: schema::MSG_POSITION.to_string(),
                            expected: "latitude number",
                        },
                    )?,
                    longitude: object.get("longitude").and_then(Value::as_f64).ok_or(
                        MappingError::InvalidField {
                            field: schema::MSG_POSITION.to_string(),
                            expected: "longitude number",
                        },
                    )?,
                    altitude: object.get("altitude").and_then(Value::as_f64),
                })
            }
            None => None,
        };
        let payload = match document.get(schema::MSG_METRICS) {
            Some(value) => {
                let metrics = value.as_object().ok_or(MappingError::InvalidField {
                    field: schema::MSG_METRICS.to_string(),
                    expected: "object",
                })?;
                payload_from_json(metrics)?
            }
            None => Payload::new(),
        };
        Ok(Self {
            id: id.clone(),
            message: DatastoreMessage {
                scope_id,
                client_id,
                channel,
                timestamp,
                position,
                payload,
            },
        })
    }
}

// ============================================================================
// SECTION: Registry Marshalling
// ============================================================================

/// Writes the fields shared by every registry kind.
fn registry_header(
    document: &mut Document,
    kind: RegistryKind,
    scope_id: &ScopeId,
    client_id: &ClientId,
    first_message_id: &StorableId,
    first_message_on: Timestamp,
) {
    document.insert(schema::REG_KIND.to_string(), Value::from(kind.as_str()));
    document.insert(schema::REG_SCOPE_ID.to_string(), Value::from(scope_id.as_str()));
    document.insert(schema::REG_CLIENT_ID.to_string(), Value::from(client_id.as_str()));
    document.insert(
        schema::REG_FIRST_MESSAGE_ID.to_string(),
        Value::from(first_message_id.as_str()),
    );
    document.insert(
        schema::REG_FIRST_MESSAGE_ON.to_string(),
        Value::from(first_message_on.as_millis()),
    );
}

impl StorableEntity for RegistryEntry {
    fn marshal(&self) -> Result<Document, MappingError> {
        let mut document = Document::new();
        match self {
            Self::Client(entry) => {
                registry_header(
                    &mut document,
                    RegistryKind::Client,
                    &entry.scope_id,
                    &entry.client_id,
                    &entry.first_message_id,
                    entry.first_message_on,
                );
            }
            Self::Channel(entry) => {
                registry_header(
                    &mut document,
                    RegistryKind::Channel,
                    &entry.scope_id,
                    &entry.client_id,
                    &entry.first_message_id,
                    entry.first_message_on,
                );
                document
                    .insert(schema::REG_CHANNEL.to_string(), Value::from(entry.channel.as_str()));
            }
            Self::Metric(entry) => {
                registry_header(
                    &mut document,
                    RegistryKind::Metric,
                    &entry.scope_id,
                    &entry.client_id,
                    &entry.first_message_id,
                    entry.first_message_on,
                );
                document
                    .insert(schema::REG_CHANNEL.to_string(), Value::from(entry.channel.as_str()));
                document.insert(schema::REG_NAME.to_string(), Value::from(entry.name.as_str()));
                document.insert(
                    schema::REG_METRIC_TYPE.to_string(),
                    Value::from(entry.metric_type.as_str()),
                );
            }
        }
        Ok(document)
    }

    fn unmarshal(id: &StorableId, document: &Document) -> Result<Self, MappingError> {
        let kind_value = get_str(document, schema::REG_KIND)?;
        let kind =
            RegistryKind::from_str_opt(kind_value).ok_or_else(|| MappingError::UnknownKind {
                kind: kind_value.to_string(),
            })?;
        let scope_id = ScopeId::new(get_str(document, schema::REG_SCOPE_ID)?);
        let client_id = ClientId::new(get_str(document, schema::REG_CLIENT_ID)?);
        let first_message_id = StorableId::new(get_str(document, schema::REG_FIRST_MESSAGE_ID)?);
        let first_message_on =
            Timestamp::from_millis(get_i64(document, schema::REG_FIRST_MESSAGE_ON)?);
        match kind {
            RegistryKind::Client => Ok(Self::Client(ClientRegistryEntry {
                id: id.clone(),
                scope_id,
                client_id,
                first_message_id,
                first_message_on,
                last_message_id: None,
                last_message_on: None,
            })),
            RegistryKind::Channel => Ok(Self::Channel(ChannelRegistryEntry {
                id: id.clone(),
                scope_id,
                client_id,
                channel: ChannelPath::new(get_str(document, schema::REG_CHANNEL)?),
                first_message_id,
                first_message_on,
                last_message_id: None,
                last_message_on: None,
            })),
            RegistryKind::Metric => {
                let type_name = get_str(document, schema::REG_METRIC_TYPE)?;
                let metric_type = MetricType::from_name(type_name).ok_or_else(|| {
                    MappingError::UnknownMetricType {
                        acronym: type_name.to_string(),
                    }
                })?;
                Ok(Self::Metric(MetricRegistryEntry {
                    id: id.clone(),
                    scope_id,
                    client_id,
                    channel: ChannelPath::new(get_str(document, schema::REG_CHANNEL)?),
                    name: MetricName::new(get_str(document, schema::REG_NAME)?),
                    metric_type,
                    first_message_id,
                    first_message_on,
                    last_message_id: None,
                    last_message_on: None,
                }))
            }
        }
    }
}
