// crates/telemetry-datastore-core/src/core/message.rs
// ============================================================================
// Module: Telemetry Datastore Message Model
// Description: Immutable telemetry messages and their typed metric payloads.
// Purpose: Provide the canonical message shape stored in weekly partitions.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A message is immutable once stored. It carries a scope, a client id, an
//! ordered semantic channel, a timestamp, an optional position, and a
//! payload of named metric values drawn from a closed type set. Each metric
//! type has a full name and a three-letter acronym; the acronym qualifies
//! the physical field name under which the value is stored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ChannelPath;
use crate::core::identifiers::ClientId;
use crate::core::identifiers::MetricName;
use crate::core::identifiers::ScopeId;
use crate::core::identifiers::StorableId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Metric Types
// ============================================================================

/// Closed set of metric value types.
///
/// # Invariants
/// - The full names and acronyms are part of the stored document layout and
///   must never change for existing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// UTF-8 string value.
    String,
    /// 32-bit signed integer value.
    Integer,
    /// 64-bit signed integer value.
    Long,
    /// 32-bit floating point value.
    Float,
    /// 64-bit floating point value.
    Double,
    /// Boolean value.
    Boolean,
    /// Timestamp value (unix epoch milliseconds).
    Date,
    /// Opaque binary value.
    Binary,
}

impl MetricType {
    /// Returns the full type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Binary => "binary",
        }
    }

    /// Returns the three-letter acronym used to qualify stored field names.
    #[must_use]
    pub const fn acronym(self) -> &'static str {
        match self {
            Self::String => "str",
            Self::Integer => "int",
            Self::Long => "lng",
            Self::Float => "flt",
            Self::Double => "dbl",
            Self::Boolean => "bln",
            Self::Date => "dte",
            Self::Binary => "bin",
        }
    }

    /// Resolves a type from its acronym; returns `None` for unknown input.
    #[must_use]
    pub fn from_acronym(acronym: &str) -> Option<Self> {
        match acronym {
            "str" => Some(Self::String),
            "int" => Some(Self::Integer),
            "lng" => Some(Self::Long),
            "flt" => Some(Self::Float),
            "dbl" => Some(Self::Double),
            "bln" => Some(Self::Boolean),
            "dte" => Some(Self::Date),
            "bin" => Some(Self::Binary),
            _ => None,
        }
    }

    /// Resolves a type from its full name; returns `None` for unknown input.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "binary" => Some(Self::Binary),
            _ => None,
        }
    }
}

/// A typed metric value carried in a message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    /// UTF-8 string value.
    String(String),
    /// 32-bit signed integer value.
    Integer(i32),
    /// 64-bit signed integer value.
    Long(i64),
    /// 32-bit floating point value.
    Float(f32),
    /// 64-bit floating point value.
    Double(f64),
    /// Boolean value.
    Boolean(bool),
    /// Timestamp value.
    Date(Timestamp),
    /// Opaque binary value.
    Binary(Vec<u8>),
}

impl MetricValue {
    /// Returns the type of this value.
    #[must_use]
    pub const fn metric_type(&self) -> MetricType {
        match self {
            Self::String(_) => MetricType::String,
            Self::Integer(_) => MetricType::Integer,
            Self::Long(_) => MetricType::Long,
            Self::Float(_) => MetricType::Float,
            Self::Double(_) => MetricType::Double,
            Self::Boolean(_) => MetricType::Boolean,
            Self::Date(_) => MetricType::Date,
            Self::Binary(_) => MetricType::Binary,
        }
    }
}

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Named metric values carried by a message.
///
/// # Invariants
/// - At most one value per metric name; the (name, type) pairs a payload
///   contributes to the metric registry are therefore distinct.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    /// Metric values keyed by metric name.
    metrics: BTreeMap<MetricName, MetricValue>,
}

impl Payload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a metric value, replacing any previous value for the name.
    pub fn insert(&mut self, name: MetricName, value: MetricValue) {
        self.metrics.insert(name, value);
    }

    /// Returns the number of metrics in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` when the payload carries no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterates over the metric (name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&MetricName, &MetricValue)> {
        self.metrics.iter()
    }
}

// ============================================================================
// SECTION: Position
// ============================================================================

/// Geographic position attached to a message by the publishing device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Altitude in meters, when reported.
    pub altitude: Option<f64>,
}

// ============================================================================
// SECTION: Message
// ============================================================================

/// Caller-visible composite key of a stored message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey {
    /// Scope that owns the message.
    pub scope_id: ScopeId,
    /// Publishing client.
    pub client_id: ClientId,
    /// Semantic channel.
    pub channel: ChannelPath,
    /// Publication timestamp.
    pub timestamp: Timestamp,
}

/// A telemetry message, immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatastoreMessage {
    /// Scope that owns the message.
    pub scope_id: ScopeId,
    /// Publishing client.
    pub client_id: ClientId,
    /// Semantic channel.
    pub channel: ChannelPath,
    /// Publication timestamp.
    pub timestamp: Timestamp,
    /// Geographic position, when reported.
    pub position: Option<Position>,
    /// Named metric values.
    pub payload: Payload,
}

impl DatastoreMessage {
    /// Returns the caller-visible composite key of this message.
    #[must_use]
    pub fn key(&self) -> MessageKey {
        MessageKey {
            scope_id: self.scope_id.clone(),
            client_id: self.client_id.clone(),
            channel: self.channel.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// A message together with its backend-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Backend-assigned document identifier.
    pub id: StorableId,
    /// The stored message.
    pub message: DatastoreMessage,
}
