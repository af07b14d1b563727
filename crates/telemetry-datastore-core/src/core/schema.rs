// crates/telemetry-datastore-core/src/core/schema.rs
// ============================================================================
// Module: Telemetry Datastore Schema
// Description: Stored field names and partition mapping specifications.
// Purpose: Share one set of physical field names across marshalling,
//          queries, and mapping management.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The field names here are the physical document layout. Marshalling
//! writes them, the query layer filters and sorts on them, and
//! `ensure_mapping` publishes them to the backend as idempotent mapping
//! specifications. Renaming any constant is a breaking change for stored
//! data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::identifiers::MetricName;
use crate::core::message::MetricType;

// ============================================================================
// SECTION: Shared Fields
// ============================================================================

/// Backend-reserved field addressing a document by its identifier.
pub const ID: &str = "_id";

// ============================================================================
// SECTION: Message Fields
// ============================================================================

/// Scope owning the message.
pub const MSG_SCOPE_ID: &str = "scope_id";
/// Publishing client identifier.
pub const MSG_CLIENT_ID: &str = "client_id";
/// Semantic channel string.
pub const MSG_CHANNEL: &str = "channel";
/// Publication timestamp (unix epoch milliseconds).
pub const MSG_TIMESTAMP: &str = "timestamp";
/// Geographic position object.
pub const MSG_POSITION: &str = "position";
/// Root object holding the metric values.
pub const MSG_METRICS: &str = "metrics";

// ============================================================================
// SECTION: Registry Fields
// ============================================================================

/// Registry kind discriminator (`client` | `channel` | `metric`).
pub const REG_KIND: &str = "kind";
/// Scope owning the registry row.
pub const REG_SCOPE_ID: &str = "scope_id";
/// Client the row summarizes.
pub const REG_CLIENT_ID: &str = "client_id";
/// Channel the row summarizes (channel and metric kinds).
pub const REG_CHANNEL: &str = "channel";
/// Metric name (metric kind only).
pub const REG_NAME: &str = "name";
/// Metric type full name (metric kind only).
pub const REG_METRIC_TYPE: &str = "metric_type";
/// Identifier of the first message observed for the dimension.
pub const REG_FIRST_MESSAGE_ID: &str = "first_message_id";
/// Timestamp of the first message observed for the dimension.
pub const REG_FIRST_MESSAGE_ON: &str = "first_message_on";

// ============================================================================
// SECTION: Metric Field Naming
// ============================================================================

/// Returns the fully qualified document path of a typed metric value,
/// e.g. `metrics.temperature.dbl`.
#[must_use]
pub fn qualified_metric_field(name: &MetricName, metric_type: MetricType) -> String {
    format!("{MSG_METRICS}.{}.{}", name.as_str(), metric_type.acronym())
}

// ============================================================================
// SECTION: Mapping Specifications
// ============================================================================

/// Returns the idempotent mapping specification for message partitions.
#[must_use]
pub fn message_mapping() -> Value {
    json!({
        "properties": {
            MSG_SCOPE_ID: { "type": "keyword" },
            MSG_CLIENT_ID: { "type": "keyword" },
            MSG_CHANNEL: { "type": "keyword" },
            MSG_TIMESTAMP: { "type": "date_millis" },
            MSG_POSITION: { "type": "geo_point" },
            MSG_METRICS: { "type": "object", "dynamic": true },
        }
    })
}

/// Returns the idempotent mapping specification for registry partitions.
#[must_use]
pub fn registry_mapping() -> Value {
    json!({
        "properties": {
            REG_KIND: { "type": "keyword" },
            REG_SCOPE_ID: { "type": "keyword" },
            REG_CLIENT_ID: { "type": "keyword" },
            REG_CHANNEL: { "type": "keyword" },
            REG_NAME: { "type": "keyword" },
            REG_METRIC_TYPE: { "type": "keyword" },
            REG_FIRST_MESSAGE_ID: { "type": "keyword" },
            REG_FIRST_MESSAGE_ON: { "type": "date_millis" },
        }
    })
}
