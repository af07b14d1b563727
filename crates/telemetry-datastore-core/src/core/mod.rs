// crates/telemetry-datastore-core/src/core/mod.rs
// ============================================================================
// Module: Telemetry Datastore Core Types
// Description: Canonical message, registry, and identity structures.
// Purpose: Provide stable, serializable types for stored telemetry entities.
// Dependencies: serde, sha2, base64, time
// ============================================================================

//! ## Overview
//! Core types define telemetry messages, the three derived registry entry
//! kinds, deterministic identity derivation, and the partition naming
//! scheme. These types are the canonical source of truth for any derived
//! API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod document;
pub mod identifiers;
pub mod identity;
pub mod message;
pub mod partition;
pub mod registry;
pub mod schema;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::Document;
pub use document::MappingError;
pub use document::StorableEntity;
pub use identifiers::ChannelPath;
pub use identifiers::ClientId;
pub use identifiers::MetricName;
pub use identifiers::ScopeId;
pub use identifiers::StorableId;
pub use identity::IdentityError;
pub use identity::channel_entry_id;
pub use identity::client_entry_id;
pub use identity::derive_id;
pub use identity::metric_entry_id;
pub use message::DatastoreMessage;
pub use message::MessageKey;
pub use message::MetricType;
pub use message::MetricValue;
pub use message::Payload;
pub use message::Position;
pub use message::StoredMessage;
pub use partition::ILLEGAL_CHARS;
pub use partition::PartitionError;
pub use partition::PartitionName;
pub use partition::check_name;
pub use partition::message_partition;
pub use partition::message_partition_wildcard;
pub use partition::normalize;
pub use partition::registry_partition;
pub use registry::ChannelRegistryEntry;
pub use registry::ClientRegistryEntry;
pub use registry::MetricRegistryEntry;
pub use registry::RegistryEntry;
pub use registry::RegistryKind;
pub use self::time::Timestamp;
