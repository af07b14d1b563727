// crates/telemetry-datastore-core/src/core/registry.rs
// ============================================================================
// Module: Telemetry Datastore Registry Entries
// Description: Derived summary rows for clients, channels, and metrics.
// Purpose: Track when each publishing dimension was first and last seen.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! A registry entry is a derived summary row keyed by a deterministic
//! identity. Entries store the first observed message reference; the last
//! published fields are transient, populated at read time by the
//! enrichment path and never written to the backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ChannelPath;
use crate::core::identifiers::ClientId;
use crate::core::identifiers::MetricName;
use crate::core::identifiers::ScopeId;
use crate::core::identifiers::StorableId;
use crate::core::identity::IdentityError;
use crate::core::identity::channel_entry_id;
use crate::core::identity::client_entry_id;
use crate::core::identity::metric_entry_id;
use crate::core::message::MetricType;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Registry Kind
// ============================================================================

/// Discriminator distinguishing the three registry row kinds within the
/// shared per-scope registry partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    /// One row per (scope, client).
    Client,
    /// One row per (scope, client, channel).
    Channel,
    /// One row per (scope, client, channel, metric name, metric type).
    Metric,
}

impl RegistryKind {
    /// Returns the stored discriminator value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Channel => "channel",
            Self::Metric => "metric",
        }
    }

    /// Resolves a kind from its discriminator value.
    #[must_use]
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "client" => Some(Self::Client),
            "channel" => Some(Self::Channel),
            "metric" => Some(Self::Metric),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Client Entry
// ============================================================================

/// Summary row for a publishing client.
///
/// # Invariants
/// - `id` is derived from (scope, client); identical inputs re-derive the
///   identical identity.
/// - `last_message_id`/`last_message_on` are never stored; they are filled
///   by read-time enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRegistryEntry {
    /// Derived row identity.
    pub id: StorableId,
    /// Scope owning the row.
    pub scope_id: ScopeId,
    /// Client the row summarizes.
    pub client_id: ClientId,
    /// Identifier of the first observed message.
    pub first_message_id: StorableId,
    /// Timestamp of the first observed message.
    pub first_message_on: Timestamp,
    /// Identifier of the latest message (transient).
    #[serde(skip)]
    pub last_message_id: Option<StorableId>,
    /// Timestamp of the latest message (transient).
    #[serde(skip)]
    pub last_message_on: Option<Timestamp>,
}

impl ClientRegistryEntry {
    /// Builds a client entry with its derived identity.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when any identity component is empty.
    pub fn new(
        scope_id: ScopeId,
        client_id: ClientId,
        first_message_id: StorableId,
        first_message_on: Timestamp,
    ) -> Result<Self, IdentityError> {
        let id = client_entry_id(&scope_id, &client_id)?;
        Ok(Self {
            id,
            scope_id,
            client_id,
            first_message_id,
            first_message_on,
            last_message_id: None,
            last_message_on: None,
        })
    }
}

// ============================================================================
// SECTION: Channel Entry
// ============================================================================

/// Summary row for a (client, channel) pair.
///
/// # Invariants
/// - `id` is derived from (scope, client, channel).
/// - Last published fields are transient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRegistryEntry {
    /// Derived row identity.
    pub id: StorableId,
    /// Scope owning the row.
    pub scope_id: ScopeId,
    /// Client the row summarizes.
    pub client_id: ClientId,
    /// Channel the row summarizes.
    pub channel: ChannelPath,
    /// Identifier of the first observed message.
    pub first_message_id: StorableId,
    /// Timestamp of the first observed message.
    pub first_message_on: Timestamp,
    /// Identifier of the latest message (transient).
    #[serde(skip)]
    pub last_message_id: Option<StorableId>,
    /// Timestamp of the latest message (transient).
    #[serde(skip)]
    pub last_message_on: Option<Timestamp>,
}

impl ChannelRegistryEntry {
    /// Builds a channel entry with its derived identity.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when any identity component is empty.
    pub fn new(
        scope_id: ScopeId,
        client_id: ClientId,
        channel: ChannelPath,
        first_message_id: StorableId,
        first_message_on: Timestamp,
    ) -> Result<Self, IdentityError> {
        let id = channel_entry_id(&scope_id, &client_id, &channel)?;
        Ok(Self {
            id,
            scope_id,
            client_id,
            channel,
            first_message_id,
            first_message_on,
            last_message_id: None,
            last_message_on: None,
        })
    }
}

// ============================================================================
// SECTION: Metric Entry
// ============================================================================

/// Summary row for a (client, channel, metric name, metric type) tuple.
///
/// # Invariants
/// - `id` is derived from all five identifying components.
/// - Last published fields are transient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRegistryEntry {
    /// Derived row identity.
    pub id: StorableId,
    /// Scope owning the row.
    pub scope_id: ScopeId,
    /// Client the row summarizes.
    pub client_id: ClientId,
    /// Channel the metric was published on.
    pub channel: ChannelPath,
    /// Metric name.
    pub name: MetricName,
    /// Metric value type.
    pub metric_type: MetricType,
    /// Identifier of the first observed message.
    pub first_message_id: StorableId,
    /// Timestamp of the first observed message.
    pub first_message_on: Timestamp,
    /// Identifier of the latest message (transient).
    #[serde(skip)]
    pub last_message_id: Option<StorableId>,
    /// Timestamp of the latest message (transient).
    #[serde(skip)]
    pub last_message_on: Option<Timestamp>,
}

impl MetricRegistryEntry {
    /// Builds a metric entry with its derived identity.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when any identity component is empty.
    pub fn new(
        scope_id: ScopeId,
        client_id: ClientId,
        channel: ChannelPath,
        name: MetricName,
        metric_type: MetricType,
        first_message_id: StorableId,
        first_message_on: Timestamp,
    ) -> Result<Self, IdentityError> {
        let id = metric_entry_id(&scope_id, &client_id, &channel, &name, metric_type)?;
        Ok(Self {
            id,
            scope_id,
            client_id,
            channel,
            name,
            metric_type,
            first_message_id,
            first_message_on,
            last_message_id: None,
            last_message_on: None,
        })
    }
}

// ============================================================================
// SECTION: Entry Sum Type
// ============================================================================

/// A registry entry of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEntry {
    /// Client summary row.
    Client(ClientRegistryEntry),
    /// Channel summary row.
    Channel(ChannelRegistryEntry),
    /// Metric summary row.
    Metric(MetricRegistryEntry),
}

impl RegistryEntry {
    /// Returns the kind of this entry.
    #[must_use]
    pub const fn kind(&self) -> RegistryKind {
        match self {
            Self::Client(_) => RegistryKind::Client,
            Self::Channel(_) => RegistryKind::Channel,
            Self::Metric(_) => RegistryKind::Metric,
        }
    }

    /// Returns the derived row identity.
    #[must_use]
    pub const fn id(&self) -> &StorableId {
        match self {
            Self::Client(entry) => &entry.id,
            Self::Channel(entry) => &entry.id,
            Self::Metric(entry) => &entry.id,
        }
    }

    /// Returns the scope owning the entry.
    #[must_use]
    pub const fn scope_id(&self) -> &ScopeId {
        match self {
            Self::Client(entry) => &entry.scope_id,
            Self::Channel(entry) => &entry.scope_id,
            Self::Metric(entry) => &entry.scope_id,
        }
    }

    /// Returns the client the entry summarizes.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        match self {
            Self::Client(entry) => &entry.client_id,
            Self::Channel(entry) => &entry.client_id,
            Self::Metric(entry) => &entry.client_id,
        }
    }

    /// Returns the channel dimension, when the kind has one.
    #[must_use]
    pub const fn channel(&self) -> Option<&ChannelPath> {
        match self {
            Self::Client(_) => None,
            Self::Channel(entry) => Some(&entry.channel),
            Self::Metric(entry) => Some(&entry.channel),
        }
    }

    /// Returns the latest observed message timestamp, when enriched.
    #[must_use]
    pub const fn last_message_on(&self) -> Option<Timestamp> {
        match self {
            Self::Client(entry) => entry.last_message_on,
            Self::Channel(entry) => entry.last_message_on,
            Self::Metric(entry) => entry.last_message_on,
        }
    }

    /// Sets the transient last published fields.
    pub fn set_last_published(&mut self, id: Option<StorableId>, on: Option<Timestamp>) {
        match self {
            Self::Client(entry) => {
                entry.last_message_id = id;
                entry.last_message_on = on;
            }
            Self::Channel(entry) => {
                entry.last_message_id = id;
                entry.last_message_on = on;
            }
            Self::Metric(entry) => {
                entry.last_message_id = id;
                entry.last_message_on = on;
            }
        }
    }
}
