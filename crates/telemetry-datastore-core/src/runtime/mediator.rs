// crates/telemetry-datastore-core/src/runtime/mediator.rs
// ============================================================================
// Module: Telemetry Datastore Registry Mediator
// Description: Single write path keeping derived registries consistent.
// Purpose: Refresh client, channel, and metric registry rows after every
//          durable message store, and run registry reads and cascades.
// Dependencies: tracing, crate::{core, interfaces, query, runtime}
// ============================================================================

//! ## Overview
//! The mediator is built once at startup with an injected shared storage
//! client and configuration; there is no ambient global instance. After a
//! message is durably stored, [`RegistryMediator::on_message_stored`]
//! refreshes one client row, one channel row, and one metric row per
//! distinct (name, type) pair in the payload. Identities are derived from
//! content, so re-running the sequence after a duplicate delivery or a
//! crash converges on the same rows instead of duplicating them.
//!
//! Registry consistency relies on single-document atomicity only; there is
//! no in-process locking, and concurrent upserts of the same identity
//! converge last-write-wins. Metric rows are written in one bulk call
//! whose per-item failures are reported, never escalated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::document::MappingError;
use crate::core::document::StorableEntity;
use crate::core::identifiers::ScopeId;
use crate::core::identifiers::StorableId;
use crate::core::identity::IdentityError;
use crate::core::message::DatastoreMessage;
use crate::core::partition::PartitionError;
use crate::core::partition::message_partition;
use crate::core::partition::message_partition_wildcard;
use crate::core::partition::registry_partition;
use crate::core::registry::ChannelRegistryEntry;
use crate::core::registry::ClientRegistryEntry;
use crate::core::registry::MetricRegistryEntry;
use crate::core::registry::RegistryEntry;
use crate::core::registry::RegistryKind;
use crate::core::schema;
use crate::interfaces::BulkResponse;
use crate::interfaces::BulkUpsertItem;
use crate::interfaces::SharedStorageClient;
use crate::interfaces::StorageError;
use crate::query::Predicate;
use crate::query::QueryError;
use crate::query::StorableQuery;
use crate::query::compile;
use crate::runtime::enrichment::enrich_page;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Runtime configuration of the registry mediator.
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    /// Worker pool size used by page enrichment.
    pub enrichment_workers: usize,
    /// Whether registry mappings are ensured before registry writes.
    pub ensure_mappings: bool,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            enrichment_workers: 4,
            ensure_mappings: true,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by mediator operations.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// A step of the ingest sequence failed; the phase names how far the
    /// sequence got. The whole sequence is safe to re-run.
    #[error("ingest failed in phase {phase:?}")]
    Ingest {
        /// Last phase reached before the failure.
        phase: IngestPhase,
        /// Underlying cause.
        #[source]
        source: Box<MediatorError>,
    },
    /// Partition name construction failed.
    #[error(transparent)]
    Partition(#[from] PartitionError),
    /// Identity derivation failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// Query construction failed.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// Marshalling or compilation failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// A storage call failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Page enrichment failed outside a storage call.
    #[error("enrichment failed: {detail}")]
    Enrichment {
        /// Description of the failure.
        detail: String,
    },
}

// ============================================================================
// SECTION: Ingest Report
// ============================================================================

/// Phases of the per-message ingest sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestPhase {
    /// The message was handed to the mediator.
    Received,
    /// The message is known durably stored.
    Stored,
    /// Registry writes were attempted.
    RegistryUpdatesAttempted,
    /// The sequence completed.
    Done,
}

/// Outcome of one ingest sequence.
///
/// # Invariants
/// - `metric_results` carries one item per distinct (name, type) pair in
///   the payload; failures there aborted nothing.
#[derive(Debug)]
pub struct IngestReport {
    /// Phase the sequence reached.
    pub phase: IngestPhase,
    /// Identity of the refreshed client row.
    pub client_entry_id: StorableId,
    /// Identity of the refreshed channel row.
    pub channel_entry_id: StorableId,
    /// Per-item outcomes of the metric row bulk upsert.
    pub metric_results: BulkResponse,
}

// ============================================================================
// SECTION: Registry Page
// ============================================================================

/// A page of enriched registry entries.
#[derive(Debug)]
pub struct RegistryPage {
    /// Enriched entries in query sort order.
    pub entries: Vec<RegistryEntry>,
    /// Total match count, when the query asked for it.
    pub total: Option<u64>,
}

// ============================================================================
// SECTION: Mediator
// ============================================================================

/// Single write path for the derived registry collections.
pub struct RegistryMediator {
    /// Storage engine the registries live in.
    storage: SharedStorageClient,
    /// Runtime configuration.
    config: MediatorConfig,
}

impl RegistryMediator {
    /// Builds a mediator over the given storage client.
    #[must_use]
    pub fn new(storage: SharedStorageClient, config: MediatorConfig) -> Self {
        Self {
            storage,
            config,
        }
    }

    /// Refreshes the three registry collections after a durable message
    /// store. Safe to re-run for the same message.
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::Ingest`] naming the phase reached when a
    /// step fails. Per-item metric failures are reported in the returned
    /// [`IngestReport`], not raised.
    pub fn on_message_stored(
        &self,
        stored_id: &StorableId,
        message: &DatastoreMessage,
    ) -> Result<IngestReport, MediatorError> {
        let mut phase = IngestPhase::Stored;
        self.ingest(stored_id, message, &mut phase).map_err(|source| {
            MediatorError::Ingest {
                phase,
                source: Box::new(source),
            }
        })
    }

    /// Runs the ingest steps, recording the phase reached.
    fn ingest(
        &self,
        stored_id: &StorableId,
        message: &DatastoreMessage,
        phase: &mut IngestPhase,
    ) -> Result<IngestReport, MediatorError> {
        let registry = registry_partition(&message.scope_id)?;
        if self.config.ensure_mappings {
            self.storage.ensure_mapping(&registry, &schema::registry_mapping())?;
        }
        *phase = IngestPhase::RegistryUpdatesAttempted;

        let client_entry = ClientRegistryEntry::new(
            message.scope_id.clone(),
            message.client_id.clone(),
            stored_id.clone(),
            message.timestamp,
        )?;
        let client_entry_id = client_entry.id.clone();
        let client_row = RegistryEntry::Client(client_entry);
        self.storage.upsert(&registry, client_row.id(), client_row.marshal()?)?;

        let channel_entry = ChannelRegistryEntry::new(
            message.scope_id.clone(),
            message.client_id.clone(),
            message.channel.clone(),
            stored_id.clone(),
            message.timestamp,
        )?;
        let channel_entry_id = channel_entry.id.clone();
        let channel_row = RegistryEntry::Channel(channel_entry);
        self.storage.upsert(&registry, channel_row.id(), channel_row.marshal()?)?;

        let mut items = Vec::with_capacity(message.payload.len());
        for (name, value) in message.payload.iter() {
            let metric_entry = MetricRegistryEntry::new(
                message.scope_id.clone(),
                message.client_id.clone(),
                message.channel.clone(),
                name.clone(),
                value.metric_type(),
                stored_id.clone(),
                message.timestamp,
            )?;
            let metric_row = RegistryEntry::Metric(metric_entry);
            items.push(BulkUpsertItem {
                partition: registry.clone(),
                id: metric_row.id().clone(),
                document: metric_row.marshal()?,
            });
        }
        let metric_results =
            if items.is_empty() { BulkResponse::default() } else { self.storage.bulk_upsert(items)? };
        for failure in metric_results.failures() {
            warn!(
                scope = message.scope_id.as_str(),
                entry = failure.id.as_str(),
                error = failure.error.as_deref().unwrap_or(""),
                "metric registry row was not refreshed"
            );
        }

        *phase = IngestPhase::Done;
        debug!(
            scope = message.scope_id.as_str(),
            client = message.client_id.as_str(),
            metrics = metric_results.items.len(),
            "registry rows refreshed"
        );
        Ok(IngestReport {
            phase: IngestPhase::Done,
            client_entry_id,
            channel_entry_id,
            metric_results,
        })
    }

    // ------------------------------------------------------------------
    // Cascading deletes
    // ------------------------------------------------------------------

    /// Deletes a channel row and everything derived from its channel: all
    /// messages published on the channel by any client, then all metric
    /// rows for the channel, then the channel row itself.
    ///
    /// # Errors
    ///
    /// Returns a [`MediatorError`] when any step fails; an expired scroll
    /// cursor means the whole cascade must be restarted.
    pub fn delete_channel_entry(
        &self,
        entry: &ChannelRegistryEntry,
    ) -> Result<(), MediatorError> {
        let buckets = message_partition_wildcard(&entry.scope_id)?;
        let messages = StorableQuery::new(Predicate::channel_match(
            schema::MSG_CHANNEL,
            entry.channel.as_str(),
        ));
        self.storage.scrolling_delete(&buckets, &compile(&messages)?)?;

        let registry = registry_partition(&entry.scope_id)?;
        let metrics = StorableQuery::new(Predicate::and(vec![
            Predicate::term(schema::REG_KIND, RegistryKind::Metric.as_str()),
            Predicate::term(schema::REG_CHANNEL, entry.channel.as_str()),
        ]));
        self.storage.scrolling_delete(&registry, &compile(&metrics)?)?;

        self.storage.delete(&registry, &entry.id)?;
        Ok(())
    }

    /// Deletes a client row after deleting its recorded first message. A
    /// first message already dropped by retention is tolerated.
    ///
    /// # Errors
    ///
    /// Returns a [`MediatorError`] when a delete fails.
    pub fn delete_client_entry(&self, entry: &ClientRegistryEntry) -> Result<(), MediatorError> {
        let bucket = message_partition(&entry.scope_id, entry.first_message_on)?;
        match self.storage.delete(&bucket, &entry.first_message_id) {
            Ok(()) => {}
            Err(StorageError::NotFound {
                id,
            }) => {
                warn!(
                    scope = entry.scope_id.as_str(),
                    message = id.as_str(),
                    "first message already gone; deleting client row anyway"
                );
            }
            Err(error) => return Err(error.into()),
        }
        let registry = registry_partition(&entry.scope_id)?;
        self.storage.delete(&registry, &entry.id)?;
        Ok(())
    }

    /// Deletes one metric row.
    ///
    /// # Errors
    ///
    /// Returns a [`MediatorError`] when the delete fails.
    pub fn delete_metric_entry(
        &self,
        scope_id: &ScopeId,
        id: &StorableId,
    ) -> Result<(), MediatorError> {
        let registry = registry_partition(scope_id)?;
        self.storage.delete(&registry, id)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Registry reads
    // ------------------------------------------------------------------

    /// Runs a registry query restricted to one kind and returns the
    /// enriched page.
    ///
    /// # Errors
    ///
    /// Returns a [`MediatorError`] when the query, unmarshalling, or
    /// enrichment fails.
    pub fn query_registry(
        &self,
        scope_id: &ScopeId,
        kind: RegistryKind,
        query: StorableQuery,
    ) -> Result<RegistryPage, MediatorError> {
        let registry = registry_partition(scope_id)?;
        let compiled = compile(&Self::scoped_to_kind(kind, query))?;
        let hits = self.storage.query(&registry, &compiled)?;
        let total = hits.total;
        let mut entries = Vec::with_capacity(hits.hits.len());
        for hit in &hits.hits {
            entries.push(RegistryEntry::unmarshal(&hit.id, &hit.document)?);
        }
        enrich_page(self.storage.as_ref(), &mut entries, self.config.enrichment_workers)?;
        Ok(RegistryPage {
            entries,
            total,
        })
    }

    /// Counts the registry rows of one kind matching a query.
    ///
    /// # Errors
    ///
    /// Returns a [`MediatorError`] when the count fails.
    pub fn count_registry(
        &self,
        scope_id: &ScopeId,
        kind: RegistryKind,
        query: StorableQuery,
    ) -> Result<u64, MediatorError> {
        let registry = registry_partition(scope_id)?;
        let compiled = compile(&Self::scoped_to_kind(kind, query))?;
        Ok(self.storage.count(&registry, &compiled)?)
    }

    /// Wraps a caller query with a term on the kind discriminator.
    fn scoped_to_kind(kind: RegistryKind, mut query: StorableQuery) -> StorableQuery {
        query.predicate = Predicate::and(vec![
            Predicate::term(schema::REG_KIND, kind.as_str()),
            query.predicate,
        ]);
        query
    }
}
