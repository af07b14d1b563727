// crates/telemetry-datastore-core/tests/mediator.rs
// ============================================================================
// Module: Registry Mediator Tests
// Description: Ensures ingest, enrichment, and cascades behave end to end.
// ============================================================================
//! ## Overview
//! Exercises the mediator against the in-memory storage client: registry
//! refresh after ingest, idempotence under duplicate delivery, partial
//! bulk failures, read-time enrichment, and cascading deletes.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    reason = "Tests use unwrap and explicit panics on deterministic fixtures."
)]

use std::sync::Arc;

use serde_json::Value;
use telemetry_datastore_core::BulkItemResult;
use telemetry_datastore_core::BulkResponse;
use telemetry_datastore_core::BulkUpsertItem;
use telemetry_datastore_core::ChannelPath;
use telemetry_datastore_core::ClientId;
use telemetry_datastore_core::DatastoreMessage;
use telemetry_datastore_core::Document;
use telemetry_datastore_core::FetchStyle;
use telemetry_datastore_core::InMemoryStorageClient;
use telemetry_datastore_core::MediatorConfig;
use telemetry_datastore_core::MetricName;
use telemetry_datastore_core::MetricValue;
use telemetry_datastore_core::PartitionName;
use telemetry_datastore_core::Payload;
use telemetry_datastore_core::Predicate;
use telemetry_datastore_core::QueryHits;
use telemetry_datastore_core::RegistryEntry;
use telemetry_datastore_core::RegistryKind;
use telemetry_datastore_core::RegistryMediator;
use telemetry_datastore_core::ScopeId;
use telemetry_datastore_core::StorableEntity;
use telemetry_datastore_core::StorableId;
use telemetry_datastore_core::StorableQuery;
use telemetry_datastore_core::StorageClient;
use telemetry_datastore_core::StorageError;
use telemetry_datastore_core::StoredMessage;
use telemetry_datastore_core::Timestamp;
use telemetry_datastore_core::compile;
use telemetry_datastore_core::message_partition;
use telemetry_datastore_core::message_partition_wildcard;
use telemetry_datastore_core::query::BackendQuery;

/// 2024-01-29T00:00:00Z, ISO week 2024-W05.
const BASE_MS: i64 = 1_706_486_400_000;

fn message(scope: &str, client: &str, channel: &str, millis: i64) -> DatastoreMessage {
    let mut payload = Payload::new();
    payload.insert(MetricName::new("temperature"), MetricValue::Double(21.5));
    payload.insert(MetricName::new("online"), MetricValue::Boolean(true));
    DatastoreMessage {
        scope_id: ScopeId::new(scope),
        client_id: ClientId::new(client),
        channel: ChannelPath::new(channel),
        timestamp: Timestamp::from_millis(millis),
        position: None,
        payload,
    }
}

/// Stores a message document the way a message store would, returning the
/// backend-assigned identifier.
fn store_message(store: &dyn StorageClient, message: &DatastoreMessage) -> StorableId {
    let partition = message_partition(&message.scope_id, message.timestamp).unwrap();
    let stored = StoredMessage {
        id: StorableId::new("unassigned"),
        message: message.clone(),
    };
    store.insert(&partition, stored.marshal().unwrap()).unwrap()
}

fn mediator_over(store: &InMemoryStorageClient) -> RegistryMediator {
    RegistryMediator::new(Arc::new(store.clone()), MediatorConfig::default())
}

fn list(
    mediator: &RegistryMediator,
    scope: &str,
    kind: RegistryKind,
) -> Vec<RegistryEntry> {
    mediator
        .query_registry(
            &ScopeId::new(scope),
            kind,
            StorableQuery::new(Predicate::and(Vec::new())),
        )
        .unwrap()
        .entries
}

// ============================================================================
// SECTION: Ingest
// ============================================================================

#[test]
fn ingest_refreshes_one_row_per_dimension() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    let stored_id = store_message(&store, &message);

    let report = mediator.on_message_stored(&stored_id, &message).unwrap();
    assert!(report.metric_results.is_fully_successful());
    assert_eq!(report.metric_results.items.len(), 2);

    assert_eq!(list(&mediator, "42", RegistryKind::Client).len(), 1);
    assert_eq!(list(&mediator, "42", RegistryKind::Channel).len(), 1);
    assert_eq!(list(&mediator, "42", RegistryKind::Metric).len(), 2);
}

#[test]
fn duplicate_delivery_converges_to_the_same_rows() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    let stored_id = store_message(&store, &message);

    let first = mediator.on_message_stored(&stored_id, &message).unwrap();
    let second = mediator.on_message_stored(&stored_id, &message).unwrap();
    assert_eq!(first.client_entry_id, second.client_entry_id);
    assert_eq!(first.channel_entry_id, second.channel_entry_id);

    assert_eq!(list(&mediator, "42", RegistryKind::Client).len(), 1);
    assert_eq!(list(&mediator, "42", RegistryKind::Channel).len(), 1);
    assert_eq!(list(&mediator, "42", RegistryKind::Metric).len(), 2);
}

#[test]
fn distinct_channels_get_distinct_channel_rows() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    for channel in ["sensors/temp", "sensors/humidity"] {
        let message = message("42", "device-7", channel, BASE_MS);
        let stored_id = store_message(&store, &message);
        mediator.on_message_stored(&stored_id, &message).unwrap();
    }
    assert_eq!(list(&mediator, "42", RegistryKind::Client).len(), 1);
    assert_eq!(list(&mediator, "42", RegistryKind::Channel).len(), 2);
}

#[test]
fn kind_restriction_keeps_row_families_apart() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    let stored_id = store_message(&store, &message);
    mediator.on_message_stored(&stored_id, &message).unwrap();

    for entry in list(&mediator, "42", RegistryKind::Client) {
        assert_eq!(entry.kind(), RegistryKind::Client);
    }
    let count = mediator
        .count_registry(
            &ScopeId::new("42"),
            RegistryKind::Metric,
            StorableQuery::new(Predicate::and(Vec::new())),
        )
        .unwrap();
    assert_eq!(count, 2);
}

// ============================================================================
// SECTION: Partial Bulk Failure
// ============================================================================

/// Storage wrapper that fails one bulk item by position while applying the
/// rest, mimicking a backend rejecting a single document.
struct FlakyBulkClient {
    /// Backing store.
    inner: InMemoryStorageClient,
    /// Zero-based bulk item position to fail.
    fail_index: usize,
}

impl StorageClient for FlakyBulkClient {
    fn insert(
        &self,
        partition: &PartitionName,
        document: Document,
    ) -> Result<StorableId, StorageError> {
        self.inner.insert(partition, document)
    }

    fn upsert(
        &self,
        partition: &PartitionName,
        id: &StorableId,
        document: Document,
    ) -> Result<StorableId, StorageError> {
        self.inner.upsert(partition, id, document)
    }

    fn bulk_upsert(&self, items: Vec<BulkUpsertItem>) -> Result<BulkResponse, StorageError> {
        let mut response = BulkResponse::default();
        for (index, item) in items.into_iter().enumerate() {
            if index == self.fail_index {
                response.items.push(BulkItemResult {
                    id: item.id,
                    error: Some("simulated item rejection".to_string()),
                });
                continue;
            }
            let outcome = self.inner.upsert(&item.partition, &item.id, item.document);
            response.items.push(BulkItemResult {
                id: item.id,
                error: outcome.err().map(|error| error.to_string()),
            });
        }
        Ok(response)
    }

    fn query(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<QueryHits, StorageError> {
        self.inner.query(partition, query)
    }

    fn count(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<u64, StorageError> {
        self.inner.count(partition, query)
    }

    fn delete(&self, partition: &PartitionName, id: &StorableId) -> Result<(), StorageError> {
        self.inner.delete(partition, id)
    }

    fn scrolling_delete(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<u64, StorageError> {
        self.inner.scrolling_delete(partition, query)
    }

    fn partition_exists(&self, partition: &PartitionName) -> Result<bool, StorageError> {
        self.inner.partition_exists(partition)
    }

    fn ensure_mapping(
        &self,
        partition: &PartitionName,
        schema_spec: &Value,
    ) -> Result<(), StorageError> {
        self.inner.ensure_mapping(partition, schema_spec)
    }
}

#[test]
fn failing_bulk_item_aborts_nothing_and_is_reported_once() {
    let inner = InMemoryStorageClient::new();
    let mediator = RegistryMediator::new(
        Arc::new(FlakyBulkClient {
            inner: inner.clone(),
            fail_index: 1,
        }),
        MediatorConfig::default(),
    );
    let mut message = message("42", "device-7", "sensors/temp", BASE_MS);
    message.payload.insert(MetricName::new("pressure"), MetricValue::Long(1_013));
    let stored_id = store_message(&inner, &message);

    let report = mediator.on_message_stored(&stored_id, &message).unwrap();
    assert_eq!(report.metric_results.items.len(), 3);
    assert_eq!(report.metric_results.failures().count(), 1);

    let fallback = mediator_over(&inner);
    assert_eq!(list(&fallback, "42", RegistryKind::Metric).len(), 2);
    assert_eq!(list(&fallback, "42", RegistryKind::Client).len(), 1);
}

// ============================================================================
// SECTION: Enrichment
// ============================================================================

#[test]
fn enrichment_reports_the_latest_of_three_messages() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let mut latest_id = StorableId::new("unset");
    for offset in [0, 1_000, 2_000] {
        let message = message("42", "device-7", "sensors/temp", BASE_MS + offset);
        let stored_id = store_message(&store, &message);
        mediator.on_message_stored(&stored_id, &message).unwrap();
        latest_id = stored_id;
    }

    let channels = list(&mediator, "42", RegistryKind::Channel);
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].last_message_on(), Some(Timestamp::from_millis(BASE_MS + 2_000)));
    match &channels[0] {
        RegistryEntry::Channel(entry) => {
            assert_eq!(entry.last_message_id.as_ref(), Some(&latest_id));
        }
        RegistryEntry::Client(_) | RegistryEntry::Metric(_) => {
            panic!("expected a channel entry")
        }
    }
}

#[test]
fn enrichment_tolerates_rows_whose_messages_are_gone() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    // Registry rows refreshed without the message ever landing in a bucket,
    // as happens after retention drops old buckets.
    mediator.on_message_stored(&StorableId::new("dropped"), &message).unwrap();

    let clients = list(&mediator, "42", RegistryKind::Client);
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].last_message_on(), None);
}

/// Storage wrapper that duplicates field-style query hits, simulating a
/// backend violating the limit-1 contract.
struct DuplicatingClient {
    /// Backing store.
    inner: InMemoryStorageClient,
}

impl StorageClient for DuplicatingClient {
    fn insert(
        &self,
        partition: &PartitionName,
        document: Document,
    ) -> Result<StorableId, StorageError> {
        self.inner.insert(partition, document)
    }

    fn upsert(
        &self,
        partition: &PartitionName,
        id: &StorableId,
        document: Document,
    ) -> Result<StorableId, StorageError> {
        self.inner.upsert(partition, id, document)
    }

    fn bulk_upsert(&self, items: Vec<BulkUpsertItem>) -> Result<BulkResponse, StorageError> {
        self.inner.bulk_upsert(items)
    }

    fn query(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<QueryHits, StorageError> {
        let mut hits = self.inner.query(partition, query)?;
        if query.fetch_style == FetchStyle::Fields
            && let Some(first) = hits.hits.first().cloned()
        {
            hits.hits.push(first);
        }
        Ok(hits)
    }

    fn count(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<u64, StorageError> {
        self.inner.count(partition, query)
    }

    fn delete(&self, partition: &PartitionName, id: &StorableId) -> Result<(), StorageError> {
        self.inner.delete(partition, id)
    }

    fn scrolling_delete(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<u64, StorageError> {
        self.inner.scrolling_delete(partition, query)
    }

    fn partition_exists(&self, partition: &PartitionName) -> Result<bool, StorageError> {
        self.inner.partition_exists(partition)
    }

    fn ensure_mapping(
        &self,
        partition: &PartitionName,
        schema_spec: &Value,
    ) -> Result<(), StorageError> {
        self.inner.ensure_mapping(partition, schema_spec)
    }
}

#[test]
fn ambiguous_limit_one_lookup_leaves_last_fields_empty() {
    let inner = InMemoryStorageClient::new();
    let mediator = RegistryMediator::new(
        Arc::new(DuplicatingClient {
            inner: inner.clone(),
        }),
        MediatorConfig::default(),
    );
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    let stored_id = store_message(&inner, &message);
    mediator.on_message_stored(&stored_id, &message).unwrap();

    let clients = list(&mediator, "42", RegistryKind::Client);
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].last_message_on(), None);
}

// ============================================================================
// SECTION: Cascading Deletes
// ============================================================================

#[test]
fn channel_cascade_removes_messages_and_metric_rows_but_spares_other_scopes() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    for scope in ["42", "99"] {
        let message = message(scope, "device-7", "sensors/temp", BASE_MS);
        let stored_id = store_message(&store, &message);
        mediator.on_message_stored(&stored_id, &message).unwrap();
    }

    let channels = list(&mediator, "42", RegistryKind::Channel);
    let RegistryEntry::Channel(doomed) = &channels[0] else {
        panic!("expected a channel entry");
    };
    mediator.delete_channel_entry(doomed).unwrap();

    assert!(list(&mediator, "42", RegistryKind::Channel).is_empty());
    assert!(list(&mediator, "42", RegistryKind::Metric).is_empty());
    // The untouched scope keeps its rows and its message.
    assert_eq!(list(&mediator, "99", RegistryKind::Channel).len(), 1);
    assert_eq!(list(&mediator, "99", RegistryKind::Metric).len(), 2);
    assert_eq!(
        list(&mediator, "99", RegistryKind::Channel)[0].last_message_on(),
        Some(Timestamp::from_millis(BASE_MS))
    );
}

#[test]
fn channel_cascade_covers_every_client_publishing_on_the_channel() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    for client in ["device-a", "device-b"] {
        let message = message("42", client, "sensors/temp", BASE_MS);
        let stored_id = store_message(&store, &message);
        mediator.on_message_stored(&stored_id, &message).unwrap();
    }

    let channels = list(&mediator, "42", RegistryKind::Channel);
    assert_eq!(channels.len(), 2);
    let RegistryEntry::Channel(doomed) = &channels[0] else {
        panic!("expected a channel entry");
    };
    mediator.delete_channel_entry(doomed).unwrap();

    // The cascade is channel-wide: no message and no metric row survives,
    // whichever client published it.
    let wildcard = message_partition_wildcard(&ScopeId::new("42")).unwrap();
    let on_channel =
        compile(&StorableQuery::new(Predicate::term("channel", "sensors/temp"))).unwrap();
    assert_eq!(store.count(&wildcard, &on_channel).unwrap(), 0);
    assert!(list(&mediator, "42", RegistryKind::Metric).is_empty());
    // Only the addressed channel row is removed; the other client's row
    // remains, pointing at nothing until it publishes again.
    assert_eq!(list(&mediator, "42", RegistryKind::Channel).len(), 1);
}

#[test]
fn client_delete_removes_the_first_message_and_the_row() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    let stored_id = store_message(&store, &message);
    mediator.on_message_stored(&stored_id, &message).unwrap();

    let clients = list(&mediator, "42", RegistryKind::Client);
    let RegistryEntry::Client(doomed) = &clients[0] else {
        panic!("expected a client entry");
    };
    mediator.delete_client_entry(doomed).unwrap();

    assert!(list(&mediator, "42", RegistryKind::Client).is_empty());
    // The first message itself is gone, so the channel row now enriches to
    // empty last-published fields.
    let channels = list(&mediator, "42", RegistryKind::Channel);
    assert_eq!(channels[0].last_message_on(), None);
}

#[test]
fn client_delete_tolerates_an_already_dropped_first_message() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    mediator.on_message_stored(&StorableId::new("dropped"), &message).unwrap();

    let clients = list(&mediator, "42", RegistryKind::Client);
    let RegistryEntry::Client(doomed) = &clients[0] else {
        panic!("expected a client entry");
    };
    mediator.delete_client_entry(doomed).unwrap();
    assert!(list(&mediator, "42", RegistryKind::Client).is_empty());
}

#[test]
fn metric_delete_removes_only_the_addressed_row() {
    let store = InMemoryStorageClient::new();
    let mediator = mediator_over(&store);
    let message = message("42", "device-7", "sensors/temp", BASE_MS);
    let stored_id = store_message(&store, &message);
    mediator.on_message_stored(&stored_id, &message).unwrap();

    let metrics = list(&mediator, "42", RegistryKind::Metric);
    assert_eq!(metrics.len(), 2);
    mediator.delete_metric_entry(&ScopeId::new("42"), metrics[0].id()).unwrap();
    assert_eq!(list(&mediator, "42", RegistryKind::Metric).len(), 1);
}
