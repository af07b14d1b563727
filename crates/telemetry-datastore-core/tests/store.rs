// crates/telemetry-datastore-core/tests/store.rs
// ============================================================================
// Module: In-Memory Storage Tests
// Description: Ensures the in-memory client evaluates compiled queries.
// ============================================================================
//! ## Overview
//! Validates clause evaluation over nested documents, wildcard partition
//! fan-out, sorting, paging, projections, and scroll deletion.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use serde_json::json;
use telemetry_datastore_core::Document;
use telemetry_datastore_core::FetchStyle;
use telemetry_datastore_core::InMemoryStorageClient;
use telemetry_datastore_core::PartitionName;
use telemetry_datastore_core::Predicate;
use telemetry_datastore_core::ScopeId;
use telemetry_datastore_core::SortField;
use telemetry_datastore_core::StorableId;
use telemetry_datastore_core::StorableQuery;
use telemetry_datastore_core::StorageClient;
use telemetry_datastore_core::StorageError;
use telemetry_datastore_core::Timestamp;
use telemetry_datastore_core::compile;
use telemetry_datastore_core::message_partition;
use telemetry_datastore_core::message_partition_wildcard;
use telemetry_datastore_core::schema;

/// 2024-01-29T00:00:00Z, ISO week 2024-W05.
const WEEK_05_MS: i64 = 1_706_486_400_000;
/// 2024-02-05T00:00:00Z, ISO week 2024-W06.
const WEEK_06_MS: i64 = WEEK_05_MS + 7 * 86_400_000;

fn document(client: &str, timestamp: i64) -> Document {
    json!({
        "client_id": client,
        "timestamp": timestamp,
        "metrics": { "temperature": { "dbl": 21.5 } },
    })
    .as_object()
    .unwrap()
    .clone()
}

fn bucket(scope: &str, millis: i64) -> PartitionName {
    message_partition(&ScopeId::new(scope), Timestamp::from_millis(millis)).unwrap()
}

#[test]
fn term_query_matches_on_top_level_field() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    store.insert(&partition, document("device-7", WEEK_05_MS)).unwrap();
    store.insert(&partition, document("device-8", WEEK_05_MS)).unwrap();

    let query = compile(&StorableQuery::new(Predicate::term("client_id", "device-7"))).unwrap();
    let hits = store.query(&partition, &query).unwrap();
    assert_eq!(hits.hits.len(), 1);
    assert_eq!(hits.hits[0].document.get("client_id"), Some(&json!("device-7")));
}

#[test]
fn exists_query_walks_dotted_paths() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    store.insert(&partition, document("device-7", WEEK_05_MS)).unwrap();

    let present = compile(&StorableQuery::new(Predicate::exists("metrics.temperature.dbl")))
        .unwrap();
    let absent =
        compile(&StorableQuery::new(Predicate::exists("metrics.humidity.dbl"))).unwrap();
    assert_eq!(store.query(&partition, &present).unwrap().hits.len(), 1);
    assert_eq!(store.query(&partition, &absent).unwrap().hits.len(), 0);
}

#[test]
fn wildcard_partition_fans_out_over_week_buckets() {
    let store = InMemoryStorageClient::new();
    store.insert(&bucket("42", WEEK_05_MS), document("device-7", WEEK_05_MS)).unwrap();
    store.insert(&bucket("42", WEEK_06_MS), document("device-7", WEEK_06_MS)).unwrap();
    store.insert(&bucket("99", WEEK_05_MS), document("device-7", WEEK_05_MS)).unwrap();

    let wildcard = message_partition_wildcard(&ScopeId::new("42")).unwrap();
    let query = compile(&StorableQuery::new(Predicate::and(Vec::new()))).unwrap();
    assert_eq!(store.query(&wildcard, &query).unwrap().hits.len(), 2);
}

#[test]
fn range_query_filters_inclusively() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    for offset in [0, 1_000, 2_000] {
        store.insert(&partition, document("device-7", WEEK_05_MS + offset)).unwrap();
    }
    let predicate = Predicate::range(
        "timestamp",
        Some(json!(WEEK_05_MS)),
        Some(json!(WEEK_05_MS + 1_000)),
    )
    .unwrap();
    let query = compile(&StorableQuery::new(predicate)).unwrap();
    assert_eq!(store.query(&partition, &query).unwrap().hits.len(), 2);
}

#[test]
fn descending_sort_with_offset_and_limit_pages_newest_first() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    for offset in [0, 1_000, 2_000, 3_000] {
        store.insert(&partition, document("device-7", WEEK_05_MS + offset)).unwrap();
    }
    let query = compile(
        &StorableQuery::new(Predicate::and(Vec::new()))
            .sorted_by(SortField::descending("timestamp"))
            .with_offset(1)
            .with_limit(2)
            .with_total_count(),
    )
    .unwrap();
    let hits = store.query(&partition, &query).unwrap();
    assert_eq!(hits.total, Some(4));
    let timestamps: Vec<i64> = hits
        .hits
        .iter()
        .map(|hit| hit.document.get("timestamp").and_then(serde_json::Value::as_i64).unwrap())
        .collect();
    assert_eq!(timestamps, vec![WEEK_05_MS + 2_000, WEEK_05_MS + 1_000]);
}

#[test]
fn id_term_addresses_a_document_by_identifier() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    let id = store.insert(&partition, document("device-7", WEEK_05_MS)).unwrap();
    store.insert(&partition, document("device-8", WEEK_05_MS)).unwrap();

    let query = compile(&StorableQuery::new(Predicate::term("_id", id.as_str()))).unwrap();
    let hits = store.query(&partition, &query).unwrap();
    assert_eq!(hits.hits.len(), 1);
    assert_eq!(hits.hits[0].id, id);
}

#[test]
fn fields_projection_returns_only_requested_paths() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    store.insert(&partition, document("device-7", WEEK_05_MS)).unwrap();

    let query = compile(
        &StorableQuery::new(Predicate::and(Vec::new()))
            .with_fetch_style(FetchStyle::Fields)
            .with_includes(vec!["timestamp".to_string()]),
    )
    .unwrap();
    let hits = store.query(&partition, &query).unwrap();
    let projected = &hits.hits[0].document;
    assert_eq!(projected.len(), 1);
    assert_eq!(projected.get("timestamp"), Some(&json!(WEEK_05_MS)));
}

#[test]
fn upsert_replaces_in_place() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    let id = StorableId::new("row-1");
    store.upsert(&partition, &id, document("device-7", WEEK_05_MS)).unwrap();
    store.upsert(&partition, &id, document("device-7", WEEK_05_MS + 500)).unwrap();

    let query = compile(&StorableQuery::new(Predicate::and(Vec::new()))).unwrap();
    let hits = store.query(&partition, &query).unwrap();
    assert_eq!(hits.hits.len(), 1);
    assert_eq!(hits.hits[0].document.get("timestamp"), Some(&json!(WEEK_05_MS + 500)));
}

#[test]
fn delete_of_missing_document_reports_not_found() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    store.insert(&partition, document("device-7", WEEK_05_MS)).unwrap();
    let result = store.delete(&partition, &StorableId::new("no-such-row"));
    assert!(matches!(result, Err(StorageError::NotFound { .. })));
}

#[test]
fn scrolling_delete_removes_every_match_across_buckets() {
    let store = InMemoryStorageClient::new();
    store.insert(&bucket("42", WEEK_05_MS), document("device-7", WEEK_05_MS)).unwrap();
    store.insert(&bucket("42", WEEK_06_MS), document("device-7", WEEK_06_MS)).unwrap();
    store.insert(&bucket("42", WEEK_06_MS), document("device-8", WEEK_06_MS)).unwrap();

    let wildcard = message_partition_wildcard(&ScopeId::new("42")).unwrap();
    let targeted = compile(&StorableQuery::new(Predicate::term("client_id", "device-7")))
        .unwrap();
    let deleted = store.scrolling_delete(&wildcard, &targeted).unwrap();
    assert_eq!(deleted, 2);

    let everything = compile(&StorableQuery::new(Predicate::and(Vec::new()))).unwrap();
    assert_eq!(store.count(&wildcard, &everything).unwrap(), 1);
}

#[test]
fn ensure_mapping_creates_the_partition_idempotently() {
    let store = InMemoryStorageClient::new();
    let partition = bucket("42", WEEK_05_MS);
    assert!(!store.partition_exists(&partition).unwrap());
    store.ensure_mapping(&partition, &schema::message_mapping()).unwrap();
    store.ensure_mapping(&partition, &schema::message_mapping()).unwrap();
    assert!(store.partition_exists(&partition).unwrap());
}

#[test]
fn partition_exists_matches_wildcards() {
    let store = InMemoryStorageClient::new();
    store.insert(&bucket("42", WEEK_05_MS), document("device-7", WEEK_05_MS)).unwrap();

    let wildcard = message_partition_wildcard(&ScopeId::new("42")).unwrap();
    let other = message_partition_wildcard(&ScopeId::new("99")).unwrap();
    assert!(store.partition_exists(&wildcard).unwrap());
    assert!(!store.partition_exists(&other).unwrap());
}
