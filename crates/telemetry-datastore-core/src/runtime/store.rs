// crates/telemetry-datastore-core/src/runtime/store.rs
// ============================================================================
// Module: Telemetry Datastore In-Memory Storage
// Description: In-memory storage client for tests and demos.
// Purpose: Evaluate compiled backend queries over nested documents without
//          an external engine.
// Dependencies: serde_json, crate::{core, interfaces, query}
// ============================================================================

//! ## Overview
//! The in-memory client keeps one document map per partition behind a
//! mutex and evaluates compiled query bodies directly: term, range,
//! prefix, exists, bool/must, and match-all clauses over dotted document
//! paths. Wildcard partition names fan out over every week bucket of the
//! scope, matching how a real backend expands an index wildcard.
//!
//! Term clauses on the reserved `_id` field compare against the document
//! identifier rather than document content.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering as AtomicOrdering;

use serde_json::Value;

use crate::core::document::Document;
use crate::core::identifiers::StorableId;
use crate::core::partition::PartitionName;
use crate::core::schema;
use crate::interfaces::BulkItemResult;
use crate::interfaces::BulkResponse;
use crate::interfaces::BulkUpsertItem;
use crate::interfaces::QueryHit;
use crate::interfaces::QueryHits;
use crate::interfaces::StorageClient;
use crate::interfaces::StorageError;
use crate::query::BackendQuery;
use crate::query::FetchStyle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Page size used by scrolling deletes when the query leaves size unset.
const DEFAULT_SCROLL_PAGE: u64 = 100;

// ============================================================================
// SECTION: Storage State
// ============================================================================

/// One stored partition: its mapping and its documents.
#[derive(Debug, Default)]
struct StoredPartition {
    /// Mapping specification applied at creation, when any.
    mapping: Option<Value>,
    /// Documents keyed by identifier.
    documents: BTreeMap<StorableId, Document>,
}

/// In-memory storage client for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorageClient {
    /// Partition map protected by a mutex.
    partitions: Arc<Mutex<BTreeMap<String, StoredPartition>>>,
    /// Monotonic counter backing assigned identifiers.
    next_id: Arc<AtomicU64>,
}

impl InMemoryStorageClient {
    /// Creates an empty in-memory storage client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the partition map.
    fn locked(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredPartition>>, StorageError> {
        self.partitions.lock().map_err(|_| StorageError::Internal {
            detail: "partition map mutex poisoned".to_string(),
        })
    }

    /// Assigns the next document identifier.
    fn assign_id(&self) -> StorableId {
        let number = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        StorableId::new(format!("doc-{number:08}"))
    }

    /// Returns the concrete partition names a name addresses, expanding a
    /// trailing wildcard over every existing bucket with the prefix.
    fn resolve(
        guard: &BTreeMap<String, StoredPartition>,
        partition: &PartitionName,
    ) -> Vec<String> {
        if partition.is_wildcard() {
            let prefix = partition.as_str().trim_end_matches('*');
            guard.keys().filter(|name| name.starts_with(prefix)).cloned().collect()
        } else {
            vec![partition.as_str().to_string()]
        }
    }

    /// Collects the (id, document) pairs matching a compiled query, in
    /// sort order, before offset and limit are applied.
    fn collect_matches(
        guard: &BTreeMap<String, StoredPartition>,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Vec<(StorableId, Document)> {
        let mut matches: Vec<(StorableId, Document)> = Vec::new();
        for name in Self::resolve(guard, partition) {
            if let Some(stored) = guard.get(&name) {
                for (id, document) in &stored.documents {
                    if clause_matches(id, document, &query.query) {
                        matches.push((id.clone(), document.clone()));
                    }
                }
            }
        }
        sort_matches(&mut matches, &query.sort);
        matches
    }
}

// ============================================================================
// SECTION: Clause Evaluation
// ============================================================================

/// Walks a dotted path through nested objects.
fn lookup<'doc>(document: &'doc Document, path: &str) -> Option<&'doc Value> {
    if let Some(value) = document.get(path) {
        return Some(value);
    }
    let (head, rest) = path.split_once('.')?;
    lookup(document.get(head)?.as_object()?, rest)
}

/// Compares two scalar values of the same family.
fn compare_values(left: &Value, right: &Value) -> std::cmp::Ordering {
    match (left.as_f64(), right.as_f64(), left.as_str(), right.as_str()) {
        (Some(left_num), Some(right_num), _, _) => left_num.total_cmp(&right_num),
        (_, _, Some(left_text), Some(right_text)) => left_text.cmp(right_text),
        _ => std::cmp::Ordering::Equal,
    }
}

/// Returns `true` when two values are equal under loose numeric equality.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(left_num), Some(right_num)) => left_num == right_num,
        _ => left == right,
    }
}

/// Evaluates one compiled clause against a document.
fn clause_matches(id: &StorableId, document: &Document, clause: &Value) -> bool {
    let Some(object) = clause.as_object() else {
        return false;
    };
    let Some((kind, body)) = object.iter().next() else {
        return false;
    };
    match kind.as_str() {
        "match_all" => true,
        "term" => {
            let Some((field, expected)) = body.as_object().and_then(|map| map.iter().next())
            else {
                return false;
            };
            if field.as_str() == schema::ID {
                return expected.as_str() == Some(id.as_str());
            }
            lookup(document, field).is_some_and(|actual| values_equal(actual, expected))
        }
        "range" => {
            let Some((field, bounds)) = body.as_object().and_then(|map| map.iter().next())
            else {
                return false;
            };
            let Some(actual) = lookup(document, field) else {
                return false;
            };
            let Some(bounds) = bounds.as_object() else {
                return false;
            };
            let above_min = bounds
                .get("gte")
                .is_none_or(|low| compare_values(actual, low) != std::cmp::Ordering::Less);
            let below_max = bounds
                .get("lte")
                .is_none_or(|high| compare_values(actual, high) != std::cmp::Ordering::Greater);
            above_min && below_max
        }
        "prefix" => {
            let Some((field, expected)) = body.as_object().and_then(|map| map.iter().next())
            else {
                return false;
            };
            let Some(prefix) = expected.as_str() else {
                return false;
            };
            lookup(document, field)
                .and_then(Value::as_str)
                .is_some_and(|actual| actual.starts_with(prefix))
        }
        "exists" => body
            .as_object()
            .and_then(|map| map.get("field"))
            .and_then(Value::as_str)
            .is_some_and(|field| lookup(document, field).is_some()),
        "bool" => body
            .as_object()
            .and_then(|map| map.get("must"))
            .and_then(Value::as_array)
            .is_some_and(|children| {
                children.iter().all(|child| clause_matches(id, document, child))
            }),
        _ => false,
    }
}

/// Sorts matches by the compiled sort clauses; documents missing a sort
/// field order after those that carry it.
fn sort_matches(matches: &mut [(StorableId, Document)], sort: &[Value]) {
    matches.sort_by(|(_, left), (_, right)| {
        for clause in sort {
            let Some((field, spec)) = clause.as_object().and_then(|map| map.iter().next())
            else {
                continue;
            };
            let descending = spec
                .as_object()
                .and_then(|map| map.get("order"))
                .and_then(Value::as_str)
                == Some("desc");
            let ordering = match (lookup(left, field), lookup(right, field)) {
                (Some(left_value), Some(right_value)) => {
                    let natural = compare_values(left_value, right_value);
                    if descending { natural.reverse() } else { natural }
                }
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Projects a document per the query's fetch style.
fn project(document: &Document, query: &BackendQuery) -> Document {
    match query.fetch_style {
        FetchStyle::Source => document.clone(),
        FetchStyle::Fields => {
            let mut projected = Document::new();
            for field in &query.includes {
                if let Some(value) = lookup(document, field) {
                    projected.insert(field.clone(), value.clone());
                }
            }
            projected
        }
        FetchStyle::SourceSelect => {
            let mut projected = if query.includes.is_empty() {
                document.clone()
            } else {
                let mut selected = Document::new();
                for field in &query.includes {
                    if let Some(value) = lookup(document, field) {
                        selected.insert(field.clone(), value.clone());
                    }
                }
                selected
            };
            for field in &query.excludes {
                projected.remove(field);
            }
            projected
        }
    }
}

// ============================================================================
// SECTION: Storage Client Implementation
// ============================================================================

impl StorageClient for InMemoryStorageClient {
    fn insert(
        &self,
        partition: &PartitionName,
        document: Document,
    ) -> Result<StorableId, StorageError> {
        let id = self.assign_id();
        let mut guard = self.locked()?;
        guard
            .entry(partition.as_str().to_string())
            .or_default()
            .documents
            .insert(id.clone(), document);
        Ok(id)
    }

    fn upsert(
        &self,
        partition: &PartitionName,
        id: &StorableId,
        document: Document,
    ) -> Result<StorableId, StorageError> {
        let mut guard = self.locked()?;
        guard
            .entry(partition.as_str().to_string())
            .or_default()
            .documents
            .insert(id.clone(), document);
        Ok(id.clone())
    }

    fn bulk_upsert(&self, items: Vec<BulkUpsertItem>) -> Result<BulkResponse, StorageError> {
        let mut response = BulkResponse::default();
        for item in items {
            let outcome = self.upsert(&item.partition, &item.id, item.document);
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
        let guard = self.locked()?;
        let matches = Self::collect_matches(&guard, partition, query);
        let total = query.ask_total_count.then_some(matches.len() as u64);
        let hits = matches
            .into_iter()
            .skip(usize::try_from(query.from).unwrap_or(usize::MAX))
            .take(query.size.and_then(|size| usize::try_from(size).ok()).unwrap_or(usize::MAX))
            .map(|(id, document)| QueryHit {
                document: project(&document, query),
                id,
            })
            .collect();
        Ok(QueryHits {
            hits,
            total,
        })
    }

    fn count(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<u64, StorageError> {
        let guard = self.locked()?;
        Ok(Self::collect_matches(&guard, partition, query).len() as u64)
    }

    fn delete(&self, partition: &PartitionName, id: &StorableId) -> Result<(), StorageError> {
        let mut guard = self.locked()?;
        for name in Self::resolve(&guard, partition) {
            if let Some(stored) = guard.get_mut(&name)
                && stored.documents.remove(id).is_some()
            {
                return Ok(());
            }
        }
        Err(StorageError::NotFound {
            id: id.clone(),
        })
    }

    fn scrolling_delete(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<u64, StorageError> {
        let page_size =
            usize::try_from(query.size.unwrap_or(DEFAULT_SCROLL_PAGE)).unwrap_or(usize::MAX);
        let mut deleted = 0u64;
        loop {
            let page: Vec<StorableId> = {
                let guard = self.locked()?;
                Self::collect_matches(&guard, partition, query)
                    .into_iter()
                    .take(page_size)
                    .map(|(id, _)| id)
                    .collect()
            };
            if page.is_empty() {
                return Ok(deleted);
            }
            for id in page {
                self.delete(partition, &id)?;
                deleted += 1;
            }
        }
    }

    fn partition_exists(&self, partition: &PartitionName) -> Result<bool, StorageError> {
        let guard = self.locked()?;
        Ok(Self::resolve(&guard, partition).iter().any(|name| guard.contains_key(name)))
    }

    fn ensure_mapping(
        &self,
        partition: &PartitionName,
        schema_spec: &Value,
    ) -> Result<(), StorageError> {
        let mut guard = self.locked()?;
        let stored = guard.entry(partition.as_str().to_string()).or_default();
        if stored.mapping.is_none() {
            stored.mapping = Some(schema_spec.clone());
        }
        Ok(())
    }
}
