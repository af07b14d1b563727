// crates/telemetry-datastore-core/src/runtime/enrichment.rs
// ============================================================================
// Module: Telemetry Datastore Last-Published Enrichment
// Description: Fills transient last-published fields on registry entries.
// Purpose: Resolve the latest message per registry dimension at read time.
// Dependencies: tracing, crate::{core, interfaces, query, runtime}
// ============================================================================

//! ## Overview
//! Last-published fields are never stored. Each registry entry handed to a
//! caller is enriched by one limit-1 message query, filtered by the
//! entry's dimensions and sorted by timestamp descending, over the scope's
//! message bucket wildcard. Zero hits is tolerated (retention may have
//! dropped the buckets) and logged at warn; more than one hit from a
//! limit-1 query is an integrity violation logged at error. In both cases
//! the entry is returned with empty last-published fields.
//!
//! Pages enrich concurrently from a bounded pool of scoped threads so a
//! large listing does not serialize behind per-row round trips.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;

use tracing::error;
use tracing::warn;

use crate::core::partition::message_partition_wildcard;
use crate::core::registry::RegistryEntry;
use crate::core::schema;
use crate::core::time::Timestamp;
use crate::interfaces::StorageClient;
use crate::query::FetchStyle;
use crate::query::Predicate;
use crate::query::SortField;
use crate::query::StorableQuery;
use crate::query::compile;
use crate::runtime::mediator::MediatorError;

// ============================================================================
// SECTION: Entry Enrichment
// ============================================================================

/// Enriches one registry entry with its last-published fields.
///
/// # Errors
///
/// Returns a [`MediatorError`] when the lookup query cannot be built or
/// the storage call fails. Zero or ambiguous hits are not errors.
pub fn enrich_entry(
    storage: &dyn StorageClient,
    entry: &mut RegistryEntry,
) -> Result<(), MediatorError> {
    let partition = message_partition_wildcard(entry.scope_id())?;
    let mut children =
        vec![Predicate::term(schema::MSG_CLIENT_ID, entry.client_id().as_str())];
    if let Some(channel) = entry.channel() {
        children.push(Predicate::term(schema::MSG_CHANNEL, channel.as_str()));
    }
    if let RegistryEntry::Metric(metric) = &*entry {
        children.push(Predicate::exists(schema::qualified_metric_field(
            &metric.name,
            metric.metric_type,
        )));
    }
    let query = StorableQuery::new(Predicate::and(children))
        .sorted_by(SortField::descending(schema::MSG_TIMESTAMP))
        .with_fetch_style(FetchStyle::Fields)
        .with_includes(vec![schema::MSG_TIMESTAMP.to_string()])
        .with_limit(1);
    let compiled = compile(&query)?;
    let hits = storage.query(&partition, &compiled)?;
    match hits.hits.as_slice() {
        [] => {
            warn!(
                kind = entry.kind().as_str(),
                scope = entry.scope_id().as_str(),
                client = entry.client_id().as_str(),
                "no message found for registry entry; leaving last-published fields empty"
            );
            entry.set_last_published(None, None);
        }
        [hit] => {
            let millis = hit
                .document
                .get(schema::MSG_TIMESTAMP)
                .and_then(serde_json::Value::as_i64);
            match millis {
                Some(millis) => entry.set_last_published(
                    Some(hit.id.clone()),
                    Some(Timestamp::from_millis(millis)),
                ),
                None => {
                    warn!(
                        kind = entry.kind().as_str(),
                        scope = entry.scope_id().as_str(),
                        message = hit.id.as_str(),
                        "latest message carries no timestamp field; leaving last-published fields empty"
                    );
                    entry.set_last_published(None, None);
                }
            }
        }
        hits => {
            error!(
                kind = entry.kind().as_str(),
                scope = entry.scope_id().as_str(),
                client = entry.client_id().as_str(),
                hits = hits.len(),
                "limit-1 lookup returned multiple messages; leaving last-published fields empty"
            );
            entry.set_last_published(None, None);
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Page Enrichment
// ============================================================================

/// Enriches a page of registry entries from a bounded pool of scoped
/// threads. A `workers` value of zero is treated as one.
///
/// # Errors
///
/// Returns the first [`MediatorError`] raised by any worker.
pub fn enrich_page(
    storage: &dyn StorageClient,
    entries: &mut [RegistryEntry],
    workers: usize,
) -> Result<(), MediatorError> {
    let workers = workers.max(1);
    if workers == 1 || entries.len() <= 1 {
        for entry in entries {
            enrich_entry(storage, entry)?;
        }
        return Ok(());
    }
    let chunk_size = entries.len().div_ceil(workers);
    let outcomes: Vec<Result<(), MediatorError>> = thread::scope(|scope| {
        let handles: Vec<_> = entries
            .chunks_mut(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    for entry in chunk {
                        enrich_entry(storage, entry)?;
                    }
                    Ok(())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(MediatorError::Enrichment {
                        detail: "enrichment worker panicked".to_string(),
                    })
                })
            })
            .collect()
    });
    for outcome in outcomes {
        outcome?;
    }
    Ok(())
}
