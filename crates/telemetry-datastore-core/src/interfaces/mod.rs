// crates/telemetry-datastore-core/src/interfaces/mod.rs
// ============================================================================
// Module: Telemetry Datastore Storage Interface
// Description: Capability trait between the core and storage engines.
// Purpose: Keep the core backend-agnostic behind one synchronous seam.
// Dependencies: thiserror, serde_json, crate::{core, query}
// ============================================================================

//! ## Overview
//! [`StorageClient`] is the only seam between the core and a storage
//! engine. Implementations are selected by explicit construction over a
//! closed set; nothing is discovered or loaded dynamically. All calls are
//! synchronous with a per-call timeout fixed at client construction, and
//! bulk writes report per-item outcomes rather than failing as a unit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::core::document::Document;
use crate::core::identifiers::StorableId;
use crate::core::partition::PartitionName;
use crate::query::BackendQuery;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by storage client calls.
///
/// # Invariants
/// - `Unavailable` is surfaced verbatim; the core never retries on the
///   caller's behalf.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or timed out.
    #[error("storage backend unavailable: {detail}")]
    Unavailable {
        /// Description of the failure.
        detail: String,
    },
    /// A scroll cursor expired mid-operation; restart from scratch.
    #[error("scroll cursor expired")]
    CursorExpired,
    /// The addressed document does not exist.
    #[error("document '{id}' not found")]
    NotFound {
        /// Identifier of the missing document.
        id: StorableId,
    },
    /// The backend reported an unexpected failure.
    #[error("storage backend error: {detail}")]
    Internal {
        /// Description of the failure.
        detail: String,
    },
}

// ============================================================================
// SECTION: Query Results
// ============================================================================

/// One matching row of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    /// Identifier of the matching document.
    pub id: StorableId,
    /// Document content, projected per the query's fetch style.
    pub document: Document,
}

/// A page of query results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryHits {
    /// Matching rows in sort order.
    pub hits: Vec<QueryHit>,
    /// Total match count, when the query asked for it.
    pub total: Option<u64>,
}

// ============================================================================
// SECTION: Bulk Writes
// ============================================================================

/// One document of a bulk upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpsertItem {
    /// Partition the document belongs to.
    pub partition: PartitionName,
    /// Document identifier.
    pub id: StorableId,
    /// Document content.
    pub document: Document,
}

/// Outcome of one bulk item.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    /// Identifier of the document the item addressed.
    pub id: StorableId,
    /// Failure description, absent on success.
    pub error: Option<String>,
}

impl BulkItemResult {
    /// Returns `true` when the item was applied.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-item outcomes of a bulk upsert.
///
/// # Invariants
/// - Carries one result per submitted item, in submission order; a failing
///   item never prevents the others from being applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkResponse {
    /// Item outcomes in submission order.
    pub items: Vec<BulkItemResult>,
}

impl BulkResponse {
    /// Returns `true` when every item was applied.
    #[must_use]
    pub fn is_fully_successful(&self) -> bool {
        self.items.iter().all(BulkItemResult::is_success)
    }

    /// Iterates over the failed items.
    pub fn failures(&self) -> impl Iterator<Item = &BulkItemResult> {
        self.items.iter().filter(|item| !item.is_success())
    }
}

// ============================================================================
// SECTION: Storage Client
// ============================================================================

/// Capability trait a storage engine implements to back the datastore.
pub trait StorageClient: Send + Sync {
    /// Inserts a document with a backend-assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the write fails.
    fn insert(
        &self,
        partition: &PartitionName,
        document: Document,
    ) -> Result<StorableId, StorageError>;

    /// Creates or replaces the document under the given identifier.
    /// Atomic per document.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the write fails.
    fn upsert(
        &self,
        partition: &PartitionName,
        id: &StorableId,
        document: Document,
    ) -> Result<StorableId, StorageError>;

    /// Applies a batch of upserts, reporting per-item outcomes.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] only when the batch could not be
    /// submitted at all; item failures are data, not errors.
    fn bulk_upsert(&self, items: Vec<BulkUpsertItem>) -> Result<BulkResponse, StorageError>;

    /// Runs a compiled query and returns the matching page.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the query fails.
    fn query(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<QueryHits, StorageError>;

    /// Counts the documents matching a compiled query.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the count fails.
    fn count(&self, partition: &PartitionName, query: &BackendQuery)
    -> Result<u64, StorageError>;

    /// Deletes the document under the given identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the delete fails.
    fn delete(&self, partition: &PartitionName, id: &StorableId) -> Result<(), StorageError>;

    /// Deletes every document matching a compiled query by repeatedly
    /// fetching a page, deleting it, and advancing the cursor until a page
    /// comes back empty. Returns the number of documents deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CursorExpired`] when the cursor lapses
    /// mid-operation; the whole operation must then be restarted.
    fn scrolling_delete(
        &self,
        partition: &PartitionName,
        query: &BackendQuery,
    ) -> Result<u64, StorageError>;

    /// Returns `true` when the partition exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the check fails.
    fn partition_exists(&self, partition: &PartitionName) -> Result<bool, StorageError>;

    /// Creates the partition with the given mapping specification when it
    /// does not already exist. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the mapping cannot be applied.
    fn ensure_mapping(
        &self,
        partition: &PartitionName,
        schema_spec: &Value,
    ) -> Result<(), StorageError>;
}

/// Shared handle to a storage client.
pub type SharedStorageClient = Arc<dyn StorageClient>;
