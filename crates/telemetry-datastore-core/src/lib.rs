// crates/telemetry-datastore-core/src/lib.rs
// ============================================================================
// Module: Telemetry Datastore Core Library
// Description: Public API surface for the Telemetry Datastore core.
// Purpose: Expose the data model, query model, storage interfaces, and the
//          registry mediator runtime.
// Dependencies: crate::{core, interfaces, query, runtime}
// ============================================================================

//! ## Overview
//! Telemetry Datastore core keeps three derived registry collections
//! (per-client, per-channel, per-metric) eventually consistent with an
//! append-only, possibly out-of-order, possibly duplicated message stream.
//! It is backend-agnostic: callers build portable queries against the
//! [`query`] model and plug in a storage engine through the
//! [`interfaces::StorageClient`] capability trait.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod query;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::BulkItemResult;
pub use interfaces::BulkResponse;
pub use interfaces::BulkUpsertItem;
pub use interfaces::QueryHit;
pub use interfaces::QueryHits;
pub use interfaces::SharedStorageClient;
pub use interfaces::StorageClient;
pub use interfaces::StorageError;
pub use query::BackendQuery;
pub use query::FetchStyle;
pub use query::Predicate;
pub use query::QueryError;
pub use query::SortDirection;
pub use query::SortField;
pub use query::StorableQuery;
pub use query::compile;
pub use runtime::IngestPhase;
pub use runtime::IngestReport;
pub use runtime::InMemoryStorageClient;
pub use runtime::MediatorConfig;
pub use runtime::MediatorError;
pub use runtime::RegistryMediator;
pub use runtime::RegistryPage;
