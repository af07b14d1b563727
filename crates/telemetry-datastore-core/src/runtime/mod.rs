// crates/telemetry-datastore-core/src/runtime/mod.rs
// ============================================================================
// Module: Telemetry Datastore Runtime
// Description: Registry mediator, enrichment, and in-memory storage.
// Purpose: Keep the derived registries consistent with the message stream.
// Dependencies: crate::{core, interfaces, query}
// ============================================================================

//! ## Overview
//! The runtime hosts the registry mediator (the single write path for the
//! derived registry collections), the read-time last-published enrichment,
//! and an in-memory storage client used by tests and demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod enrichment;
pub mod mediator;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use enrichment::enrich_entry;
pub use enrichment::enrich_page;
pub use mediator::IngestPhase;
pub use mediator::IngestReport;
pub use mediator::MediatorConfig;
pub use mediator::MediatorError;
pub use mediator::RegistryMediator;
pub use mediator::RegistryPage;
pub use store::InMemoryStorageClient;
