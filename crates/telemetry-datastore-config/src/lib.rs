// crates/telemetry-datastore-config/src/lib.rs
// ============================================================================
// Module: Telemetry Datastore Config Library
// Description: Canonical configuration model and validation.
// Purpose: Single source of truth for telemetry-datastore.toml semantics.
// Dependencies: telemetry-datastore-core, serde, toml
// ============================================================================

//! ## Overview
//! `telemetry-datastore-config` defines the canonical configuration model
//! for the datastore runtime: storage backend selection over a closed set,
//! query and scroll timeouts, scroll paging, and the enrichment worker
//! pool. Validation is strict and fail-closed: any violation is a
//! construction error, and nothing falls back to a default silently.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
