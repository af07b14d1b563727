// crates/telemetry-datastore-core/src/core/identity.rs
// ============================================================================
// Module: Telemetry Datastore Identity Derivation
// Description: Deterministic content-hash identities for registry rows.
// Purpose: Guarantee at most one registry row per dimension under retries.
// Dependencies: sha2, base64, thiserror
// ============================================================================

//! ## Overview
//! Registry rows are keyed by a deterministic identity: the SHA-256 digest
//! of the fixed-order concatenation of the row's identifying components,
//! Base64-encoded. Identical ordered inputs always produce the identical
//! identity across processes and restarts, so retried or duplicated
//! message delivery re-refreshes a row instead of duplicating it.
//!
//! The component order of each convenience constructor is part of the
//! stored contract; reordering arguments is a breaking change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::identifiers::ChannelPath;
use crate::core::identifiers::ClientId;
use crate::core::identifiers::MetricName;
use crate::core::identifiers::ScopeId;
use crate::core::identifiers::StorableId;
use crate::core::message::MetricType;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while deriving a registry identity.
///
/// # Invariants
/// - Raised before any backend call is made.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A required identity component was empty.
    #[error("identity component at position {position} must not be empty")]
    EmptyComponent {
        /// Zero-based position of the offending component.
        position: usize,
    },
}

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Derives a deterministic identity from ordered components.
///
/// Components are concatenated in the given order (not sorted) and hashed
/// with SHA-256; the digest is Base64-encoded into a compact textual form.
///
/// # Errors
///
/// Returns [`IdentityError::EmptyComponent`] when any component is empty.
pub fn derive_id(components: &[&str]) -> Result<StorableId, IdentityError> {
    for (position, component) in components.iter().enumerate() {
        if component.is_empty() {
            return Err(IdentityError::EmptyComponent {
                position,
            });
        }
    }
    let mut hasher = Sha256::new();
    for component in components {
        hasher.update(component.as_bytes());
    }
    let digest = hasher.finalize();
    Ok(StorableId::new(STANDARD.encode(digest)))
}

/// Derives the client registry entry identity from (scope, client).
///
/// # Errors
///
/// Returns [`IdentityError::EmptyComponent`] when any component is empty.
pub fn client_entry_id(scope_id: &ScopeId, client_id: &ClientId) -> Result<StorableId, IdentityError> {
    derive_id(&[scope_id.as_str(), client_id.as_str()])
}

/// Derives the channel registry entry identity from (scope, client, channel).
///
/// # Errors
///
/// Returns [`IdentityError::EmptyComponent`] when any component is empty.
pub fn channel_entry_id(
    scope_id: &ScopeId,
    client_id: &ClientId,
    channel: &ChannelPath,
) -> Result<StorableId, IdentityError> {
    derive_id(&[scope_id.as_str(), client_id.as_str(), channel.as_str()])
}

/// Derives the metric registry entry identity from
/// (scope, client, channel, metric name, metric type).
///
/// # Errors
///
/// Returns [`IdentityError::EmptyComponent`] when any component is empty.
pub fn metric_entry_id(
    scope_id: &ScopeId,
    client_id: &ClientId,
    channel: &ChannelPath,
    name: &MetricName,
    metric_type: MetricType,
) -> Result<StorableId, IdentityError> {
    derive_id(&[
        scope_id.as_str(),
        client_id.as_str(),
        channel.as_str(),
        name.as_str(),
        metric_type.acronym(),
    ])
}
