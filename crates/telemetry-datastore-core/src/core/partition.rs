// crates/telemetry-datastore-core/src/core/partition.rs
// ============================================================================
// Module: Telemetry Datastore Partition Naming
// Description: Physical partition names for messages and registries.
// Purpose: Compute normalized, time-bucketed partition names per scope.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Messages land in weekly buckets named `<scope>-<iso-year>-<iso-week>`;
//! registries share one stable partition per scope named `.<scope>`. The
//! `.` prefix keeps registry partitions disjoint from any message bucket.
//! Weekly buckets bound the working set of hot partitions and make
//! retention a matter of dropping whole old buckets; registries are
//! low-cardinality and long-lived, so they stay unbucketed.
//!
//! Scope identifiers are normalized before use: lowercased, with illegal
//! characters replaced by `_`. Normalization is idempotent, and a name
//! that still violates the rules afterwards is a construction error, never
//! a silent truncation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ScopeId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters that may not appear in a partition name.
pub const ILLEGAL_CHARS: &str = "\"\\/*?<>|,. ";
/// Substitute written in place of an illegal character.
const SUBSTITUTE_CHAR: char = '_';
/// Reserved prefix character; normalized names must not start with it.
const RESERVED_PREFIX: char = '_';
/// Prefix of the stable per-scope registry partition.
const REGISTRY_PREFIX: char = '.';
/// Suffix of the wildcard matching every message bucket of a scope.
const WILDCARD_SUFFIX: &str = "-*";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing a partition name.
///
/// # Invariants
/// - Raised before any backend call is made.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// The input name was empty.
    #[error("partition name must not be empty")]
    Empty,
    /// The normalized name starts with the reserved prefix character.
    #[error("partition name '{name}' must not start with '{RESERVED_PREFIX}'")]
    ReservedPrefix {
        /// Offending normalized name.
        name: String,
    },
    /// The normalized name still contains an uppercase character.
    #[error("partition name '{name}' must not contain uppercase characters")]
    UppercaseCharacter {
        /// Offending normalized name.
        name: String,
    },
    /// The normalized name still contains an illegal character.
    #[error("partition name '{name}' must not contain any of {ILLEGAL_CHARS:?}")]
    IllegalCharacter {
        /// Offending normalized name.
        name: String,
    },
    /// The timestamp is outside the representable calendar range.
    #[error("timestamp {millis} ms cannot be mapped to an ISO week")]
    InvalidTimestamp {
        /// Offending unix millisecond value.
        millis: i64,
    },
}

// ============================================================================
// SECTION: Partition Name
// ============================================================================

/// A validated physical partition name.
///
/// # Invariants
/// - Only constructed through the naming functions in this module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionName(String);

impl PartitionName {
    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when this name is a wildcard over message buckets.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.ends_with(WILDCARD_SUFFIX)
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes a raw name into partition-safe form.
///
/// Lowercases the input and replaces illegal characters and whitespace with
/// `_`. Re-normalizing an already-normalized name is a no-op.
///
/// # Errors
///
/// Returns a [`PartitionError`] when the input is empty or the normalized
/// form still violates the naming rules (reserved prefix).
pub fn normalize(raw: &str) -> Result<String, PartitionError> {
    if raw.is_empty() {
        return Err(PartitionError::Empty);
    }
    let normalized: String = raw
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ILLEGAL_CHARS.contains(ch) || ch.is_whitespace() {
                SUBSTITUTE_CHAR
            } else {
                ch
            }
        })
        .collect();
    check_name(&normalized)?;
    Ok(normalized)
}

/// Checks a name against the partition naming rules without altering it.
///
/// # Errors
///
/// Returns a [`PartitionError`] naming the violated rule.
pub fn check_name(name: &str) -> Result<(), PartitionError> {
    if name.is_empty() {
        return Err(PartitionError::Empty);
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(PartitionError::ReservedPrefix {
            name: name.to_string(),
        });
    }
    if name.chars().any(char::is_uppercase) {
        return Err(PartitionError::UppercaseCharacter {
            name: name.to_string(),
        });
    }
    if name.chars().any(|ch| ILLEGAL_CHARS.contains(ch) || ch.is_whitespace()) {
        return Err(PartitionError::IllegalCharacter {
            name: name.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Naming Scheme
// ============================================================================

/// Returns the weekly message partition for a scope and timestamp.
///
/// Two timestamps in the same ISO week map to the identical name, e.g.
/// scope `42` in ISO week 2024-W05 maps to `42-2024-05`.
///
/// # Errors
///
/// Returns a [`PartitionError`] when the scope cannot be normalized or the
/// timestamp has no calendar representation.
pub fn message_partition(
    scope_id: &ScopeId,
    timestamp: Timestamp,
) -> Result<PartitionName, PartitionError> {
    let scope = normalize(scope_id.as_str())?;
    let (year, week) = timestamp.iso_week_date().ok_or(PartitionError::InvalidTimestamp {
        millis: timestamp.as_millis(),
    })?;
    Ok(PartitionName(format!("{scope}-{year:04}-{week:02}")))
}

/// Returns the wildcard matching every message bucket of a scope.
///
/// # Errors
///
/// Returns a [`PartitionError`] when the scope cannot be normalized.
pub fn message_partition_wildcard(scope_id: &ScopeId) -> Result<PartitionName, PartitionError> {
    let scope = normalize(scope_id.as_str())?;
    Ok(PartitionName(format!("{scope}{WILDCARD_SUFFIX}")))
}

/// Returns the stable registry partition for a scope.
///
/// # Errors
///
/// Returns a [`PartitionError`] when the scope cannot be normalized.
pub fn registry_partition(scope_id: &ScopeId) -> Result<PartitionName, PartitionError> {
    let scope = normalize(scope_id.as_str())?;
    Ok(PartitionName(format!("{REGISTRY_PREFIX}{scope}")))
}
