// crates/telemetry-datastore-core/src/core/time.rs
// ============================================================================
// Module: Telemetry Datastore Time Model
// Description: Canonical timestamp representation for messages and registries.
// Purpose: Provide deterministic time values across stored records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Timestamps are explicit unix-epoch-millisecond values supplied by
//! callers; the core never reads wall-clock time. Calendar conversion is
//! only needed by the partition naming scheme for ISO week bucketing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - Total ordering follows the underlying millisecond value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the ISO week date (year, week) for this timestamp.
    ///
    /// Returns `None` when the value is outside the representable calendar
    /// range.
    #[must_use]
    pub fn iso_week_date(self) -> Option<(i32, u8)> {
        let seconds = self.0.div_euclid(1_000);
        let datetime = OffsetDateTime::from_unix_timestamp(seconds).ok()?;
        let (year, week, _) = datetime.to_iso_week_date();
        Some((year, week))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self::from_millis(value)
    }
}
