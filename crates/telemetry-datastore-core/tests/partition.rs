// crates/telemetry-datastore-core/tests/partition.rs
// ============================================================================
// Module: Partition Naming Tests
// Description: Ensures partition names are normalized and time-bucketed.
// ============================================================================
//! ## Overview
//! Validates normalization rules, weekly message bucketing, the registry
//! prefix, and the wildcard over a scope's message buckets.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use telemetry_datastore_core::PartitionError;
use telemetry_datastore_core::ScopeId;
use telemetry_datastore_core::Timestamp;
use telemetry_datastore_core::message_partition;
use telemetry_datastore_core::message_partition_wildcard;
use telemetry_datastore_core::normalize;
use telemetry_datastore_core::registry_partition;

/// 2024-01-29T00:00:00Z, a Monday in ISO week 2024-W05.
const WEEK_05_MONDAY_MS: i64 = 1_706_486_400_000;
/// 2024-02-02T12:00:00Z, a Friday in the same ISO week.
const WEEK_05_FRIDAY_MS: i64 = 1_706_875_200_000;

#[test]
fn normalize_lowercases_and_substitutes_illegal_characters() {
    let normalized = normalize("Acme Corp/Fleet*1").unwrap();
    assert_eq!(normalized, "acme_corp_fleet_1");
}

#[test]
fn normalize_is_idempotent() {
    let once = normalize("Acme Corp/Fleet*1").unwrap();
    let twice = normalize(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn normalize_rejects_empty_input() {
    assert!(matches!(normalize(""), Err(PartitionError::Empty)));
}

#[test]
fn normalize_rejects_reserved_prefix() {
    let result = normalize("_internal");
    assert!(matches!(result, Err(PartitionError::ReservedPrefix { .. })));
}

#[test]
fn normalize_rejects_name_that_substitutes_into_reserved_prefix() {
    // A leading space becomes a leading underscore after substitution.
    let result = normalize(" scope");
    assert!(matches!(result, Err(PartitionError::ReservedPrefix { .. })));
}

#[test]
fn timestamps_in_the_same_iso_week_share_a_bucket() {
    let scope = ScopeId::new("42");
    let monday = message_partition(&scope, Timestamp::from_millis(WEEK_05_MONDAY_MS)).unwrap();
    let friday = message_partition(&scope, Timestamp::from_millis(WEEK_05_FRIDAY_MS)).unwrap();
    assert_eq!(monday, friday);
    assert_eq!(monday.as_str(), "42-2024-05");
}

#[test]
fn adjacent_weeks_get_distinct_buckets() {
    let scope = ScopeId::new("42");
    let week_05 = message_partition(&scope, Timestamp::from_millis(WEEK_05_MONDAY_MS)).unwrap();
    let one_week_later = Timestamp::from_millis(WEEK_05_MONDAY_MS + 7 * 86_400_000);
    let week_06 = message_partition(&scope, one_week_later).unwrap();
    assert_ne!(week_05, week_06);
    assert_eq!(week_06.as_str(), "42-2024-06");
}

#[test]
fn message_partition_normalizes_the_scope() {
    let scope = ScopeId::new("Acme Corp");
    let name = message_partition(&scope, Timestamp::from_millis(WEEK_05_MONDAY_MS)).unwrap();
    assert_eq!(name.as_str(), "acme_corp-2024-05");
}

#[test]
fn wildcard_covers_every_bucket_of_the_scope() {
    let scope = ScopeId::new("42");
    let wildcard = message_partition_wildcard(&scope).unwrap();
    assert_eq!(wildcard.as_str(), "42-*");
    assert!(wildcard.is_wildcard());
}

#[test]
fn registry_partition_is_prefixed_and_stable() {
    let scope = ScopeId::new("42");
    let registry = registry_partition(&scope).unwrap();
    assert_eq!(registry.as_str(), ".42");
    assert!(!registry.is_wildcard());
}

#[test]
fn registry_partition_is_disjoint_from_message_buckets() {
    let scope = ScopeId::new("42");
    let registry = registry_partition(&scope).unwrap();
    let bucket = message_partition(&scope, Timestamp::from_millis(WEEK_05_MONDAY_MS)).unwrap();
    assert_ne!(registry, bucket);
    assert!(registry.as_str().starts_with('.'));
    assert!(!bucket.as_str().starts_with('.'));
}

#[test]
fn out_of_range_timestamp_is_a_construction_error() {
    let scope = ScopeId::new("42");
    let result = message_partition(&scope, Timestamp::from_millis(i64::MIN));
    assert!(matches!(result, Err(PartitionError::InvalidTimestamp { .. })));
}
