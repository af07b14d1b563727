// crates/telemetry-datastore-core/tests/identity.rs
// ============================================================================
// Module: Identity Derivation Tests
// Description: Ensures registry identities are deterministic and validated.
// ============================================================================
//! ## Overview
//! Validates that identity derivation is a pure function of its ordered
//! components and rejects empty components before any storage call.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use telemetry_datastore_core::ChannelPath;
use telemetry_datastore_core::ClientId;
use telemetry_datastore_core::IdentityError;
use telemetry_datastore_core::MetricName;
use telemetry_datastore_core::MetricType;
use telemetry_datastore_core::ScopeId;
use telemetry_datastore_core::channel_entry_id;
use telemetry_datastore_core::client_entry_id;
use telemetry_datastore_core::derive_id;
use telemetry_datastore_core::metric_entry_id;

#[test]
fn identical_components_derive_identical_ids() {
    let first = derive_id(&["scope-1", "device-7", "sensors/temp"]).unwrap();
    let second = derive_id(&["scope-1", "device-7", "sensors/temp"]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn component_order_changes_the_id() {
    let forward = derive_id(&["alpha", "beta"]).unwrap();
    let reversed = derive_id(&["beta", "alpha"]).unwrap();
    assert_ne!(forward, reversed);
}

#[test]
fn derived_id_is_base64_of_a_sha256_digest() {
    let id = derive_id(&["scope-1", "device-7"]).unwrap();
    let decoded = STANDARD.decode(id.as_str()).unwrap();
    assert_eq!(decoded.len(), 32);
}

#[test]
fn empty_component_is_rejected_with_its_position() {
    let result = derive_id(&["scope-1", "", "channel"]);
    assert!(matches!(
        result,
        Err(IdentityError::EmptyComponent {
            position: 1
        })
    ));
}

#[test]
fn client_entry_id_matches_manual_derivation() {
    let scope = ScopeId::new("scope-1");
    let client = ClientId::new("device-7");
    let id = client_entry_id(&scope, &client).unwrap();
    assert_eq!(id, derive_id(&["scope-1", "device-7"]).unwrap());
}

#[test]
fn channel_entry_id_includes_the_channel() {
    let scope = ScopeId::new("scope-1");
    let client = ClientId::new("device-7");
    let channel = ChannelPath::new("sensors/temp");
    let id = channel_entry_id(&scope, &client, &channel).unwrap();
    assert_eq!(id, derive_id(&["scope-1", "device-7", "sensors/temp"]).unwrap());
    assert_ne!(id, client_entry_id(&scope, &client).unwrap());
}

#[test]
fn metric_entry_id_uses_the_type_acronym() {
    let scope = ScopeId::new("scope-1");
    let client = ClientId::new("device-7");
    let channel = ChannelPath::new("sensors/temp");
    let name = MetricName::new("temperature");
    let id = metric_entry_id(&scope, &client, &channel, &name, MetricType::Double).unwrap();
    assert_eq!(
        id,
        derive_id(&["scope-1", "device-7", "sensors/temp", "temperature", "dbl"]).unwrap()
    );
}

#[test]
fn same_metric_name_with_different_types_derives_distinct_rows() {
    let scope = ScopeId::new("scope-1");
    let client = ClientId::new("device-7");
    let channel = ChannelPath::new("sensors/temp");
    let name = MetricName::new("reading");
    let as_double =
        metric_entry_id(&scope, &client, &channel, &name, MetricType::Double).unwrap();
    let as_long = metric_entry_id(&scope, &client, &channel, &name, MetricType::Long).unwrap();
    assert_ne!(as_double, as_long);
}
