//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use registry_query::error::QueryErrorKind;
use registry_query::schema::{EntitySchema, LabelLink};
use registry_query::QueryResult;

/// Installs a test subscriber once; controlled by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Schemas
// ============================================================================

/// Brokers: renamed URL column, labels in `broker_labels`.
pub fn broker_schema() -> EntitySchema {
    EntitySchema::with_fields(["id", "name", "description", "created_at"])
        .with_column("url", "broker_url")
        .with_label_link(LabelLink::new("broker_labels", "broker_id"))
}

/// Visibilities: nullable platform reference, labels in `visibility_labels`.
pub fn visibility_schema() -> EntitySchema {
    EntitySchema::with_fields(["id", "platform_id", "service_plan_id"])
        .with_label_link(LabelLink::new("visibility_labels", "visibility_id"))
}

/// Platforms: no label table.
pub fn platform_schema() -> EntitySchema {
    EntitySchema::with_fields(["id", "name", "type"])
}

// ============================================================================
// Claims
// ============================================================================

/// Converts a `json!` object into a claim map.
pub fn claims(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected claims object, got {}", other),
    }
}

// ============================================================================
// Assertions
// ============================================================================

/// Asserts that `result` failed with the expected error kind.
pub fn assert_error_kind<T: std::fmt::Debug>(result: QueryResult<T>, expected: QueryErrorKind) {
    match result {
        Ok(value) => panic!("Expected {} error, got {:?}", expected, value),
        Err(e) => assert_eq!(
            e.kind(),
            expected,
            "Error kind mismatch: expected {}, got {} ({})",
            expected,
            e.kind(),
            e
        ),
    }
}
