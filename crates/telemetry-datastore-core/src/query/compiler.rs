// crates/telemetry-datastore-core/src/query/compiler.rs
// ============================================================================
// Module: Telemetry Datastore Query Compiler
// Description: Compiles portable queries into backend-native form.
// Purpose: Keep the backend dialect behind one exhaustive translation.
// Dependencies: serde_json, crate::{core, query}
// ============================================================================

//! ## Overview
//! Compilation is one exhaustive match over the closed predicate enum.
//! Every variant translates to its native clause; value-level failures
//! (empty field, non-scalar term value, unbounded range) surface as
//! [`MappingError`] naming the offending construct and are never silently
//! dropped. An empty conjunction compiles to match-everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::document::MappingError;
use crate::query::FetchStyle;
use crate::query::Predicate;
use crate::query::StorableQuery;

// ============================================================================
// SECTION: Backend Query
// ============================================================================

/// A compiled, backend-native query.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendQuery {
    /// Backend-native query body.
    pub query: Value,
    /// Backend-native sort clauses, highest priority first.
    pub sort: Vec<Value>,
    /// Fetch style the projections apply under.
    pub fetch_style: FetchStyle,
    /// Include projection.
    pub includes: Vec<String>,
    /// Exclude projection.
    pub excludes: Vec<String>,
    /// Number of leading matches to skip.
    pub from: u64,
    /// Maximum number of matches to return, when bounded.
    pub size: Option<u64>,
    /// Whether the backend should report the total match count.
    pub ask_total_count: bool,
}

impl BackendQuery {
    /// Assembles the full wire body under the native top-level keys.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("query".to_string(), self.query.clone());
        if !self.sort.is_empty() {
            body.insert("sort".to_string(), Value::Array(self.sort.clone()));
        }
        match self.fetch_style {
            FetchStyle::Source => {
                body.insert("_source".to_string(), Value::Bool(true));
            }
            FetchStyle::Fields => {
                body.insert("_source".to_string(), Value::Bool(false));
                body.insert("fields".to_string(), json!(self.includes));
            }
            FetchStyle::SourceSelect => {
                body.insert(
                    "_source".to_string(),
                    json!({ "include": self.includes, "exclude": self.excludes }),
                );
            }
        }
        body.insert("from".to_string(), Value::from(self.from));
        if let Some(size) = self.size {
            body.insert("size".to_string(), Value::from(size));
        }
        if self.ask_total_count {
            body.insert("track_total_hits".to_string(), Value::Bool(true));
        }
        Value::Object(body)
    }
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiles a portable query into its backend-native form.
///
/// # Errors
///
/// Returns a [`MappingError`] when a predicate carries a value that cannot
/// be expressed natively.
pub fn compile(query: &StorableQuery) -> Result<BackendQuery, MappingError> {
    Ok(BackendQuery {
        query: compile_predicate(&query.predicate)?,
        sort: query
            .sort
            .iter()
            .map(|spec| json!({ &spec.field: { "order": spec.direction.as_str() } }))
            .collect(),
        fetch_style: query.fetch_style,
        includes: query.includes.clone(),
        excludes: query.excludes.clone(),
        from: query.offset,
        size: query.limit,
        ask_total_count: query.ask_total_count,
    })
}

/// Compiles one predicate node; the single exhaustive translation point.
fn compile_predicate(predicate: &Predicate) -> Result<Value, MappingError> {
    match predicate {
        Predicate::Term {
            field,
            value,
        } => {
            check_field("term", field)?;
            check_scalar(field, value)?;
            Ok(json!({ "term": { field: value } }))
        }
        Predicate::Range {
            field,
            min,
            max,
        } => {
            check_field("range", field)?;
            if min.is_none() && max.is_none() {
                return Err(MappingError::UnsupportedValue {
                    detail: format!("range predicate on field '{field}' has no bounds"),
                });
            }
            let mut bounds = serde_json::Map::new();
            if let Some(low) = min {
                check_scalar(field, low)?;
                bounds.insert("gte".to_string(), low.clone());
            }
            if let Some(high) = max {
                check_scalar(field, high)?;
                bounds.insert("lte".to_string(), high.clone());
            }
            Ok(json!({ "range": { field: bounds } }))
        }
        Predicate::Exists {
            field,
        } => {
            check_field("exists", field)?;
            Ok(json!({ "exists": { "field": field } }))
        }
        Predicate::ChannelMatch {
            field,
            pattern,
        } => {
            check_field("channel match", field)?;
            match descendant_prefix(pattern) {
                Some(prefix) => Ok(json!({ "prefix": { field: prefix } })),
                None => Ok(json!({ "term": { field: pattern } })),
            }
        }
        Predicate::And {
            children,
        } => {
            if children.is_empty() {
                return Ok(json!({ "match_all": {} }));
            }
            let compiled: Result<Vec<Value>, MappingError> =
                children.iter().map(compile_predicate).collect();
            Ok(json!({ "bool": { "must": compiled? } }))
        }
    }
}

/// Returns the literal prefix when the pattern's last segment is the
/// descendant wildcard `#`, otherwise `None` for an exact match.
fn descendant_prefix(pattern: &str) -> Option<String> {
    pattern
        .strip_suffix('#')
        .map(|head| head.strip_suffix('/').unwrap_or(head).to_string())
}

/// Rejects empty field paths.
fn check_field(construct: &str, field: &str) -> Result<(), MappingError> {
    if field.is_empty() {
        return Err(MappingError::UnsupportedValue {
            detail: format!("{construct} predicate has an empty field path"),
        });
    }
    Ok(())
}

/// Rejects non-scalar predicate values.
fn check_scalar(field: &str, value: &Value) -> Result<(), MappingError> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(MappingError::UnsupportedValue {
            detail: format!("predicate value on field '{field}' is not a scalar"),
        }),
    }
}
