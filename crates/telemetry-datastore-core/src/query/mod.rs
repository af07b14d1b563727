// crates/telemetry-datastore-core/src/query/mod.rs
// ============================================================================
// Module: Telemetry Datastore Query Model
// Description: Portable predicate tree, sort specs, and fetch styles.
// Purpose: Let callers express storage queries without naming a backend.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A query is a closed predicate tree plus ordered sort specs, a fetch
//! style with field projections, offset, limit, and a total-count flag.
//! The tree is a tagged enum, not an open trait hierarchy: every variant
//! the compiler must handle is visible in one place, and adding a variant
//! breaks compilation everywhere it matters instead of failing at runtime.
//!
//! Invalid ranges are rejected at construction, before any backend call.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod compiler;

pub use compiler::BackendQuery;
pub use compiler::compile;

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing a query.
///
/// # Invariants
/// - Raised at construction time; an invalid query never reaches a backend.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Both range bounds were present and the minimum exceeded the maximum,
    /// or the bounds were not mutually comparable.
    #[error("invalid range on field '{field}': {detail}")]
    InvalidRange {
        /// Field the range addressed.
        field: String,
        /// Description of the violation.
        detail: String,
    },
}

// ============================================================================
// SECTION: Predicate Tree
// ============================================================================

/// A node in the portable predicate tree.
///
/// # Invariants
/// - The variant set is closed; compilation handles every variant in one
///   exhaustive match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "predicate", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches documents whose field equals the value exactly.
    Term {
        /// Document field path.
        field: String,
        /// Scalar value to match.
        value: Value,
    },
    /// Matches documents whose field lies within the inclusive bounds.
    Range {
        /// Document field path.
        field: String,
        /// Inclusive lower bound, when present.
        min: Option<Value>,
        /// Inclusive upper bound, when present.
        max: Option<Value>,
    },
    /// Matches documents that carry the field at all.
    Exists {
        /// Document field path.
        field: String,
    },
    /// Matches channel values against a pattern; a trailing `#` segment
    /// matches the prefix before it and every descendant.
    ChannelMatch {
        /// Document field path.
        field: String,
        /// Channel pattern.
        pattern: String,
    },
    /// Matches documents satisfying every child; an empty child list
    /// matches everything.
    And {
        /// Child predicates, all of which must hold.
        children: Vec<Predicate>,
    },
}

impl Predicate {
    /// Builds a term predicate.
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Builds a range predicate with inclusive bounds.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidRange`] when both bounds are present and
    /// the minimum exceeds the maximum, or when the bounds are not mutually
    /// comparable (both numeric or both strings).
    pub fn range(
        field: impl Into<String>,
        min: Option<Value>,
        max: Option<Value>,
    ) -> Result<Self, QueryError> {
        let field = field.into();
        if let (Some(low), Some(high)) = (&min, &max) {
            check_bounds(&field, low, high)?;
        }
        Ok(Self::Range {
            field,
            min,
            max,
        })
    }

    /// Builds an exists predicate.
    #[must_use]
    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    /// Builds a channel-match predicate.
    #[must_use]
    pub fn channel_match(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::ChannelMatch {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Builds a conjunction of child predicates.
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::And {
            children,
        }
    }
}

/// Validates that two range bounds are comparable and ordered.
///
/// Integer bounds are compared exactly; values past 2^53 would otherwise
/// collide when widened to `f64`.
fn check_bounds(field: &str, low: &Value, high: &Value) -> Result<(), QueryError> {
    if let (Some(low_int), Some(high_int)) = (low.as_i64(), high.as_i64()) {
        if low_int > high_int {
            return Err(QueryError::InvalidRange {
                field: field.to_string(),
                detail: format!("minimum {low_int} exceeds maximum {high_int}"),
            });
        }
        return Ok(());
    }
    match (low.as_f64(), high.as_f64(), low.as_str(), high.as_str()) {
        (Some(low_num), Some(high_num), _, _) => {
            if low_num > high_num {
                return Err(QueryError::InvalidRange {
                    field: field.to_string(),
                    detail: format!("minimum {low_num} exceeds maximum {high_num}"),
                });
            }
            Ok(())
        }
        (_, _, Some(low_text), Some(high_text)) => {
            if low_text > high_text {
                return Err(QueryError::InvalidRange {
                    field: field.to_string(),
                    detail: format!("minimum '{low_text}' exceeds maximum '{high_text}'"),
                });
            }
            Ok(())
        }
        _ => Err(QueryError::InvalidRange {
            field: field.to_string(),
            detail: "bounds are not mutually comparable".to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Sort Specs
// ============================================================================

/// Direction of a sort spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

impl SortDirection {
    /// Returns the wire keyword for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// One ordered sort spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    /// Document field path to sort on.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortField {
    /// Builds an ascending sort spec.
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Builds a descending sort spec.
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

// ============================================================================
// SECTION: Fetch Styles
// ============================================================================

/// How much of each matching document a query fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStyle {
    /// The full source document.
    Source,
    /// Only the fields named in the include projection.
    Fields,
    /// The source document filtered by the include/exclude projections.
    SourceSelect,
}

// ============================================================================
// SECTION: Storable Query
// ============================================================================

/// A complete portable query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorableQuery {
    /// Root of the predicate tree.
    pub predicate: Predicate,
    /// Ordered sort specs; residual ties are backend order.
    pub sort: Vec<SortField>,
    /// Fetch style for matching documents.
    pub fetch_style: FetchStyle,
    /// Fields included by `Fields` and `SourceSelect` styles.
    pub includes: Vec<String>,
    /// Fields excluded by the `SourceSelect` style.
    pub excludes: Vec<String>,
    /// Number of leading matches to skip.
    pub offset: u64,
    /// Maximum number of matches to return, when bounded.
    pub limit: Option<u64>,
    /// Whether the backend should report the total match count.
    pub ask_total_count: bool,
}

impl StorableQuery {
    /// Builds a full-source query over the given predicate.
    #[must_use]
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            sort: Vec::new(),
            fetch_style: FetchStyle::Source,
            includes: Vec::new(),
            excludes: Vec::new(),
            offset: 0,
            limit: None,
            ask_total_count: false,
        }
    }

    /// Appends a sort spec, keeping earlier specs higher priority.
    #[must_use]
    pub fn sorted_by(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// Sets the fetch style.
    #[must_use]
    pub fn with_fetch_style(mut self, fetch_style: FetchStyle) -> Self {
        self.fetch_style = fetch_style;
        self
    }

    /// Sets the include projection.
    #[must_use]
    pub fn with_includes(mut self, includes: Vec<String>) -> Self {
        self.includes = includes;
        self
    }

    /// Sets the exclude projection.
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Sets the number of leading matches to skip.
    #[must_use]
    pub const fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Bounds the number of matches returned.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Requests the total match count alongside the page.
    #[must_use]
    pub const fn with_total_count(mut self) -> Self {
        self.ask_total_count = true;
        self
    }
}
