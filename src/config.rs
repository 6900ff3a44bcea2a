//! Wire-facing configuration records consumed by sort and aggregate
//! operators. The core defines them precisely but does not execute them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode, Result};

/// Sort direction of one key. Nulls sort first under `Ascending` and last
/// under `Descending`, stable across keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl ColumnOrder {
    /// Returns where nulls sort under this order.
    #[must_use]
    pub fn nulls_first(self) -> bool {
        matches!(self, ColumnOrder::Ascending)
    }
}

/// One sort key: an attribute, a direction, and case sensitivity for string
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Name of the sorted attribute.
    pub attribute_name: String,
    /// Sort direction.
    pub column_order: ColumnOrder,
    /// Case sensitivity; meaningful for string keys only. Absent means
    /// case-sensitive.
    #[serde(default)]
    pub case_sensitive: Option<bool>,
}

impl SortKey {
    /// Creates an ascending key on `attribute_name`.
    #[must_use]
    pub fn ascending(attribute_name: impl Into<String>) -> Self {
        SortKey {
            attribute_name: attribute_name.into(),
            column_order: ColumnOrder::Ascending,
            case_sensitive: None,
        }
    }

    /// Creates a descending key on `attribute_name`.
    #[must_use]
    pub fn descending(attribute_name: impl Into<String>) -> Self {
        SortKey {
            attribute_name: attribute_name.into(),
            column_order: ColumnOrder::Descending,
            case_sensitive: None,
        }
    }

    /// Sets case sensitivity for a string key.
    #[must_use]
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    /// Returns the effective case sensitivity.
    #[must_use]
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive.unwrap_or(true)
    }
}

/// Ordered sort keys (most significant first) plus an optional row limit.
///
/// An empty key list is legal and yields the identity order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedSortSpecification {
    /// Sort keys, most significant first.
    #[serde(default)]
    pub keys: Vec<SortKey>,
    /// Maximum number of rows to produce, if any.
    #[serde(default)]
    pub limit: Option<u64>,
}

impl ExtendedSortSpecification {
    /// Creates an empty specification (identity order, no limit).
    #[must_use]
    pub fn new() -> Self {
        ExtendedSortSpecification::default()
    }

    /// Appends a sort key.
    #[must_use]
    pub fn with_key(mut self, key: SortKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the specification imposes no order.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serializes the specification to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            Error::new(
                ErrorCode::EvaluationError,
                format!("failed to serialize sort specification: {e}"),
            )
        })
    }

    /// Deserializes a specification from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            Error::new(
                ErrorCode::EvaluationError,
                format!("failed to deserialize sort specification: {e}"),
            )
        })
    }
}

/// How an aggregation should deduplicate its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    /// DISTINCT is a no-op.
    Skip,
    /// Exact set-based deduplication; approximation is forbidden.
    Exact,
    /// Exact by default, but the operator may switch to an approximate
    /// algorithm once the estimated distinct cardinality reaches the
    /// threshold.
    Adaptive {
        /// Estimated-cardinality switch point.
        threshold: i32,
    },
}

/// Distinctness flags used by aggregations.
///
/// `is_not_distinct` dominates; `is_exact_distinct` dominates over the
/// threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distinctness {
    /// Treat DISTINCT as a no-op.
    #[serde(default)]
    pub is_not_distinct: Option<bool>,
    /// Force exact set-dedup, disabling approximation.
    #[serde(default)]
    pub is_exact_distinct: Option<bool>,
    /// Switch point for approximate deduplication.
    #[serde(default)]
    pub estimated_distinct_threshold: Option<i32>,
}

impl Distinctness {
    /// Resolves the flags into the strategy an operator should use.
    #[must_use]
    pub fn strategy(&self) -> DedupStrategy {
        if self.is_not_distinct.unwrap_or(false) {
            return DedupStrategy::Skip;
        }
        if self.is_exact_distinct.unwrap_or(false) {
            return DedupStrategy::Exact;
        }
        match self.estimated_distinct_threshold {
            Some(threshold) => DedupStrategy::Adaptive { threshold },
            None => DedupStrategy::Exact,
        }
    }

    /// Serializes the flags to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            Error::new(
                ErrorCode::EvaluationError,
                format!("failed to serialize distinctness: {e}"),
            )
        })
    }

    /// Deserializes flags from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            Error::new(
                ErrorCode::EvaluationError,
                format!("failed to deserialize distinctness: {e}"),
            )
        })
    }
}
