//! WHERE-clause predicate extraction.
//!
//! The extractor is deliberately lexical: it scans raw SQL text for
//! column/operator pairs instead of building a full AST, trading precision
//! for cross-dialect coverage. The [`PredicateExtractionStrategy`] trait is
//! the seam where a grammar-based parser could be substituted later without
//! touching the aggregation or ranking contracts.

mod lexical;

pub use lexical::LexicalExtractor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query_log::{QueryRecord, TableReference};

/// Classification of the predicate shape a column was filtered with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    Equality,
    Range,
    In,
    Like,
    Unknown,
}

impl OperatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Equality => "equality",
            OperatorKind::Range => "range",
            OperatorKind::In => "in",
            OperatorKind::Like => "like",
            OperatorKind::Unknown => "unknown",
        }
    }
}

/// One recognized column/operator occurrence within a query's WHERE clause.
/// Ephemeral: exists only within a single analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateHit {
    pub table_reference: TableReference,
    pub column_name: String,
    pub operator_kind: OperatorKind,
    pub query_timestamp: DateTime<Utc>,
}

/// Strategy interface for predicate extraction.
pub trait PredicateExtractionStrategy: Send + Sync {
    /// Extract zero or more hits from one normalized record. Must never
    /// fail: unrecognizable text yields no hits.
    fn extract(&self, record: &QueryRecord) -> Vec<PredicateHit>;
}
