use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzer::{BucketGranularity, TableFailure};
use crate::catalog::TableMeta;
use crate::query_log::RawQueryRow;

/// Request body for POST /analyze: one batch of query-history rows plus
/// best-effort table metadata, with per-run overrides of the configured
/// analysis defaults.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Scope key the resulting summaries are stored under (defaults to "default")
    pub scope: Option<String>,

    /// Raw query-history rows for the declared scope
    pub rows: Vec<RawQueryRow>,

    /// Table metadata used to validate extracted predicate columns
    #[serde(default)]
    pub tables: Vec<TableMeta>,

    /// Time-bucket granularity override (day/week/month)
    pub granularity: Option<BucketGranularity>,

    /// Minimum predicate hits before a column becomes a candidate
    pub min_hit_threshold: Option<u64>,

    /// Analysis window override: inclusive ISO dates
    pub window: Option<WindowParams>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowParams {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

/// Response body for POST /analyze.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub run_id: String,
    pub scope: String,
    pub table_count: usize,
    pub summaries: Vec<Value>,
    pub failures: Vec<TableFailure>,
    pub skipped_rows: u64,
    pub schema_mismatches: u64,
    pub cancelled: bool,
}

/// Generic JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub scope: Option<String>,
}
