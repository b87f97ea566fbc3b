//! Analysis error types.
//!
//! Per-record and per-hit errors are recoverable and surface as counts in
//! the run report. Per-table failures abort that one table's summary, never
//! the whole run.

use thiserror::Error;

use crate::query_log::NormalizeError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed query record: {0}")]
    MalformedRecord(#[from] NormalizeError),

    #[error("column `{column}` not present in catalog for table `{table}`")]
    SchemaMismatch { table: String, column: String },

    #[error("incomplete access stats for table `{table}`: no underlying queries")]
    IncompleteData { table: String },

    #[error("analysis failed for scope `{scope}`: {source}")]
    Analysis {
        scope: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AnalysisError {
    /// Wrap an arbitrary failure with the run's scope attached for diagnosis.
    pub fn with_scope(
        scope: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AnalysisError::Analysis {
            scope: scope.into(),
            source: Box::new(source),
        }
    }
}
