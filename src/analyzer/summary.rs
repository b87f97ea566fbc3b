use chrono::{Days, NaiveDate};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::access_stats::{BucketGranularity, TableAccessStats};
use super::errors::AnalysisError;
use super::ranker::ColumnCandidate;

/// Inclusive date range over which query history is considered for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        AnalysisWindow { start, end }
    }

    /// Default window: the 30 days ending at `today`.
    pub fn last_30_days(today: NaiveDate) -> Self {
        AnalysisWindow {
            start: today.checked_sub_days(Days::new(30)).unwrap_or(today),
            end: today,
        }
    }

    pub fn days_back(today: NaiveDate, days: u64) -> Self {
        AnalysisWindow {
            start: today.checked_sub_days(Days::new(days)).unwrap_or(today),
            end: today,
        }
    }
}

/// The engine's terminal artifact: one table's access stats and ranked
/// partition/cluster candidates. Immutable; owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternSummary {
    pub stats: TableAccessStats,
    pub candidates: Vec<ColumnCandidate>,
    pub window: AnalysisWindow,
    pub granularity: BucketGranularity,
}

impl PatternSummary {
    /// Compose a summary from its parts. The aggregator never produces
    /// stats with zero queries, but downstream consumers assume
    /// `total_queries >= 1`, so the invariant is guarded here.
    pub fn build(
        stats: TableAccessStats,
        candidates: Vec<ColumnCandidate>,
        window: AnalysisWindow,
        granularity: BucketGranularity,
    ) -> Result<Self, AnalysisError> {
        if stats.total_queries == 0 {
            return Err(AnalysisError::IncompleteData {
                table: stats.table_reference.to_string(),
            });
        }
        Ok(PatternSummary {
            stats,
            candidates,
            window,
            granularity,
        })
    }

    pub fn table_name(&self) -> String {
        self.stats.table_reference.to_string()
    }
}

// Serialized form for storage and the HTTP layer. The bucket-count field is
// named after the configured granularity (`weekly_counts` etc.); everything
// is emitted in a fixed order so identical input serializes byte-identically.
impl Serialize for PatternSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PatternSummary", 6)?;
        state.serialize_field("table", &self.table_name())?;
        state.serialize_field("total_queries", &self.stats.total_queries)?;
        state.serialize_field("select_star_queries", &self.stats.select_star_queries)?;
        state.serialize_field(self.granularity.counts_field(), &self.stats.bucket_counts)?;
        state.serialize_field("partition_candidates", &self.candidates)?;
        state.serialize_field("window", &self.window)?;
        state.end()
    }
}
