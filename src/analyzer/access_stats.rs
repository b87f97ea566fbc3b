use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query_log::{QueryRecord, TableReference};

/// Time resolution for access-count bucketing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    Day,
    #[default]
    Week,
    Month,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid bucket granularity `{0}` (expected day, week, or month)")]
pub struct InvalidGranularity(pub String);

impl FromStr for BucketGranularity {
    type Err = InvalidGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(BucketGranularity::Day),
            "week" | "weekly" => Ok(BucketGranularity::Week),
            "month" | "monthly" => Ok(BucketGranularity::Month),
            other => Err(InvalidGranularity(other.to_string())),
        }
    }
}

impl fmt::Display for BucketGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BucketGranularity::Day => "day",
            BucketGranularity::Week => "week",
            BucketGranularity::Month => "month",
        };
        write!(f, "{}", s)
    }
}

impl BucketGranularity {
    /// Canonical, sortable bucket key for a timestamp. Week keys use the ISO
    /// week-numbering year so aggregation is deterministic across platforms.
    pub fn bucket_key(&self, ts: &DateTime<Utc>) -> String {
        match self {
            BucketGranularity::Day => ts.format("%Y-%m-%d").to_string(),
            BucketGranularity::Week => {
                let week = ts.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            BucketGranularity::Month => ts.format("%Y-%m").to_string(),
        }
    }

    /// Serialized field name for the bucket-count map in a pattern summary.
    pub fn counts_field(&self) -> &'static str {
        match self {
            BucketGranularity::Day => "daily_counts",
            BucketGranularity::Week => "weekly_counts",
            BucketGranularity::Month => "monthly_counts",
        }
    }
}

/// Per-table access counters for one analysis run.
///
/// Bucket counts are keyed, not positional, so folding is deterministic
/// under any permutation of the input records. `merge` sums corresponding
/// counters and is commutative and associative, which makes per-shard
/// partials safe to combine in any order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableAccessStats {
    pub table_reference: TableReference,
    pub total_queries: u64,
    pub select_star_queries: u64,
    pub bucket_counts: BTreeMap<String, u64>,
}

impl TableAccessStats {
    pub fn new(table_reference: TableReference) -> Self {
        TableAccessStats {
            table_reference,
            total_queries: 0,
            select_star_queries: 0,
            bucket_counts: BTreeMap::new(),
        }
    }

    /// Fold one record into the counters.
    pub fn record(&mut self, record: &QueryRecord, granularity: BucketGranularity) {
        self.total_queries += 1;
        if record.is_select_star {
            self.select_star_queries += 1;
        }
        let key = granularity.bucket_key(&record.timestamp);
        *self.bucket_counts.entry(key).or_insert(0) += 1;
    }

    /// Combine a partial computed over another shard of the same run.
    pub fn merge(&mut self, other: TableAccessStats) {
        self.total_queries += other.total_queries;
        self.select_star_queries += other.select_star_queries;
        for (key, count) in other.bucket_counts {
            *self.bucket_counts.entry(key).or_insert(0) += count;
        }
    }
}

/// Streaming fold over a record batch: one [`TableAccessStats`] per distinct
/// table. Queries referencing multiple tables (joins) attribute access to
/// every referenced table.
pub fn fold_access_stats(
    records: &[QueryRecord],
    granularity: BucketGranularity,
) -> BTreeMap<TableReference, TableAccessStats> {
    let mut stats: BTreeMap<TableReference, TableAccessStats> = BTreeMap::new();
    for record in records {
        for table in &record.table_references {
            stats
                .entry(table.clone())
                .or_insert_with(|| TableAccessStats::new(table.clone()))
                .record(record, granularity);
        }
    }
    stats
}
