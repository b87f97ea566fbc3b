//! Analysis orchestration.
//!
//! One analysis run is a single logical pass over an already-materialized
//! batch of query-history rows: normalize, fold access stats, extract and
//! rank predicates, compose summaries. Failures are isolated per table; the
//! run reports which tables succeeded and which failed rather than failing
//! atomically.

mod access_stats;
mod errors;
mod ranker;
mod summary;

pub use access_stats::{fold_access_stats, BucketGranularity, InvalidGranularity, TableAccessStats};
pub use errors::AnalysisError;
pub use ranker::{rank_candidates, ColumnCandidate, RankOutcome};
pub use summary::{AnalysisWindow, PatternSummary};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use uuid::Uuid;

use crate::catalog::ColumnCatalog;
use crate::predicate::{LexicalExtractor, PredicateExtractionStrategy, PredicateHit};
use crate::query_log::{normalize_row, QueryRecord, RawQueryRow, TableReference};

/// Tunables for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub granularity: BucketGranularity,
    pub min_hit_threshold: u64,
    pub window: AnalysisWindow,
}

impl AnalysisOptions {
    pub fn new(window: AnalysisWindow) -> Self {
        AnalysisOptions {
            granularity: BucketGranularity::default(),
            min_hit_threshold: 2,
            window,
        }
    }
}

/// One table whose summary could not be built.
#[derive(Debug, Clone, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

/// Outcome of one analysis run. Summaries for completed tables remain valid
/// even when other tables failed or the run was cancelled partway.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub summaries: Vec<PatternSummary>,
    pub failures: Vec<TableFailure>,
    pub skipped_rows: u64,
    pub schema_mismatches: u64,
    pub cancelled: bool,
}

/// The pattern-extraction engine. Owns the predicate extraction strategy
/// and per-run tunables; holds no mutable state, so one analyzer can serve
/// concurrent runs.
pub struct PatternAnalyzer {
    strategy: Box<dyn PredicateExtractionStrategy>,
    options: AnalysisOptions,
}

impl PatternAnalyzer {
    pub fn new(options: AnalysisOptions) -> Self {
        PatternAnalyzer {
            strategy: Box::new(LexicalExtractor),
            options,
        }
    }

    pub fn with_strategy(
        strategy: Box<dyn PredicateExtractionStrategy>,
        options: AnalysisOptions,
    ) -> Self {
        PatternAnalyzer { strategy, options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Analyze a batch of raw rows into one summary per referenced table.
    /// Total over well-formed input: malformed rows are skipped and counted,
    /// never fatal to the batch.
    pub fn analyze(&self, rows: &[RawQueryRow], catalog: &ColumnCatalog) -> RunReport {
        let never = AtomicBool::new(false);
        self.analyze_with_cancellation(rows, catalog, &never)
    }

    /// As [`analyze`](Self::analyze), checking the cancellation flag between
    /// per-table units of work. Summaries completed before cancellation are
    /// kept in the report.
    pub fn analyze_with_cancellation(
        &self,
        rows: &[RawQueryRow],
        catalog: &ColumnCatalog,
        cancel: &AtomicBool,
    ) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let (records, skipped_rows) = self.normalize_batch(rows, &run_id);

        let stats = fold_access_stats(&records, self.options.granularity);
        let hits = self.extract_hits(&records);

        let mut report = RunReport {
            run_id,
            summaries: Vec::new(),
            failures: Vec::new(),
            skipped_rows,
            schema_mismatches: 0,
            cancelled: false,
        };

        let empty_hits: Vec<PredicateHit> = Vec::new();
        for (table, table_stats) in stats {
            if cancel.load(Ordering::Relaxed) {
                log::warn!(
                    "analysis run {} cancelled after {} tables",
                    report.run_id,
                    report.summaries.len()
                );
                report.cancelled = true;
                break;
            }

            let table_hits = hits.get(&table).unwrap_or(&empty_hits);
            let outcome = rank_candidates(
                &table,
                table_hits,
                catalog,
                self.options.min_hit_threshold,
            );
            report.schema_mismatches += outcome.schema_mismatches;

            match PatternSummary::build(
                table_stats,
                outcome.candidates,
                self.options.window,
                self.options.granularity,
            ) {
                Ok(summary) => report.summaries.push(summary),
                Err(e) => {
                    log::error!("summary for table {} failed: {}", table, e);
                    report.failures.push(TableFailure {
                        table: table.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "analysis run {}: {} summaries, {} failures, {} skipped rows, {} schema mismatches",
            report.run_id,
            report.summaries.len(),
            report.failures.len(),
            report.skipped_rows,
            report.schema_mismatches
        );
        report
    }

    /// Analyze only the rows referencing one table; narrower entry point for
    /// incremental/on-demand use.
    pub fn analyze_table(
        &self,
        table: &TableReference,
        rows: &[RawQueryRow],
        catalog: &ColumnCatalog,
    ) -> Result<PatternSummary, AnalysisError> {
        let run_id = format!("table:{}", table);
        let (records, _skipped) = self.normalize_batch(rows, &run_id);

        let relevant: Vec<QueryRecord> = records
            .into_iter()
            .filter(|r| r.table_references.contains(table))
            .collect();

        let mut stats = fold_access_stats(&relevant, self.options.granularity);
        let table_stats = stats
            .remove(table)
            .ok_or_else(|| AnalysisError::IncompleteData {
                table: table.to_string(),
            })?;

        let hits = self.extract_hits(&relevant);
        let empty_hits: Vec<PredicateHit> = Vec::new();
        let outcome = rank_candidates(
            table,
            hits.get(table).unwrap_or(&empty_hits),
            catalog,
            self.options.min_hit_threshold,
        );

        PatternSummary::build(
            table_stats,
            outcome.candidates,
            self.options.window,
            self.options.granularity,
        )
    }

    fn normalize_batch(&self, rows: &[RawQueryRow], run_id: &str) -> (Vec<QueryRecord>, u64) {
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0u64;
        for row in rows {
            match normalize_row(row) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    skipped += 1;
                    log::debug!("run {}: skipping row: {}", run_id, e);
                }
            }
        }
        (records, skipped)
    }

    /// Extract predicate hits for every record, grouped by table. The map is
    /// BTree-keyed so downstream iteration order is deterministic.
    fn extract_hits(
        &self,
        records: &[QueryRecord],
    ) -> BTreeMap<TableReference, Vec<PredicateHit>> {
        let mut grouped: BTreeMap<TableReference, Vec<PredicateHit>> = BTreeMap::new();
        for record in records {
            for hit in self.strategy.extract(record) {
                grouped
                    .entry(hit.table_reference.clone())
                    .or_default()
                    .push(hit);
            }
        }
        grouped
    }
}
