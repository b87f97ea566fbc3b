//! Full-pipeline tests: raw JSON rows in, serialized summaries out.

use anyhow::Result;
use chrono::NaiveDate;
use querypatterns::analyzer::{
    AnalysisOptions, AnalysisWindow, BucketGranularity, PatternAnalyzer,
};
use querypatterns::catalog::{ColumnCatalog, TableMeta};
use querypatterns::query_log::RawQueryRow;

fn options(granularity: BucketGranularity) -> AnalysisOptions {
    AnalysisOptions {
        granularity,
        min_hit_threshold: 2,
        window: AnalysisWindow::new(
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        ),
    }
}

fn sample_rows() -> Result<Vec<RawQueryRow>> {
    // Rows shaped the way the warehouse extractors deliver them
    let rows = serde_json::from_value(serde_json::json!([
        {
            "query_id": "job-1",
            "user_name": "analyst@example.com",
            "query_text": "SELECT * FROM orders",
            "start_time": "2025-03-03T09:15:00Z",
            "tables": ["prod.sales.orders"],
            "bytes_scanned": 1048576,
            "source_platform": "bigquery",
            "source_project": "prod"
        },
        {
            "query_id": "job-2",
            "query_text": "SELECT id FROM orders WHERE customer_id = 5 AND created_at > '2025-01-01'",
            "start_time": "2025-03-04T10:00:00Z",
            "tables": ["prod.sales.orders"]
        },
        {
            "query_id": "job-3",
            "query_text": "SELECT id FROM orders WHERE customer_id IN (5, 6)",
            "start_time": "2025-03-11T11:00:00Z",
            "tables": ["prod.sales.orders"]
        },
        {
            "query_id": "job-4",
            "query_text": "SELECT 1 FROM information_schema.tables",
            "start_time": "2025-03-11T11:05:00Z",
            "tables": ["information_schema.tables"]
        }
    ]))?;
    Ok(rows)
}

fn sample_catalog() -> Result<ColumnCatalog> {
    let metas: Vec<TableMeta> = serde_json::from_value(serde_json::json!([
        {
            "database": "prod",
            "schema": "sales",
            "table": "orders",
            "columns": [
                {"name": "id", "data_type": "INT64"},
                {"name": "customer_id", "data_type": "INT64"},
                {"name": "created_at", "data_type": "TIMESTAMP"},
                {"name": "status", "data_type": "STRING"}
            ],
            "size_bytes": 123456789
        }
    ]))?;
    Ok(ColumnCatalog::from_table_metas(&metas))
}

#[test]
fn test_end_to_end_summary_content() -> Result<()> {
    let analyzer = PatternAnalyzer::new(options(BucketGranularity::Week));
    let report = analyzer.analyze(&sample_rows()?, &sample_catalog()?);

    // The system-table row normalizes to nothing; only orders is summarized
    assert_eq!(report.summaries.len(), 1);
    assert_eq!(report.skipped_rows, 0);

    let summary = &report.summaries[0];
    assert_eq!(summary.stats.total_queries, 3);
    assert_eq!(summary.stats.select_star_queries, 1);

    // customer_id: equality + in = 2 hits, 2 kinds -> 2 * 1.1
    assert_eq!(summary.candidates.len(), 1);
    assert_eq!(summary.candidates[0].column_name, "customer_id");
    assert!((summary.candidates[0].score - 2.2).abs() < 1e-9);

    // created_at had a single hit: below threshold
    assert!(!summary
        .candidates
        .iter()
        .any(|c| c.column_name == "created_at"));
    Ok(())
}

#[test]
fn test_serialized_contract_field_names() -> Result<()> {
    let analyzer = PatternAnalyzer::new(options(BucketGranularity::Week));
    let report = analyzer.analyze(&sample_rows()?, &sample_catalog()?);
    let json = serde_json::to_value(&report.summaries[0])?;

    assert_eq!(json["table"], "prod.sales.orders");
    assert_eq!(json["total_queries"], 3);
    assert_eq!(json["select_star_queries"], 1);
    assert_eq!(json["weekly_counts"]["2025-W10"], 2);
    assert_eq!(json["weekly_counts"]["2025-W11"], 1);
    assert_eq!(json["partition_candidates"][0]["column"], "customer_id");
    assert_eq!(json["partition_candidates"][0]["hit_count"], 2);
    assert_eq!(json["window"]["start"], "2025-02-01");
    assert_eq!(json["window"]["end"], "2025-03-31");
    Ok(())
}

#[test]
fn test_monthly_granularity_field_name() -> Result<()> {
    let analyzer = PatternAnalyzer::new(options(BucketGranularity::Month));
    let report = analyzer.analyze(&sample_rows()?, &sample_catalog()?);
    let json = serde_json::to_value(&report.summaries[0])?;

    assert_eq!(json["monthly_counts"]["2025-03"], 3);
    assert!(json.get("weekly_counts").is_none());
    Ok(())
}

#[test]
fn test_idempotence_byte_identical() -> Result<()> {
    let analyzer = PatternAnalyzer::new(options(BucketGranularity::Week));
    let rows = sample_rows()?;
    let catalog = sample_catalog()?;

    let first = serde_json::to_string(&analyzer.analyze(&rows, &catalog).summaries)?;
    let second = serde_json::to_string(&analyzer.analyze(&rows, &catalog).summaries)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_catalog_mismatch_diagnostics() -> Result<()> {
    let rows: Vec<RawQueryRow> = serde_json::from_value(serde_json::json!([
        {
            "query_text": "SELECT 1 FROM orders WHERE ghost_column = 1",
            "start_time": "2025-03-03T10:00:00Z",
            "tables": ["prod.sales.orders"]
        },
        {
            "query_text": "SELECT 1 FROM orders WHERE ghost_column = 2",
            "start_time": "2025-03-04T10:00:00Z",
            "tables": ["prod.sales.orders"]
        }
    ]))?;

    let analyzer = PatternAnalyzer::new(options(BucketGranularity::Week));
    let report = analyzer.analyze(&rows, &sample_catalog()?);

    // Hits on a column the schema doesn't know are dropped but counted
    assert_eq!(report.schema_mismatches, 2);
    assert!(report.summaries[0].candidates.is_empty());
    Ok(())
}

#[test]
fn test_rows_missing_optional_fields_deserialize() -> Result<()> {
    let rows: Vec<RawQueryRow> = serde_json::from_value(serde_json::json!([
        {
            "query_text": "SELECT 1 FROM t WHERE a = 1",
            "start_time": "2025-03-03T10:00:00Z",
            "tables": ["t"]
        }
    ]))?;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].query_id.is_none());
    assert!(rows[0].bytes_scanned.is_none());
    Ok(())
}
