//! Robustness tests for the lexical WHERE-clause extractor: hostile,
//! malformed, and dialect-flavored SQL must never panic, and recognized
//! shapes must survive surrounding noise.

use chrono::{TimeZone, Utc};
use querypatterns::predicate::{
    LexicalExtractor, OperatorKind, PredicateExtractionStrategy, PredicateHit,
};
use querypatterns::query_log::{QueryRecord, TableReference};
use test_case::test_case;

fn record(sql: &str, tables: &[&str]) -> QueryRecord {
    QueryRecord {
        table_references: tables
            .iter()
            .map(|t| TableReference::parse(t).unwrap())
            .collect(),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        raw_text: sql.to_string(),
        bytes_scanned: None,
        is_select_star: false,
    }
}

fn extract(sql: &str) -> Vec<PredicateHit> {
    LexicalExtractor.extract(&record(sql, &["orders"]))
}

#[test]
fn test_malformed_sql_never_panics() {
    let malformed_queries = vec![
        "",
        "WHERE",
        "SELECT",
        "SELECT FROM",
        "SELECT 1 FROM orders WHERE",
        "SELECT 1 FROM orders WHERE (",
        "SELECT 1 FROM orders WHERE )",
        "SELECT 1 FROM orders WHERE ((a = 1)",
        "SELECT 1 FROM orders WHERE a = ",
        "SELECT 1 FROM orders WHERE = 5",
        "SELECT 1 FROM orders WHERE AND",
        "SELECT 1 FROM orders WHERE a BETWEEN AND",
        "SELECT 1 FROM orders WHERE 'unterminated string",
        "SELECT 1 FROM orders WHERE /* unterminated comment",
        "SELECT 1 FROM orders WHERE `unterminated ident",
        "WHERE WHERE WHERE WHERE",
        ";;;",
        "\u{00e9}\u{00e9} WHERE caf\u{00e9} = 'caf\u{00e9}'",
    ];

    for query in malformed_queries {
        // Should not panic; hit content is irrelevant here
        let _ = extract(query);
    }
}

#[test_case("SELECT 1 FROM orders WHERE customer_id = 5", "customer_id", OperatorKind::Equality; "equality")]
#[test_case("SELECT 1 FROM orders WHERE amount >= 100", "amount", OperatorKind::Range; "range gte")]
#[test_case("SELECT 1 FROM orders WHERE status IN ('a', 'b')", "status", OperatorKind::In; "in list")]
#[test_case("SELECT 1 FROM orders WHERE name LIKE 'x%'", "name", OperatorKind::Like; "like")]
#[test_case("SELECT 1 FROM orders WHERE ts BETWEEN '2025-01-01' AND '2025-02-01'", "ts", OperatorKind::Range; "between")]
#[test_case("SELECT 1 FROM orders WHERE DATE(ts) = '2025-01-01'", "ts", OperatorKind::Equality; "function wrapper")]
#[test_case("SELECT 1 FROM orders WHERE status != 'x'", "status", OperatorKind::Unknown; "not equal")]
fn test_recognized_shape(sql: &str, column: &str, kind: OperatorKind) {
    let hits = extract(sql);
    assert_eq!(hits.len(), 1, "query: {}", sql);
    assert_eq!(hits[0].column_name, column);
    assert_eq!(hits[0].operator_kind, kind);
}

#[test_case("SELECT 1 FROM orders WHERE 1 = 1"; "literal comparison")]
#[test_case("SELECT 1 FROM orders WHERE EXISTS (SELECT 1 FROM x)"; "exists")]
#[test_case("SELECT 1 FROM orders WHERE TRUE"; "bare true")]
#[test_case("SELECT 1 FROM orders"; "no where clause")]
#[test_case("SELECT 1 FROM orders WHERE 5 > amount"; "literal on left")]
fn test_unrecognized_shape_yields_no_hits(sql: &str) {
    assert!(extract(sql).is_empty(), "query: {}", sql);
}

#[test]
fn test_keywords_inside_strings_do_not_confuse_boundaries() {
    let hits = extract(
        "SELECT 1 FROM orders WHERE note = 'ORDER BY nothing GROUP BY x LIMIT 5' AND id = 3",
    );
    let columns: Vec<&str> = hits.iter().map(|h| h.column_name.as_str()).collect();
    assert_eq!(columns, vec!["note", "id"]);
}

#[test]
fn test_nested_subqueries_extract_at_every_depth() {
    let hits = extract(
        "SELECT 1 FROM orders WHERE customer_id IN ( \
            SELECT id FROM customers WHERE region IN ( \
                SELECT code FROM regions WHERE zone = 'EU'))",
    );
    let columns: Vec<&str> = hits.iter().map(|h| h.column_name.as_str()).collect();
    assert!(columns.contains(&"customer_id"));
    assert!(columns.contains(&"region"));
    assert!(columns.contains(&"zone"));
}

#[test]
fn test_quoted_identifiers() {
    let hits = extract("SELECT 1 FROM orders WHERE `Customer Id` = 5");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].column_name, "customer id");

    let hits = extract("SELECT 1 FROM orders WHERE \"Region\" = 'EU'");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].column_name, "region");
}

#[test]
fn test_multiline_and_mixed_case() {
    let hits = extract("select 1\nfrom orders\nwhere\n  Customer_Id = 5\n  and Status = 'x'");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].column_name, "customer_id");
    assert_eq!(hits[1].column_name, "status");
}

#[test]
fn test_multi_statement_text_extracts_each_where() {
    let hits = extract("SELECT 1 FROM a WHERE x = 1; SELECT 2 FROM b WHERE y = 2");
    let columns: Vec<&str> = hits.iter().map(|h| h.column_name.as_str()).collect();
    assert_eq!(columns, vec!["x", "y"]);
}

#[test]
fn test_extractor_is_pure() {
    let rec = record("SELECT 1 FROM orders WHERE a = 1", &["orders"]);
    let first = LexicalExtractor.extract(&rec);
    let second = LexicalExtractor.extract(&rec);
    assert_eq!(first, second);
}
