use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::record::{QueryRecord, RawQueryRow, TableReference};

/// Errors raised while canonicalizing a single raw row. Always recoverable:
/// callers skip the row and count it, the batch never aborts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NormalizeError {
    #[error("query text is empty (query_id: {query_id})")]
    EmptyQueryText { query_id: String },
    #[error("unparsable timestamp `{value}` (query_id: {query_id})")]
    BadTimestamp { value: String, query_id: String },
}

lazy_static! {
    // Matches SELECT * and SELECT alias.* at any nesting depth. String
    // literals are masked before matching so embedded text can't trigger it.
    static ref SELECT_STAR_RE: Regex =
        Regex::new(r"(?i)\bselect\s+(?:distinct\s+)?(?:[a-z_][a-z0-9_]*\s*\.\s*)?\*").unwrap();
}

/// Canonicalize one raw warehouse row into a [`QueryRecord`].
///
/// Returns `Ok(None)` when the row references no table, or only
/// system/metadata tables. Fails when the timestamp is unparsable or the
/// query text is blank.
pub fn normalize_row(row: &RawQueryRow) -> Result<Option<QueryRecord>, NormalizeError> {
    let query_id = row.query_id.clone().unwrap_or_else(|| "<unknown>".to_string());

    if row.query_text.trim().is_empty() {
        return Err(NormalizeError::EmptyQueryText { query_id });
    }

    let timestamp = parse_timestamp(&row.start_time).ok_or_else(|| NormalizeError::BadTimestamp {
        value: row.start_time.clone(),
        query_id,
    })?;

    let mut table_references: Vec<TableReference> = Vec::new();
    for parsed in row
        .tables
        .iter()
        .filter_map(|t| TableReference::parse(t))
        .filter(|t| !t.is_system())
    {
        if !table_references.contains(&parsed) {
            table_references.push(parsed);
        }
    }

    if table_references.is_empty() {
        return Ok(None);
    }

    Ok(Some(QueryRecord {
        is_select_star: is_select_star(&row.query_text),
        table_references,
        timestamp,
        raw_text: row.query_text.clone(),
        bytes_scanned: row.bytes_scanned,
    }))
}

/// Parse an execution timestamp in RFC 3339 or the common ISO shapes the
/// warehouse extractors emit (`Z` suffix, space separator, date-only).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}

/// Lexical SELECT * detection, quote-aware.
fn is_select_star(sql: &str) -> bool {
    SELECT_STAR_RE.is_match(&mask_string_literals(sql))
}

/// Replace the contents of single-quoted string literals with spaces so
/// keyword scans can't match inside them. Handles `''` escapes.
pub(crate) fn mask_string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push_str("  ");
                } else {
                    in_string = false;
                    out.push('\'');
                }
            } else {
                out.push(' ');
            }
        } else {
            if c == '\'' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}
