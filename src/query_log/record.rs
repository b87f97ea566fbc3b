use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (database, schema, table) reference parsed from a dotted identifier.
///
/// All parts are lowercased so that references compare consistently across
/// warehouses with case-insensitive identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableReference {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl TableReference {
    pub fn new(database: Option<&str>, schema: Option<&str>, table: &str) -> Self {
        TableReference {
            database: database.map(str::to_lowercase),
            schema: schema.map(str::to_lowercase),
            table: table.to_lowercase(),
        }
    }

    /// Parse a dotted identifier like `project.dataset.table`, `schema.table`
    /// or a bare `table`. Wrapping backticks/quotes (BigQuery, Snowflake) are
    /// stripped from the whole reference and from each part. Returns `None`
    /// for empty input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = strip_quotes(raw.trim());
        if trimmed.is_empty() {
            return None;
        }

        let parts: Vec<String> = trimmed
            .split('.')
            .map(|p| strip_quotes(p.trim()).to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        match parts.len() {
            0 => None,
            1 => Some(TableReference {
                database: None,
                schema: None,
                table: parts[0].clone(),
            }),
            2 => Some(TableReference {
                database: None,
                schema: Some(parts[0].clone()),
                table: parts[1].clone(),
            }),
            // More than three parts: keep the trailing three, which is the
            // widest qualification any supported warehouse uses.
            n => Some(TableReference {
                database: Some(parts[n - 3].clone()),
                schema: Some(parts[n - 2].clone()),
                table: parts[n - 1].clone(),
            }),
        }
    }

    /// Whether this reference points at a system/metadata table that should
    /// be excluded from pattern analysis.
    pub fn is_system(&self) -> bool {
        const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "pg_catalog", "system", "sys"];

        if let Some(schema) = &self.schema {
            if SYSTEM_SCHEMAS.contains(&schema.as_str()) {
                return true;
            }
        }
        self.table.starts_with("information_schema.") || self.table.starts_with("__")
    }

    /// Case-insensitive match of a bare qualifier (e.g. from `orders.region`)
    /// against this reference's table name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.table == name.to_lowercase()
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(db) = &self.database {
            write!(f, "{}.", db)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.table)
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for (open, close) in [('`', '`'), ('"', '"'), ('[', ']')] {
        if s.len() >= 2 && s.starts_with(open) && s.ends_with(close) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// One raw query-history row as delivered by the extraction collaborator.
///
/// Field roster follows the warehouse extractors: required content is the
/// query text, the execution timestamp, and the accessed table identifiers;
/// everything else is best-effort metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQueryRow {
    #[serde(default)]
    pub query_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub query_text: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub bytes_scanned: Option<u64>,
    #[serde(default)]
    pub source_platform: Option<String>,
    #[serde(default)]
    pub source_project: Option<String>,
}

/// A canonicalized query-history record. Immutable once normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    pub table_references: Vec<TableReference>,
    pub timestamp: DateTime<Utc>,
    pub raw_text: String,
    pub bytes_scanned: Option<u64>,
    pub is_select_star: bool,
}
