//! Best-effort table → known-columns mapping.
//!
//! Built from the extraction collaborator's table metadata and used to
//! validate extracted predicate columns against the real schema, guarding
//! against the lexical extractor matching non-column tokens. Tables the
//! collaborator never described are left unvalidated.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::query_log::TableReference;

/// One column as described by the warehouse metadata extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Table metadata as delivered at the extraction boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl TableMeta {
    pub fn reference(&self) -> TableReference {
        TableReference::new(
            self.database.as_deref(),
            self.schema.as_deref(),
            self.table.as_str(),
        )
    }
}

/// Column catalog keyed by table reference, lowercased for matching.
#[derive(Debug, Clone, Default)]
pub struct ColumnCatalog {
    tables: HashMap<TableReference, HashSet<String>>,
}

impl ColumnCatalog {
    /// A catalog that knows no tables: all validation passes through.
    pub fn empty() -> Self {
        ColumnCatalog::default()
    }

    pub fn from_table_metas(metas: &[TableMeta]) -> Self {
        let mut catalog = ColumnCatalog::default();
        for meta in metas {
            catalog.insert(
                meta.reference(),
                meta.columns.iter().map(|c| c.name.clone()),
            );
        }
        catalog
    }

    pub fn insert(
        &mut self,
        table: TableReference,
        columns: impl IntoIterator<Item = String>,
    ) {
        let set = self.tables.entry(table).or_default();
        for column in columns {
            set.insert(column.to_lowercase());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Whether `column` exists on `table` per the catalog. Returns `true`
    /// when the table is not cataloged at all (no basis for validation).
    /// Qualified names (`orders.region`) are checked by their column part.
    pub fn has_column(&self, table: &TableReference, column: &str) -> bool {
        let Some(known) = self.lookup(table) else {
            return true;
        };
        let bare = column.rsplit('.').next().unwrap_or(column);
        known.contains(&bare.to_lowercase())
    }

    /// Exact lookup first; otherwise match by table name when that name is
    /// unambiguous across the catalog (query logs often carry partial
    /// qualification while metadata carries full).
    fn lookup(&self, table: &TableReference) -> Option<&HashSet<String>> {
        if let Some(columns) = self.tables.get(table) {
            return Some(columns);
        }
        let mut by_name = self
            .tables
            .iter()
            .filter(|(key, _)| key.table == table.table);
        match (by_name.next(), by_name.next()) {
            (Some((_, columns)), None) => Some(columns),
            _ => None,
        }
    }
}

/// Normalize a warehouse data type into a coarse category, for downstream
/// consumers reasoning about candidate columns without dialect knowledge.
pub fn type_category(data_type: &str) -> &'static str {
    match data_type.trim().to_uppercase().as_str() {
        "STRING" | "TEXT" | "VARCHAR" | "CHAR" => "text",
        "INT" | "INT64" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" => "integer",
        "FLOAT" | "FLOAT32" | "FLOAT64" | "DOUBLE" | "REAL" => "float",
        "NUMERIC" | "BIGNUMERIC" | "DECIMAL" | "NUMBER" => "numeric",
        "BOOLEAN" | "BOOL" => "boolean",
        "DATE" => "date",
        "TIME" => "time",
        "DATETIME" => "datetime",
        "TIMESTAMP" | "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ" | "TIMESTAMP_TZ" => "timestamp",
        "BYTES" | "BINARY" | "VARBINARY" => "binary",
        "JSON" | "STRUCT" | "OBJECT" | "VARIANT" => "json",
        "ARRAY" | "REPEATED" => "array",
        "GEOGRAPHY" => "geography",
        _ => "unknown",
    }
}
