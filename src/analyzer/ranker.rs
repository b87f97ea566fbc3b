use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::catalog::ColumnCatalog;
use crate::predicate::{OperatorKind, PredicateHit};
use crate::query_log::TableReference;

/// A column scored as a partition/cluster candidate for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCandidate {
    pub column_name: String,
    pub hit_count: u64,
    pub operator_kinds: BTreeSet<OperatorKind>,
    pub score: f64,
}

// Wire form per the summary contract: {column, score, hit_count}.
impl Serialize for ColumnCandidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ColumnCandidate", 3)?;
        state.serialize_field("column", &self.column_name)?;
        state.serialize_field("score", &self.score)?;
        state.serialize_field("hit_count", &self.hit_count)?;
        state.end()
    }
}

/// Ranking output plus the diagnostic count of hits dropped because their
/// column is absent from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RankOutcome {
    pub candidates: Vec<ColumnCandidate>,
    pub schema_mismatches: u64,
}

/// Aggregate predicate hits for one table into an ordered candidate list.
///
/// Score rewards columns filtered with varied predicate shapes over columns
/// hit via one repeated boilerplate condition:
/// `score = hit_count * (1 + 0.1 * (distinct_operator_kinds - 1))`.
/// Columns below `min_hit_threshold` hits are dropped as noise. Ordering is
/// score desc, then hit_count desc, then column name asc.
pub fn rank_candidates(
    table: &TableReference,
    hits: &[PredicateHit],
    catalog: &ColumnCatalog,
    min_hit_threshold: u64,
) -> RankOutcome {
    let mut accumulated: BTreeMap<&str, (u64, BTreeSet<OperatorKind>)> = BTreeMap::new();
    let mut schema_mismatches = 0u64;

    for hit in hits {
        if hit.table_reference != *table {
            continue;
        }
        if !catalog.has_column(table, &hit.column_name) {
            schema_mismatches += 1;
            continue;
        }
        let entry = accumulated
            .entry(hit.column_name.as_str())
            .or_insert_with(|| (0, BTreeSet::new()));
        entry.0 += 1;
        entry.1.insert(hit.operator_kind);
    }

    let mut candidates: Vec<ColumnCandidate> = accumulated
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_hit_threshold)
        .map(|(column, (hit_count, operator_kinds))| {
            let diversity_bonus = 1.0 + 0.1 * (operator_kinds.len() as f64 - 1.0);
            ColumnCandidate {
                column_name: column.to_string(),
                hit_count,
                score: hit_count as f64 * diversity_bonus,
                operator_kinds,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.hit_count.cmp(&a.hit_count))
            .then_with(|| a.column_name.cmp(&b.column_name))
    });

    RankOutcome {
        candidates,
        schema_mismatches,
    }
}
