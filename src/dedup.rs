//! Adjacent fuzzy-distance deduplication of scraped hits
//!
//! Scraped company names arrive with small spelling variations that survive
//! normalization ("acme" vs "acme1"). The grouper sorts rows by normalized
//! key and folds over adjacent pairs: rows within edit distance < 2 of their
//! predecessor join the predecessor's group, taking the first row's key of
//! the run as the canonical representative. Chains are transitive through
//! intermediate rows, which deliberately approximates clustering - a bridge
//! row can merge names more than two edits apart.

use std::collections::HashMap;

use serde::Serialize;

use crate::accumulator::HitRow;
use crate::normalize::{levenshtein, normalize};

/// Two keys merge when their edit distance is below this.
const MERGE_DISTANCE: usize = 2;

/// One canonical company after grouping, with the summed hit count of all
/// raw rows merged into it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CanonicalGroup {
    /// Representative normalized key of the merge run.
    pub canonical_name: String,
    pub total_count: u64,
}

/// A raw row with its normalized key and assigned representative. Exposed
/// for inspection so the chain assignment itself is testable.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedRow {
    pub name: String,
    pub key: String,
    pub representative: String,
    pub count: u64,
}

/// Assign each hit row a representative key via the adjacency chain.
///
/// Rows are sorted by normalized key (stable - ties keep input order), then
/// folded: each row compares its key against the previous row's key and
/// inherits the running representative when the distance is < 2, otherwise
/// it opens a new run with its own key.
pub fn assign_representatives(hits: &[HitRow]) -> Vec<AssignedRow> {
    let mut keyed: Vec<(String, &HitRow)> = hits
        .iter()
        .map(|row| (normalize(&row.company), row))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut assigned: Vec<AssignedRow> = Vec::with_capacity(keyed.len());
    for (key, row) in keyed {
        let representative = match assigned.last() {
            Some(prev) if levenshtein(&prev.key, &key) < MERGE_DISTANCE => {
                prev.representative.clone()
            }
            _ => key.clone(),
        };
        assigned.push(AssignedRow {
            name: row.company.clone(),
            key,
            representative,
            count: row.count,
        });
    }
    assigned
}

/// Collapse near-duplicate scraped hits into canonical groups with summed
/// counts. Output is sorted by canonical name for deterministic downstream
/// joins.
pub fn group(hits: &[HitRow]) -> Vec<CanonicalGroup> {
    let assigned = assign_representatives(hits);

    let mut totals: HashMap<String, u64> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for row in assigned {
        if !totals.contains_key(&row.representative) {
            order.push(row.representative.clone());
        }
        *totals.entry(row.representative).or_insert(0) += row.count;
    }

    order
        .into_iter()
        .map(|canonical_name| {
            let total_count = totals[&canonical_name];
            CanonicalGroup {
                canonical_name,
                total_count,
            }
        })
        .collect()
}
