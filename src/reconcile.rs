//! Set reconciliation of reference candidates against canonical hits
//!
//! The final join: reference companies on the left, deduplicated scraped
//! hits on the right, keyed by normalized name. Candidates with at least one
//! hit become scored records; the residual canonical hits with no reference
//! counterpart are surfaced separately as companies found only via scraping.
//! A miss on either side is routed, never an error, and candidates without
//! hits are dropped rather than zero-filled - the output carries positive
//! signal only.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::dedup::CanonicalGroup;
use crate::reference::ReferenceCompany;

/// One reference company with job-ad signal, scored for ranking.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReconciliationRecord {
    pub name: String,
    pub key: String,
    pub revenue: f64,
    pub employees: f64,
    pub industry: String,
    /// Job-ad hits matched to this company.
    pub ad_count: u64,
    /// Hits per 100 employees.
    pub intensity: f64,
}

/// Join candidates against canonical hits on the normalized key.
///
/// Candidates whose key is in `current_customer_keys` are excluded from the
/// matched result even when they qualify. Matched records come back sorted
/// by intensity descending, unmatched hits by count descending.
pub fn reconcile(
    candidates: &[ReferenceCompany],
    canonical_hits: &[CanonicalGroup],
    current_customer_keys: &HashSet<String>,
) -> (Vec<ReconciliationRecord>, Vec<CanonicalGroup>) {
    let hit_counts: HashMap<&str, u64> = canonical_hits
        .iter()
        .map(|group| (group.canonical_name.as_str(), group.total_count))
        .collect();

    let mut matched: Vec<ReconciliationRecord> = Vec::new();
    for candidate in candidates {
        let Some(&count) = hit_counts.get(candidate.key.as_str()) else {
            continue;
        };
        if count == 0 {
            continue;
        }
        if current_customer_keys.contains(&candidate.key) {
            debug!("Excluding current customer '{}' from matches", candidate.name);
            continue;
        }

        let intensity = if candidate.employees > 0.0 {
            count as f64 / candidate.employees * 100.0
        } else {
            0.0
        };
        matched.push(ReconciliationRecord {
            name: candidate.name.clone(),
            key: candidate.key.clone(),
            revenue: candidate.revenue,
            employees: candidate.employees,
            industry: candidate.industry.clone(),
            ad_count: count,
            intensity,
        });
    }

    matched.sort_by(|a, b| {
        b.intensity
            .partial_cmp(&a.intensity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let candidate_keys: HashSet<&str> =
        candidates.iter().map(|c| c.key.as_str()).collect();
    let mut unmatched: Vec<CanonicalGroup> = canonical_hits
        .iter()
        .filter(|group| !candidate_keys.contains(group.canonical_name.as_str()))
        .cloned()
        .collect();
    unmatched.sort_by(|a, b| b.total_count.cmp(&a.total_count));

    debug!(
        "Reconciled {} matched candidates, {} scrape-only companies",
        matched.len(),
        unmatched.len()
    );
    (matched, unmatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn candidate(name: &str, employees: f64) -> ReferenceCompany {
        ReferenceCompany {
            name: name.to_string(),
            key: normalize(name),
            revenue: 1000.0,
            employees,
            industry: "Machinery".to_string(),
            last_modified: None,
        }
    }

    fn hits(list: &[(&str, u64)]) -> Vec<CanonicalGroup> {
        list.iter()
            .map(|(name, count)| CanonicalGroup {
                canonical_name: name.to_string(),
                total_count: *count,
            })
            .collect()
    }

    #[test]
    fn test_matched_scored_and_unhit_candidates_dropped() {
        let candidates = vec![candidate("A GmbH", 50.0), candidate("B GmbH", 100.0)];
        let (matched, unmatched) =
            reconcile(&candidates, &hits(&[("a", 10)]), &HashSet::new());

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "A GmbH");
        assert_eq!(matched[0].ad_count, 10);
        assert!((matched[0].intensity - 20.0).abs() < 1e-9);
        // B has no hit: absent, not zero-filled
        assert!(unmatched.is_empty());
    }

    #[test]
    fn test_unmatched_hits_are_scrape_only_companies() {
        let candidates = vec![candidate("A GmbH", 50.0)];
        let (matched, unmatched) =
            reconcile(&candidates, &hits(&[("a", 2), ("beta", 1)]), &HashSet::new());

        assert_eq!(matched.len(), 1);
        assert_eq!(unmatched, hits(&[("beta", 1)]));
    }

    #[test]
    fn test_matched_sorted_by_intensity_descending() {
        let candidates = vec![candidate("A GmbH", 100.0), candidate("B GmbH", 10.0)];
        let (matched, _) =
            reconcile(&candidates, &hits(&[("a", 5), ("b", 5)]), &HashSet::new());
        assert_eq!(matched[0].name, "B GmbH");
        assert_eq!(matched[1].name, "A GmbH");
    }

    #[test]
    fn test_unmatched_sorted_by_count_descending() {
        let (_, unmatched) = reconcile(
            &[],
            &hits(&[("beta", 1), ("gamma", 9), ("delta", 4)]),
            &HashSet::new(),
        );
        assert_eq!(unmatched, hits(&[("gamma", 9), ("delta", 4), ("beta", 1)]));
    }

    #[test]
    fn test_current_customers_excluded_from_matches() {
        let candidates = vec![candidate("A GmbH", 50.0)];
        let customers: HashSet<String> = ["a".to_string()].into();
        let (matched, unmatched) = reconcile(&candidates, &hits(&[("a", 10)]), &customers);
        assert!(matched.is_empty());
        // still a known reference company, so not surfaced as scrape-only
        assert!(unmatched.is_empty());
    }

    #[test]
    fn test_zero_count_hit_not_matched() {
        let candidates = vec![candidate("A GmbH", 50.0)];
        let (matched, _) = reconcile(&candidates, &hits(&[("a", 0)]), &HashSet::new());
        assert!(matched.is_empty());
    }
}
