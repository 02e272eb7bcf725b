//! §4.6 Candidate Pair Generator — blocking-index-based cross-source pair
//! emission with reduction statistics.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use regiodedupe_domain::Record;

use crate::blocking::blocking_keys;

/// An unordered candidate pair `(a, b)` with `a < b` lexicographically.
pub type CandidatePair = (String, String);

/// Reduction statistics reported alongside the candidate set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateStats {
    pub total_events: usize,
    pub naive_cross_source_pairs: usize,
    pub blocked_pairs: usize,
    pub reduction_percent: f64,
}

/// Result of candidate generation: a deterministic, deduplicated pair list
/// plus the stats needed to report blocking effectiveness.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub pairs: Vec<CandidatePair>,
    pub stats: CandidateStats,
}

/// Build the blocking index and emit every cross-source candidate pair,
/// deduplicated across buckets, sorted by `(id_a, id_b)`.
#[must_use]
pub fn generate_candidates(records: &[Record]) -> CandidateResult {
    let mut buckets: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        for key in blocking_keys(record) {
            buckets.entry(key).or_default().push(record);
        }
    }

    let mut pairs: BTreeSet<CandidatePair> = BTreeSet::new();
    for bucket in buckets.values() {
        for i in 0..bucket.len() {
            for j in (i + 1)..bucket.len() {
                let (ra, rb) = (bucket[i], bucket[j]);
                if ra.source_code == rb.source_code {
                    continue;
                }
                let (id_a, id_b) = if ra.id < rb.id { (ra.id.clone(), rb.id.clone()) } else { (rb.id.clone(), ra.id.clone()) };
                pairs.insert((id_a, id_b));
            }
        }
    }

    let naive_cross_source_pairs = naive_cross_source_pair_count(records);
    let blocked_pairs = pairs.len();
    let reduction_percent = if naive_cross_source_pairs == 0 {
        0.0
    } else {
        (1.0 - blocked_pairs as f64 / naive_cross_source_pairs as f64) * 100.0
    };

    CandidateResult {
        pairs: pairs.into_iter().collect(),
        stats: CandidateStats {
            total_events: records.len(),
            naive_cross_source_pairs,
            blocked_pairs,
            reduction_percent,
        },
    }
}

/// Sum, over every pair of distinct source codes, the Cartesian product of
/// their event counts — the candidate count with no blocking at all.
fn naive_cross_source_pair_count(records: &[Record]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.source_code.as_str()).or_insert(0) += 1;
    }
    let sources: Vec<usize> = counts.values().copied().collect();
    let mut total = 0usize;
    for i in 0..sources.len() {
        for j in (i + 1)..sources.len() {
            total += sources[i] * sources[j];
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use regiodedupe_domain::{DateRange, Record, SourceType};

    fn record(id: &str, source: &str, city: &str, date: NaiveDate) -> Record {
        Record {
            id: id.to_string(),
            source_code: source.to_string(),
            source_type: SourceType::Article,
            title: id.to_string(),
            title_normalized: id.to_string(),
            short_description: None,
            description: None,
            highlights: vec![],
            location_name: None,
            location_city: Some(city.to_string()),
            location_city_normalized: Some(city.to_string()),
            location_district: None,
            location_street: None,
            location_zipcode: None,
            geo: None,
            categories: Default::default(),
            is_family_event: None,
            is_child_focused: None,
            admission_free: None,
            dates: vec![DateRange { date, end_date: None, start_time: None, end_time: None }],
            blocking_keys: Default::default(),
        }
    }

    #[test]
    fn same_source_pairs_are_excluded() {
        let d = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let records = vec![record("a", "src1", "waldkirch", d), record("b", "src1", "waldkirch", d)];
        let result = generate_candidates(&records);
        assert!(result.pairs.is_empty());
    }

    #[test]
    fn cross_source_pair_emitted_once_across_shared_buckets() {
        let d = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let records = vec![record("a", "src1", "waldkirch", d), record("b", "src2", "waldkirch", d)];
        let result = generate_candidates(&records);
        assert_eq!(result.pairs, vec![("a".to_string(), "b".to_string())]);
    }

    #[test]
    fn pairs_are_sorted_by_id() {
        let d = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let records = vec![record("z", "src1", "waldkirch", d), record("a", "src2", "waldkirch", d)];
        let result = generate_candidates(&records);
        assert_eq!(result.pairs, vec![("a".to_string(), "z".to_string())]);
    }

    #[test]
    fn stats_report_reduction() {
        let d = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let records = vec![
            record("a", "src1", "waldkirch", d),
            record("b", "src2", "waldkirch", d),
            record("c", "src2", "freiburg", d),
        ];
        let result = generate_candidates(&records);
        assert_eq!(result.stats.total_events, 3);
        assert_eq!(result.stats.naive_cross_source_pairs, 2);
        assert_eq!(result.stats.blocked_pairs, 1);
        assert!(result.stats.reduction_percent > 0.0);
    }
}
