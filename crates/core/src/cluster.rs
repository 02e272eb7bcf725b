//! §4.8 Graph Clusterer & Coherence Validator — connected components over
//! match-decision edges, then cheapest-first coherence checks.

use std::collections::{BTreeMap, BTreeSet};

use regiodedupe_domain::constants::COHERENCE_MAX_DATE_SPREAD_DAYS;
use regiodedupe_domain::{ClusterConfig, Decision, MatchDecision, Record};

/// One connected component of event ids, plus whether it failed a
/// coherence check.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub event_ids: Vec<String>,
    pub needs_review: bool,
    pub mean_internal_similarity: Option<f64>,
}

/// Clustering result over the full known event population.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    pub clusters: Vec<Cluster>,
    pub singleton_count: usize,
    pub flagged_count: usize,
}

/// Build connected components over `decisions` with `decision == match`,
/// covering every id in `all_event_ids` exactly once (including ids with
/// no match edges, which become size-1 clusters), then validate each
/// non-singleton cluster against the three coherence checks.
#[must_use]
pub fn cluster(all_event_ids: &[String], decisions: &[MatchDecision], records_by_id: &BTreeMap<String, &Record>, config: &ClusterConfig) -> ClusterResult {
    let mut parent: BTreeMap<String, String> = all_event_ids.iter().map(|id| (id.clone(), id.clone())).collect();

    for decision in decisions {
        if decision.decision == Decision::Match {
            union(&mut parent, &decision.event_id_a, &decision.event_id_b);
        }
    }

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in all_event_ids {
        let root = find(&parent, id);
        groups.entry(root).or_default().push(id.clone());
    }

    let edge_weights = build_edge_weights(decisions);

    let mut clusters = Vec::new();
    let mut singleton_count = 0;
    let mut flagged_count = 0;

    for mut event_ids in groups.into_values() {
        event_ids.sort();
        if event_ids.len() == 1 {
            singleton_count += 1;
            clusters.push(Cluster { event_ids, needs_review: false, mean_internal_similarity: None });
            continue;
        }

        let mean_similarity = mean_internal_similarity(&event_ids, &edge_weights);
        let needs_review = !passes_coherence(&event_ids, mean_similarity, records_by_id, config);
        if needs_review {
            flagged_count += 1;
        }
        clusters.push(Cluster { event_ids, needs_review, mean_internal_similarity: Some(mean_similarity) });
    }

    ClusterResult { clusters, singleton_count, flagged_count }
}

fn passes_coherence(
    event_ids: &[String],
    mean_similarity: f64,
    records_by_id: &BTreeMap<String, &Record>,
    config: &ClusterConfig,
) -> bool {
    if event_ids.len() > config.max_cluster_size {
        return false;
    }
    if mean_similarity < config.min_internal_similarity {
        return false;
    }
    date_spread_days(event_ids, records_by_id) <= COHERENCE_MAX_DATE_SPREAD_DAYS
}

fn date_spread_days(event_ids: &[String], records_by_id: &BTreeMap<String, &Record>) -> i64 {
    let mut days: BTreeSet<chrono::NaiveDate> = BTreeSet::new();
    for id in event_ids {
        if let Some(record) = records_by_id.get(id) {
            days.extend(record.expanded_days());
        }
    }
    match (days.iter().next(), days.iter().next_back()) {
        (Some(first), Some(last)) => (*last - *first).num_days(),
        _ => 0,
    }
}

fn build_edge_weights(decisions: &[MatchDecision]) -> BTreeMap<(String, String), f64> {
    decisions
        .iter()
        .filter(|d| d.decision == Decision::Match)
        .map(|d| ((d.event_id_a.clone(), d.event_id_b.clone()), d.combined_score))
        .collect()
}

fn mean_internal_similarity(event_ids: &[String], edge_weights: &BTreeMap<(String, String), f64>) -> f64 {
    let members: BTreeSet<&String> = event_ids.iter().collect();
    let mut total = 0.0;
    let mut count = 0usize;
    for ((a, b), weight) in edge_weights {
        if members.contains(a) && members.contains(b) {
            total += weight;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn find(parent: &BTreeMap<String, String>, id: &str) -> String {
    let mut current = id.to_string();
    loop {
        let next = parent.get(&current).cloned().unwrap_or_else(|| current.clone());
        if next == current {
            return current;
        }
        current = next;
    }
}

fn union(parent: &mut BTreeMap<String, String>, a: &str, b: &str) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        let (keep, merge) = if root_a < root_b { (root_a, root_b) } else { (root_b, root_a) };
        parent.insert(merge, keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regiodedupe_domain::{SignalScores, SourceType, Tier};

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            source_code: format!("src-{id}"),
            source_type: SourceType::Article,
            title: String::new(),
            title_normalized: String::new(),
            short_description: None,
            description: None,
            highlights: vec![],
            location_name: None,
            location_city: None,
            location_city_normalized: None,
            location_district: None,
            location_street: None,
            location_zipcode: None,
            geo: None,
            categories: Default::default(),
            is_family_event: None,
            is_child_focused: None,
            admission_free: None,
            dates: vec![],
            blocking_keys: Default::default(),
        }
    }

    fn match_decision(a: &str, b: &str, combined: f64) -> MatchDecision {
        MatchDecision {
            event_id_a: a.to_string(),
            event_id_b: b.to_string(),
            scores: SignalScores { date: combined, geo: combined, title: combined, description: combined },
            combined_score: combined,
            decision: Decision::Match,
            tier: Tier::Deterministic,
        }
    }

    #[test]
    fn covers_every_id_including_unmatched_singletons() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let decisions = vec![match_decision("a", "b", 0.9)];
        let records: BTreeMap<String, &Record> = BTreeMap::new();
        let config = ClusterConfig::default();
        let result = cluster(&ids, &decisions, &records, &config);
        let total: usize = result.clusters.iter().map(|c| c.event_ids.len()).sum();
        assert_eq!(total, 3);
        assert_eq!(result.singleton_count, 1);
    }

    #[test]
    fn match_edge_pair_lands_in_same_cluster() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let decisions = vec![match_decision("a", "b", 0.9)];
        let records: BTreeMap<String, &Record> = BTreeMap::new();
        let config = ClusterConfig::default();
        let result = cluster(&ids, &decisions, &records, &config);
        let joint = result.clusters.iter().find(|c| c.event_ids.len() == 2).unwrap();
        assert!(joint.event_ids.contains(&"a".to_string()));
        assert!(joint.event_ids.contains(&"b".to_string()));
    }

    #[test]
    fn low_internal_similarity_flags_needs_review() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let decisions = vec![match_decision("a", "b", 0.9), match_decision("b", "c", 0.1)];
        let records: BTreeMap<String, &Record> = BTreeMap::new();
        let config = ClusterConfig::default();
        let result = cluster(&ids, &decisions, &records, &config);
        let joint = result.clusters.iter().find(|c| c.event_ids.len() == 3).unwrap();
        assert!(joint.needs_review);
        assert_eq!(result.flagged_count, 1);
    }

    #[test]
    fn oversized_cluster_flags_needs_review() {
        let mut config = ClusterConfig::default();
        config.max_cluster_size = 2;
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let decisions = vec![match_decision("a", "b", 0.9), match_decision("b", "c", 0.9)];
        let records: BTreeMap<String, &Record> = BTreeMap::new();
        let result = cluster(&ids, &decisions, &records, &config);
        let joint = result.clusters.iter().find(|c| c.event_ids.len() == 3).unwrap();
        assert!(joint.needs_review);
    }

    #[test]
    fn singletons_never_flagged() {
        let ids = vec!["a".to_string()];
        let records: BTreeMap<String, &Record> = BTreeMap::new();
        let config = ClusterConfig::default();
        let result = cluster(&ids, &[], &records, &config);
        assert!(!result.clusters[0].needs_review);
    }

    #[test]
    fn date_spread_beyond_three_days_flags_needs_review() {
        use regiodedupe_domain::DateRange;

        let mut a = record("a");
        a.dates = vec![DateRange {
            date: chrono::NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            end_date: None,
            start_time: None,
            end_time: None,
        }];
        let mut b = record("b");
        b.dates = vec![DateRange {
            date: chrono::NaiveDate::from_ymd_opt(2026, 5, 10).unwrap(),
            end_date: None,
            start_time: None,
            end_time: None,
        }];

        let ids = vec!["a".to_string(), "b".to_string()];
        let decisions = vec![match_decision("a", "b", 0.9)];
        let mut records_by_id: BTreeMap<String, &Record> = BTreeMap::new();
        records_by_id.insert("a".to_string(), &a);
        records_by_id.insert("b".to_string(), &b);
        let config = ClusterConfig::default();
        let result = cluster(&ids, &decisions, &records_by_id, &config);
        let joint = result.clusters.iter().find(|c| c.event_ids.len() == 2).unwrap();
        assert!(joint.needs_review);
    }
}
