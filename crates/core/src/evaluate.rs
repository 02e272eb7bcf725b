//! §4.13 Evaluator — precision/recall/F1 against labeled pairs, threshold
//! sweep, and category-subset filtering.

use std::collections::BTreeMap;

use regiodedupe_domain::{Decision, GroundTruthLabel, GroundTruthPair, MatchDecision, Record};

/// Precision/recall/F1 over a labeled set, `ambiguous` labels excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn metrics_from_counts(true_positives: usize, false_positives: usize, false_negatives: usize) -> EvaluationMetrics {
    let precision = if true_positives + false_positives == 0 { 0.0 } else { true_positives as f64 / (true_positives + false_positives) as f64 };
    let recall = if true_positives + false_negatives == 0 { 0.0 } else { true_positives as f64 / (true_positives + false_negatives) as f64 };
    let f1 = if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) };
    EvaluationMetrics { true_positives, false_positives, false_negatives, precision, recall, f1 }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) }
}

/// Compute precision/recall/F1 over `decisions` against `ground_truth`,
/// excluding `ambiguous` labels (§4.13). A predicted `match` is a true
/// positive iff the pair's label is `same`; a predicted `match` against a
/// `different` label is a false positive; a `same`-labeled pair with no
/// predicted match (or a predicted `no_match`/`ambiguous`) is a false
/// negative.
#[must_use]
pub fn evaluate(decisions: &[MatchDecision], ground_truth: &[GroundTruthPair]) -> EvaluationMetrics {
    let predicted: BTreeMap<(String, String), Decision> =
        decisions.iter().map(|d| (pair_key(&d.event_id_a, &d.event_id_b), d.decision)).collect();

    let mut true_positives = 0;
    let mut false_positives = 0;
    let mut false_negatives = 0;

    for pair in ground_truth {
        if pair.label == GroundTruthLabel::Ambiguous {
            continue;
        }
        let key = pair_key(&pair.event_id_a, &pair.event_id_b);
        let predicted_match = matches!(predicted.get(&key), Some(Decision::Match));

        match (pair.label, predicted_match) {
            (GroundTruthLabel::Same, true) => true_positives += 1,
            (GroundTruthLabel::Same, false) => false_negatives += 1,
            (GroundTruthLabel::Different, true) => false_positives += 1,
            (GroundTruthLabel::Different, false) => {}
        }
    }

    metrics_from_counts(true_positives, false_positives, false_negatives)
}

/// Re-derive a predicted decision from stored signal scores at an
/// alternate `high` threshold, without re-running the scorer or combiner.
/// Mirrors the `high` comparison in [`crate::scoring::weights::decide`];
/// `low` and the title veto are unaffected by the sweep (§4.13 only
/// varies `high`).
fn decide_at_threshold(decision: &MatchDecision, high: f64) -> Decision {
    if decision.combined_score >= high {
        Decision::Match
    } else if decision.decision == Decision::NoMatch {
        // `low` is unaffected by the sweep (§4.13), so a pair already
        // below it stays `no_match` regardless of where `high` moves.
        Decision::NoMatch
    } else {
        Decision::Ambiguous
    }
}

/// Replay `decisions` through each candidate `high` threshold in
/// `thresholds`, returning metrics for each.
#[must_use]
pub fn threshold_sweep(decisions: &[MatchDecision], ground_truth: &[GroundTruthPair], thresholds: &[f64]) -> Vec<(f64, EvaluationMetrics)> {
    thresholds
        .iter()
        .map(|&high| {
            let replayed: Vec<MatchDecision> =
                decisions.iter().map(|d| MatchDecision { decision: decide_at_threshold(d, high), ..d.clone() }).collect();
            (high, evaluate(&replayed, ground_truth))
        })
        .collect()
}

/// Restrict ground truth and predictions to pairs where either event
/// carries category `category`.
#[must_use]
pub fn filter_by_category<'a>(
    ground_truth: &'a [GroundTruthPair],
    records_by_id: &BTreeMap<String, Record>,
    category: &str,
) -> Vec<&'a GroundTruthPair> {
    ground_truth
        .iter()
        .filter(|pair| {
            let a_has = records_by_id.get(&pair.event_id_a).is_some_and(|r| r.categories.contains(category));
            let b_has = records_by_id.get(&pair.event_id_b).is_some_and(|r| r.categories.contains(category));
            a_has || b_has
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regiodedupe_domain::{SignalScores, Tier};

    fn decision(a: &str, b: &str, combined: f64, decision: Decision) -> MatchDecision {
        MatchDecision {
            event_id_a: a.to_string(),
            event_id_b: b.to_string(),
            scores: SignalScores { date: combined, geo: combined, title: combined, description: combined },
            combined_score: combined,
            decision,
            tier: Tier::Deterministic,
        }
    }

    fn truth(a: &str, b: &str, label: GroundTruthLabel) -> GroundTruthPair {
        GroundTruthPair { event_id_a: a.to_string(), event_id_b: b.to_string(), label }
    }

    #[test]
    fn ambiguous_labels_excluded_from_metrics() {
        let decisions = vec![decision("a", "b", 0.9, Decision::Match)];
        let ground_truth = vec![truth("a", "b", GroundTruthLabel::Ambiguous)];
        let metrics = evaluate(&decisions, &ground_truth);
        assert_eq!(metrics.true_positives, 0);
        assert_eq!(metrics.false_positives, 0);
    }

    #[test]
    fn perfect_match_yields_f1_one() {
        let decisions = vec![decision("a", "b", 0.9, Decision::Match), decision("c", "d", 0.1, Decision::NoMatch)];
        let ground_truth = vec![truth("a", "b", GroundTruthLabel::Same), truth("c", "d", GroundTruthLabel::Different)];
        let metrics = evaluate(&decisions, &ground_truth);
        assert_eq!(metrics.true_positives, 1);
        assert_eq!(metrics.false_positives, 0);
        assert_eq!(metrics.false_negatives, 0);
        assert!((metrics.f1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_prediction_for_same_label_is_false_negative() {
        let decisions = vec![];
        let ground_truth = vec![truth("a", "b", GroundTruthLabel::Same)];
        let metrics = evaluate(&decisions, &ground_truth);
        assert_eq!(metrics.false_negatives, 1);
        assert_eq!(metrics.recall, 0.0);
    }

    #[test]
    fn threshold_sweep_raises_bar_and_loses_recall() {
        let decisions = vec![decision("a", "b", 0.76, Decision::Match)];
        let ground_truth = vec![truth("a", "b", GroundTruthLabel::Same)];
        let results = threshold_sweep(&decisions, &ground_truth, &[0.5, 0.9]);
        assert_eq!(results[0].1.true_positives, 1);
        assert_eq!(results[1].1.true_positives, 0);
    }
}
