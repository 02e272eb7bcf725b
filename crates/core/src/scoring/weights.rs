//! §4.5 Weight Resolver & Combiner — category-aware weight selection,
//! weighted combination, threshold decision, and the title veto.

use regiodedupe_domain::{CategoryWeightConfig, Decision, Record, SignalScores, SignalWeights, ThresholdConfig};

/// Resolve the signal weights to use for a pair, consulting the configured
/// category-priority list in order and picking the override for the first
/// category present in *both* events' category sets. Falls back to the
/// default weights. Always returns a normalized (sum-to-1) vector.
#[must_use]
pub fn resolve_weights(a: &Record, b: &Record, config: &CategoryWeightConfig, default: SignalWeights) -> SignalWeights {
    for category in &config.priority {
        if a.categories.contains(category) && b.categories.contains(category) {
            if let Some(override_weights) = config.overrides.get(category) {
                return override_weights.normalized();
            }
        }
    }
    default.normalized()
}

/// Weighted arithmetic mean of the four signal scores.
#[must_use]
pub fn combine(scores: &SignalScores, weights: &SignalWeights) -> f64 {
    scores.date * weights.date
        + scores.geo * weights.geo
        + scores.title * weights.title
        + scores.description * weights.description
}

/// Classify a combined score into a decision, applying the title veto:
/// a title score below `thresholds.title_veto` caps the decision at
/// `ambiguous` regardless of the combined score.
#[must_use]
pub fn decide(combined: f64, scores: &SignalScores, thresholds: &ThresholdConfig) -> Decision {
    if scores.title < thresholds.title_veto {
        return Decision::Ambiguous;
    }
    if combined >= thresholds.high {
        Decision::Match
    } else if combined <= thresholds.low {
        Decision::NoMatch
    } else {
        Decision::Ambiguous
    }
}
