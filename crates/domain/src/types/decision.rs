//! Match decision types — §3 Data Model.

use serde::{Deserialize, Serialize};

/// Outcome of combining the four signal scores for a pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Match,
    NoMatch,
    Ambiguous,
}

/// How a decision was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Deterministic,
    Ai,
    AiLowConfidence,
    AiUnexpected,
}

/// The four deterministic signal scores plus their weighted combination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SignalScores {
    pub date: f64,
    pub geo: f64,
    pub title: f64,
    pub description: f64,
}

/// A persisted decision for an unordered pair `(event_id_a, event_id_b)`
/// with `event_id_a < event_id_b`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchDecision {
    pub event_id_a: String,
    pub event_id_b: String,
    pub scores: SignalScores,
    pub combined_score: f64,
    pub decision: Decision,
    pub tier: Tier,
}

impl MatchDecision {
    /// Build a decision, enforcing canonical `(a, b)` ordering by swapping
    /// ids and re-ordering nothing else (scores are computed as a function
    /// of the pair, not dependent on argument order, by the scorer layer).
    #[must_use]
    pub fn canonical_pair(id_a: &str, id_b: &str) -> (String, String) {
        if id_a < id_b {
            (id_a.to_string(), id_b.to_string())
        } else {
            (id_b.to_string(), id_a.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_orders_ids() {
        assert_eq!(MatchDecision::canonical_pair("b", "a"), ("a".to_string(), "b".to_string()));
        assert_eq!(MatchDecision::canonical_pair("a", "b"), ("a".to_string(), "b".to_string()));
    }
}
