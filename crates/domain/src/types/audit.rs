//! Audit log, cache, and LLM usage log types — §3 Data Model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Action recorded by a review operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Split,
    Merge,
    Override,
    ReviewApprove,
    ReviewDismiss,
}

/// One append-only audit row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub id: String,
    pub action: AuditAction,
    pub canonical_id: Option<String>,
    pub source_id: Option<String>,
    pub operator: String,
    pub details: BTreeMap<String, JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// LLM resolver's binary verdict for a pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmVerdict {
    Same,
    Different,
}

/// A cached LLM resolution, keyed by content hash of the pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub pair_hash: String,
    pub decision: LlmVerdict,
    pub confidence: f64,
    pub reasoning: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// One row per LLM call or cache hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageLogRow {
    pub id: String,
    pub batch_id: String,
    pub pair_hash: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: f64,
    pub was_cached: bool,
    pub created_at: DateTime<Utc>,
}

/// One pair of ground-truth labels for the evaluator (§4.13).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruthLabel {
    Same,
    Different,
    Ambiguous,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroundTruthPair {
    pub event_id_a: String,
    pub event_id_b: String,
    pub label: GroundTruthLabel,
}
