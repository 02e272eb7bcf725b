//! Structured logging helpers for the pipeline, LLM resolver, and review
//! operations. Centralizing the field names here keeps log lines
//! consistent across call sites instead of each module inventing its own
//! shape.

use std::time::Duration;

use tracing::{info, warn};

/// Log the outcome of a pipeline stage (ingest, scoring, clustering, ...).
#[inline]
pub fn log_pipeline_stage(stage: &str, event_count: usize, elapsed: Duration) {
    let duration_ms = elapsed.as_millis() as u64;
    info!(stage, event_count, duration_ms, "pipeline_stage_complete");
}

/// Log an LLM-assisted pair resolution.
#[inline]
pub fn log_llm_resolution(batch_id: &str, resolved: usize, cached: usize, cost_usd: f64) {
    info!(batch_id, resolved, cached, cost_usd, "llm_resolution_batch_complete");
}

/// Log an operator-driven review operation (split, merge, dismiss).
#[inline]
pub fn log_review_operation(action: &str, canonical_id: &str, operator: &str) {
    info!(action, canonical_id, operator, "review_operation_applied");
}

/// Log a review operation that failed, without leaking operator-supplied
/// free text (dismiss reasons, etc.) into the log line.
#[inline]
pub fn log_review_operation_failed(action: &str, canonical_id: &str, operator: &str, error_label: &str) {
    warn!(action, canonical_id, operator, error_label, "review_operation_failed");
}
