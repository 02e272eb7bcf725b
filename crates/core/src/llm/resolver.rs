//! §4.7 LLM Resolver + Cache + Cost Ledger — resolves `ambiguous`
//! decisions through an external structured-output LLM, bounded by a
//! configured concurrency limit, with a content-addressed cache and a
//! per-call usage/cost ledger.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use regiodedupe_domain::{
    AiConfig, CacheEntry, Decision, LlmVerdict, MatchDecision, Record, Result, Tier, UsageLogRow,
};

use super::hash::pair_hash;
use super::ports::{CacheRepository, LlmPairContext, LlmResolverPort, UsageLogRepository};

/// Resolve every `ambiguous` decision in `decisions` through the LLM
/// resolver, returning the full decision set with ambiguous entries
/// replaced in place where the resolver produced a confident verdict.
/// Non-ambiguous decisions pass through untouched.
pub async fn resolve_ambiguous(
    decisions: Vec<MatchDecision>,
    records_by_id: &BTreeMap<String, Record>,
    ai: &AiConfig,
    batch_id: &str,
    llm: &dyn LlmResolverPort,
    cache: &dyn CacheRepository,
    usage_log: &dyn UsageLogRepository,
) -> Result<Vec<MatchDecision>> {
    let concurrency = ai.max_concurrent_requests.max(1);

    let resolved = stream::iter(decisions.into_iter().map(|decision| {
        let batch_id = batch_id.to_string();
        async move {
            if decision.decision != Decision::Ambiguous {
                return decision;
            }
            let Some(record_a) = records_by_id.get(&decision.event_id_a) else {
                return decision;
            };
            let Some(record_b) = records_by_id.get(&decision.event_id_b) else {
                return decision;
            };

            resolve_one(decision, record_a, record_b, ai, &batch_id, llm, cache, usage_log)
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "llm resolution failed, leaving decision ambiguous");
                    err.into_inner()
                })
        }
    }))
    .buffer_unordered(concurrency)
    .collect::<Vec<_>>()
    .await;

    Ok(resolved)
}

/// Wraps a fail-open error so the caller can recover the untouched
/// decision without the resolver loop itself returning `Result`.
struct FailOpen {
    decision: MatchDecision,
    message: String,
}

impl std::fmt::Display for FailOpen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl FailOpen {
    fn into_inner(self) -> MatchDecision {
        self.decision
    }
}

async fn resolve_one(
    decision: MatchDecision,
    record_a: &Record,
    record_b: &Record,
    ai: &AiConfig,
    batch_id: &str,
    llm: &dyn LlmResolverPort,
    cache: &dyn CacheRepository,
    usage_log: &dyn UsageLogRepository,
) -> std::result::Result<MatchDecision, FailOpen> {
    let hash = pair_hash(record_a, record_b);

    if ai.cache_enabled {
        if let Ok(Some(entry)) = cache.get(&hash).await {
            if entry.model == llm.model() {
                debug!(pair_hash = %hash, "llm cache hit");
                let _ = usage_log
                    .append(UsageLogRow {
                        id: Uuid::new_v4().to_string(),
                        batch_id: batch_id.to_string(),
                        pair_hash: hash.clone(),
                        tokens_in: 0,
                        tokens_out: 0,
                        cost_usd: 0.0,
                        was_cached: true,
                        created_at: chrono::Utc::now(),
                    })
                    .await;
                return Ok(apply_verdict(decision, Some(entry.decision), entry.confidence, ai));
            }
        }
    }

    let context = build_context(record_a, record_b);
    let resolution = llm.resolve_pair(&context).await.map_err(|err| FailOpen {
        decision: decision.clone(),
        message: err.to_string(),
    })?;

    let cost_usd = (f64::from(resolution.tokens_in) * ai.cost_per_1m_input_tokens
        + f64::from(resolution.tokens_out) * ai.cost_per_1m_output_tokens)
        / 1_000_000.0;

    if let Some(verdict) = resolution.decision {
        let _ = cache
            .put(CacheEntry {
                pair_hash: hash.clone(),
                decision: verdict,
                confidence: resolution.confidence,
                reasoning: resolution.reasoning.clone(),
                model: llm.model().to_string(),
                created_at: chrono::Utc::now(),
            })
            .await;
    }

    let _ = usage_log
        .append(UsageLogRow {
            id: Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            pair_hash: hash,
            tokens_in: resolution.tokens_in,
            tokens_out: resolution.tokens_out,
            cost_usd,
            was_cached: false,
            created_at: chrono::Utc::now(),
        })
        .await;

    Ok(apply_verdict(decision, resolution.decision, resolution.confidence, ai))
}

fn apply_verdict(mut decision: MatchDecision, verdict: Option<LlmVerdict>, confidence: f64, ai: &AiConfig) -> MatchDecision {
    let Some(verdict) = verdict else {
        decision.tier = Tier::AiUnexpected;
        return decision;
    };
    if confidence < ai.confidence_threshold {
        decision.tier = Tier::AiLowConfidence;
        return decision;
    }
    match verdict {
        LlmVerdict::Same => {
            decision.decision = Decision::Match;
            decision.tier = Tier::Ai;
        }
        LlmVerdict::Different => {
            decision.decision = Decision::NoMatch;
            decision.tier = Tier::Ai;
        }
    }
    decision
}

fn build_context(a: &Record, b: &Record) -> LlmPairContext {
    LlmPairContext {
        title_a: a.title.clone(),
        title_b: b.title.clone(),
        description_a: a.description.clone().or_else(|| a.short_description.clone()),
        description_b: b.description.clone().or_else(|| b.short_description.clone()),
        city: a.location_city.clone().or_else(|| b.location_city.clone()),
        dates_a: a.expanded_days().iter().map(ToString::to_string).collect(),
        dates_b: b.expanded_days().iter().map(ToString::to_string).collect(),
    }
}
