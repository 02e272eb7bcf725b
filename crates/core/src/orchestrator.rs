//! §4.12 Full-pipeline orchestrator — wires candidate generation, scoring,
//! optional LLM resolution, clustering, and canonical synthesis into a
//! single run over a whole record set. Persistence is the caller's job:
//! this module returns the full set of decisions and canonicals for the
//! infra layer to write with `replace_all` (§5).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use regiodedupe_domain::{CanonicalEvent, CanonicalEventSource, Config, Decision, MatchDecision, Record, Result, Tier};

use crate::candidates::generate_candidates;
use crate::cluster::{cluster, Cluster};
use crate::llm::{resolve_ambiguous, CacheRepository, LlmResolverPort, UsageLogRepository};
use crate::scoring::score_pair;
use crate::scoring::weights::{combine as combine_weights, decide, resolve_weights};
use crate::synthesize::build_canonical;

/// One pass over the record set: score every candidate pair deterministically.
///
/// Returns decisions ordered the same way candidate generation returns pairs
/// (sorted `(event_id_a, event_id_b)`) so runs are reproducible.
#[must_use]
pub fn score_candidates(records: &[Record], config: &Config) -> Vec<MatchDecision> {
    let by_id: BTreeMap<&str, &Record> = records.iter().map(|r| (r.id.as_str(), r)).collect();
    let candidates = generate_candidates(records);

    candidates
        .pairs
        .into_iter()
        .filter_map(|(a_id, b_id)| {
            let a = *by_id.get(a_id.as_str())?;
            let b = *by_id.get(b_id.as_str())?;
            let scores = score_pair(a, b, config);
            let weights = resolve_weights(a, b, &config.category_weights, config.scoring.weights);
            let combined = combine_weights(&scores, &weights);
            let decision = decide(combined, &scores, &config.thresholds);
            Some(MatchDecision { event_id_a: a_id, event_id_b: b_id, scores, combined_score: combined, decision, tier: Tier::Deterministic })
        })
        .collect()
}

/// Resolve ambiguous decisions through the LLM resolver, if AI resolution
/// is enabled and an API key is configured. Returns `decisions` unchanged
/// otherwise.
pub async fn resolve_with_ai(
    decisions: Vec<MatchDecision>,
    records_by_id: &BTreeMap<String, Record>,
    config: &Config,
    batch_id: &str,
    llm: &dyn LlmResolverPort,
    cache: &dyn CacheRepository,
    usage_log: &dyn UsageLogRepository,
) -> Result<Vec<MatchDecision>> {
    if !config.ai.enabled || config.ai.api_key.is_none() {
        return Ok(decisions);
    }
    let mut resolved = resolve_ambiguous(decisions, records_by_id, &config.ai, batch_id, llm, cache, usage_log).await?;
    // `resolve_ambiguous` dispatches through `buffer_unordered`, so the
    // result comes back in completion order, not `(event_id_a,
    // event_id_b)` order. Restore it before callers persist the batch.
    resolved.sort_by(|a, b| (&a.event_id_a, &a.event_id_b).cmp(&(&b.event_id_a, &b.event_id_b)));
    Ok(resolved)
}

/// One synthesized canonical plus the source links it should have.
pub struct CanonicalWithSources {
    pub canonical: CanonicalEvent,
    pub sources: Vec<CanonicalEventSource>,
}

/// Build clusters from the resolved decisions and synthesize a canonical
/// for each, deriving `match_confidence` from the mean internal match
/// edge weight and `ai_assisted` from whether any internal edge was
/// resolved by the LLM.
pub fn build_canonicals(
    records: &[Record],
    decisions: &[MatchDecision],
    config: &Config,
    new_canonical_id: impl Fn(usize) -> String,
    now: DateTime<Utc>,
) -> Result<Vec<CanonicalWithSources>> {
    let records_by_id: BTreeMap<String, &Record> = records.iter().map(|r| (r.id.clone(), r)).collect();
    let all_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

    let result = cluster(&all_ids, decisions, &records_by_id, &config.cluster);

    result
        .clusters
        .into_iter()
        .enumerate()
        .map(|(index, c)| build_one(&c, &records_by_id, decisions, &new_canonical_id(index), now))
        .collect()
}

fn build_one(
    c: &Cluster,
    records_by_id: &BTreeMap<String, &Record>,
    decisions: &[MatchDecision],
    canonical_id: &str,
    now: DateTime<Utc>,
) -> Result<CanonicalWithSources> {
    let member_records: Vec<Record> = c.event_ids.iter().filter_map(|id| records_by_id.get(id)).map(|r| (*r).clone()).collect();

    let mut canonical = build_canonical(canonical_id.to_string(), &member_records, now)?;
    canonical.needs_review = c.needs_review;
    canonical.match_confidence = c.mean_internal_similarity;
    canonical.ai_assisted = internal_edges(c, decisions).any(|d| matches!(d.tier, Tier::Ai | Tier::AiLowConfidence));

    let sources = member_records
        .iter()
        .map(|r| CanonicalEventSource { canonical_id: canonical_id.to_string(), source_event_id: r.id.clone(), source_type: r.source_type })
        .collect();

    Ok(CanonicalWithSources { canonical, sources })
}

fn internal_edges<'a>(c: &'a Cluster, decisions: &'a [MatchDecision]) -> impl Iterator<Item = &'a MatchDecision> {
    let members: std::collections::BTreeSet<&str> = c.event_ids.iter().map(String::as_str).collect();
    decisions
        .iter()
        .filter(move |d| matches!(d.decision, Decision::Match) && members.contains(d.event_id_a.as_str()) && members.contains(d.event_id_b.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regiodedupe_domain::{DateRange, SourceType};

    fn record(id: &str, title: &str, day: &str) -> Record {
        Record {
            id: id.to_string(),
            source_code: format!("src-{id}"),
            source_type: SourceType::Article,
            title: title.to_string(),
            title_normalized: title.to_lowercase(),
            short_description: None,
            description: None,
            highlights: vec![],
            location_name: None,
            location_city: Some("Musterstadt".to_string()),
            location_city_normalized: Some("musterstadt".to_string()),
            location_district: None,
            location_street: None,
            location_zipcode: None,
            geo: None,
            categories: Default::default(),
            is_family_event: None,
            is_child_focused: None,
            admission_free: None,
            dates: vec![DateRange { date: chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(), start_time: None, end_time: None, end_date: None }],
            blocking_keys: Default::default(),
        }
    }

    #[test]
    fn score_candidates_is_deterministic_tier() {
        let config = Config::default();
        let records = vec![record("a", "Sommerfest im Park", "2026-08-01"), record("b", "Sommerfest im Park", "2026-08-01")];
        let decisions = score_candidates(&records, &config);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].tier, Tier::Deterministic);
    }

    #[test]
    fn build_canonicals_produces_one_per_cluster() {
        let config = Config::default();
        let records = vec![record("a", "Sommerfest im Park", "2026-08-01"), record("b", "Ganz anderes Event", "2026-08-01")];
        let decisions = score_candidates(&records, &config);
        let canonicals = build_canonicals(&records, &decisions, &config, |i| format!("canon-{i}"), Utc::now()).unwrap();
        assert_eq!(canonicals.len(), 2);
    }

    #[tokio::test]
    async fn resolve_with_ai_is_noop_when_disabled() {
        let config = Config::default();
        let decisions = vec![];
        let records_by_id = BTreeMap::new();
        struct Unreachable;
        #[async_trait::async_trait]
        impl LlmResolverPort for Unreachable {
            async fn resolve_pair(&self, _context: &crate::llm::LlmPairContext) -> Result<crate::llm::LlmResolution> {
                unreachable!()
            }
            fn model(&self) -> &str {
                "unreachable"
            }
        }
        #[async_trait::async_trait]
        impl CacheRepository for Unreachable {
            async fn get(&self, _pair_hash: &str) -> Result<Option<regiodedupe_domain::CacheEntry>> {
                unreachable!()
            }
            async fn put(&self, _entry: regiodedupe_domain::CacheEntry) -> Result<()> {
                unreachable!()
            }
        }
        #[async_trait::async_trait]
        impl UsageLogRepository for Unreachable {
            async fn append(&self, _row: regiodedupe_domain::UsageLogRow) -> Result<()> {
                unreachable!()
            }
        }
        let unreachable = Unreachable;
        let result = resolve_with_ai(decisions, &records_by_id, &config, "batch-1", &unreachable, &unreachable, &unreachable).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn resolve_with_ai_restores_id_order_despite_out_of_order_completion() {
        use std::time::Duration;

        use regiodedupe_domain::{CacheEntry, SignalScores, Tier, UsageLogRow};

        struct StaggeredLlm;
        #[async_trait::async_trait]
        impl LlmResolverPort for StaggeredLlm {
            async fn resolve_pair(&self, context: &crate::llm::LlmPairContext) -> Result<crate::llm::LlmResolution> {
                // The earlier-ordered pair ("a", "b") resolves slower than the
                // later-ordered pair ("c", "d"), so `buffer_unordered` yields
                // them completion-first, i.e. out of `(id_a, id_b)` order.
                if context.title_a == "title-a" {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                } else {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Ok(crate::llm::LlmResolution {
                    decision: Some(regiodedupe_domain::LlmVerdict::Same),
                    confidence: 0.99,
                    reasoning: "stub".to_string(),
                    tokens_in: 1,
                    tokens_out: 1,
                })
            }
            fn model(&self) -> &str {
                "stub-model"
            }
        }

        struct NoopCache;
        #[async_trait::async_trait]
        impl CacheRepository for NoopCache {
            async fn get(&self, _pair_hash: &str) -> Result<Option<CacheEntry>> {
                Ok(None)
            }
            async fn put(&self, _entry: CacheEntry) -> Result<()> {
                Ok(())
            }
        }

        struct NoopUsageLog;
        #[async_trait::async_trait]
        impl UsageLogRepository for NoopUsageLog {
            async fn append(&self, _row: UsageLogRow) -> Result<()> {
                Ok(())
            }
        }

        let mut config = Config::default();
        config.ai.enabled = true;
        config.ai.api_key = Some("test-key".to_string());
        config.ai.max_concurrent_requests = 4;

        let decisions = vec![
            MatchDecision {
                event_id_a: "a".to_string(),
                event_id_b: "b".to_string(),
                scores: SignalScores { date: 0.5, geo: 0.5, title: 0.5, description: 0.5 },
                combined_score: 0.5,
                decision: Decision::Ambiguous,
                tier: Tier::Deterministic,
            },
            MatchDecision {
                event_id_a: "c".to_string(),
                event_id_b: "d".to_string(),
                scores: SignalScores { date: 0.5, geo: 0.5, title: 0.5, description: 0.5 },
                combined_score: 0.5,
                decision: Decision::Ambiguous,
                tier: Tier::Deterministic,
            },
        ];
        let records_by_id = BTreeMap::from([
            ("a".to_string(), record("a", "title-a", "2026-08-01")),
            ("b".to_string(), record("b", "title-b", "2026-08-01")),
            ("c".to_string(), record("c", "title-c", "2026-08-01")),
            ("d".to_string(), record("d", "title-d", "2026-08-01")),
        ]);

        let llm = StaggeredLlm;
        let cache = NoopCache;
        let usage_log = NoopUsageLog;
        let result = resolve_with_ai(decisions, &records_by_id, &config, "batch-1", &llm, &cache, &usage_log).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!((result[0].event_id_a.as_str(), result[0].event_id_b.as_str()), ("a", "b"));
        assert_eq!((result[1].event_id_a.as_str(), result[1].event_id_b.as_str()), ("c", "d"));
    }
}
