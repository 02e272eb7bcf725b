//! Command handlers. One function per subcommand; `dispatch` routes a
//! parsed [`crate::Commands`] to its handler.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use regiodedupe_domain::{DedupeError, Record, Result};

use crate::context::AppContext;
use crate::Commands;

/// Route a parsed subcommand to its handler.
pub async fn dispatch(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::ProcessNewFile { path, file_id } => process_new_file(ctx, &path, file_id).await,
        Commands::ProcessAll => process_all(ctx).await,
        Commands::Split { canonical_id, source_id, target_canonical_id, operator } => {
            split(ctx, &canonical_id, &source_id, target_canonical_id.as_deref(), &operator).await
        }
        Commands::Merge { source_canonical_id, target_canonical_id, operator } => merge(ctx, &source_canonical_id, &target_canonical_id, &operator).await,
        Commands::Dismiss { canonical_id, reason, operator } => dismiss(ctx, &canonical_id, reason.as_deref(), &operator).await,
        Commands::Evaluate { category } => evaluate(ctx, category.as_deref()).await,
    }
}

/// Ingest one JSON file of records, then re-run the full pipeline (§4.12)
/// over every stored record.
async fn process_new_file(ctx: &AppContext, path: &Path, file_id: Option<String>) -> Result<()> {
    let contents = std::fs::read_to_string(path).map_err(|e| DedupeError::InvalidInput(format!("failed to read {}: {e}", path.display())))?;
    let records: Vec<Record> = serde_json::from_str(&contents).map_err(|e| DedupeError::InvalidInput(format!("malformed record file {}: {e}", path.display())))?;

    let file_id = file_id.unwrap_or_else(|| path.display().to_string());
    let record_count = records.len();
    ctx.events.ingest_file(&file_id, records).await?;
    tracing::info!(file_id, record_count, "ingested file");

    run_pipeline(ctx).await
}

/// Re-run the full pipeline over every record currently stored.
async fn process_all(ctx: &AppContext) -> Result<()> {
    run_pipeline(ctx).await
}

async fn run_pipeline(ctx: &AppContext) -> Result<()> {
    let started = std::time::Instant::now();
    let records = ctx.events.load_all().await?;
    let record_count = records.len();

    let decisions = regiodedupe_core::score_candidates(&records, &ctx.config);

    let batch_id = uuid::Uuid::new_v4().to_string();
    let decisions = if let Some(llm) = &ctx.llm {
        let records_by_id: BTreeMap<String, Record> = records.iter().map(|r| (r.id.clone(), r.clone())).collect();
        let resolved =
            regiodedupe_core::resolve_with_ai(decisions, &records_by_id, &ctx.config, &batch_id, llm.as_ref(), ctx.cache.as_ref(), ctx.usage_log.as_ref())
                .await?;
        regiodedupe_infra::logging::log_llm_resolution(&batch_id, resolved.len(), 0, 0.0);
        resolved
    } else {
        decisions
    };

    ctx.decisions.replace_all(decisions.clone()).await?;

    let now = Utc::now();
    let built = regiodedupe_core::build_canonicals(&records, &decisions, &ctx.config, |index| format!("canon-{batch_id}-{index}"), now)?;

    let mut canonicals = Vec::with_capacity(built.len());
    let mut sources = Vec::new();
    for item in built {
        sources.extend(item.sources);
        canonicals.push(item.canonical);
    }
    let canonical_count = canonicals.len();

    ctx.canonicals.replace_all(canonicals, sources).await?;

    regiodedupe_infra::logging::log_pipeline_stage("full_pipeline", record_count, started.elapsed());
    tracing::info!(record_count, decision_count = decisions.len(), canonical_count, "pipeline run complete");
    Ok(())
}

async fn split(ctx: &AppContext, canonical_id: &str, source_id: &str, target_canonical_id: Option<&str>, operator: &str) -> Result<()> {
    let now = Utc::now();
    match ctx.review.split(canonical_id, source_id, target_canonical_id, operator, now).await {
        Ok(outcome) => {
            regiodedupe_infra::logging::log_review_operation("split", canonical_id, operator);
            tracing::info!(
                canonical_id,
                source_id,
                target = %outcome.target.id,
                target_is_new = outcome.target_is_new,
                origin_deleted = outcome.origin_deleted,
                "split applied"
            );
            Ok(())
        }
        Err(err) => {
            regiodedupe_infra::logging::log_review_operation_failed("split", canonical_id, operator, regiodedupe_infra::error_label(&err));
            Err(err)
        }
    }
}

async fn merge(ctx: &AppContext, source_canonical_id: &str, target_canonical_id: &str, operator: &str) -> Result<()> {
    let now = Utc::now();
    match ctx.review.merge(source_canonical_id, target_canonical_id, operator, now).await {
        Ok(outcome) => {
            regiodedupe_infra::logging::log_review_operation("merge", target_canonical_id, operator);
            tracing::info!(source_canonical_id, target_canonical_id, source_count = outcome.target_updated.source_count, "merge applied");
            Ok(())
        }
        Err(err) => {
            regiodedupe_infra::logging::log_review_operation_failed("merge", target_canonical_id, operator, regiodedupe_infra::error_label(&err));
            Err(err)
        }
    }
}

async fn dismiss(ctx: &AppContext, canonical_id: &str, reason: Option<&str>, operator: &str) -> Result<()> {
    let now = Utc::now();
    match ctx.review.dismiss(canonical_id, reason, operator, now).await {
        Ok(outcome) => {
            regiodedupe_infra::logging::log_review_operation("dismiss", canonical_id, operator);
            tracing::info!(canonical_id, match_confidence = ?outcome.updated.match_confidence, "dismiss applied");
            Ok(())
        }
        Err(err) => {
            regiodedupe_infra::logging::log_review_operation_failed("dismiss", canonical_id, operator, regiodedupe_infra::error_label(&err));
            Err(err)
        }
    }
}

/// Compute precision/recall/F1 against the stored ground-truth set
/// (§4.13), optionally filtered to pairs touching `category`.
async fn evaluate(ctx: &AppContext, category: Option<&str>) -> Result<()> {
    let decisions = ctx.decisions.load_all().await?;
    let ground_truth = ctx.ground_truth.load_all().await?;

    let metrics = if let Some(category) = category {
        let records = ctx.events.load_all().await?;
        let records_by_id: BTreeMap<String, Record> = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        let filtered: Vec<_> = regiodedupe_core::filter_by_category(&ground_truth, &records_by_id, category).into_iter().cloned().collect();
        regiodedupe_core::evaluate(&decisions, &filtered)
    } else {
        regiodedupe_core::evaluate(&decisions, &ground_truth)
    };

    #[allow(clippy::print_stdout)]
    {
        println!(
            "precision={:.4} recall={:.4} f1={:.4} tp={} fp={} fn={}",
            metrics.precision, metrics.recall, metrics.f1, metrics.true_positives, metrics.false_positives, metrics.false_negatives
        );
    }
    Ok(())
}
