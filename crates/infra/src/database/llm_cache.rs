//! SQLite-backed `CacheRepository`/`UsageLogRepository` (§6: `ai_match_cache`,
//! `ai_usage_log`), with an in-memory read-through layer in front of the
//! cache table to avoid a database round trip on repeated hits within a run.

use std::sync::Arc;

use async_trait::async_trait;
use moka::sync::Cache;
use regiodedupe_core::llm::{CacheRepository, UsageLogRepository};
use regiodedupe_domain::{CacheEntry, DedupeError, LlmVerdict, Result, UsageLogRow};
use rusqlite::params;

use super::manager::DbManager;
use super::mapping::{parse_rfc3339, rfc3339};
use crate::errors::InfraError;

fn verdict_to_str(verdict: LlmVerdict) -> &'static str {
    match verdict {
        LlmVerdict::Same => "same",
        LlmVerdict::Different => "different",
    }
}

fn verdict_from_str(raw: &str) -> Result<LlmVerdict> {
    match raw {
        "same" => Ok(LlmVerdict::Same),
        "different" => Ok(LlmVerdict::Different),
        other => Err(DedupeError::Database(format!("unknown llm verdict: {other}"))),
    }
}

/// SQLite-backed cache with a bounded in-memory read-through layer.
pub struct SqliteCacheRepository {
    db: Arc<DbManager>,
    memo: Cache<String, CacheEntry>,
}

impl SqliteCacheRepository {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db, memo: Cache::new(10_000) }
    }
}

#[async_trait]
impl CacheRepository for SqliteCacheRepository {
    async fn get(&self, pair_hash: &str) -> Result<Option<CacheEntry>> {
        if let Some(entry) = self.memo.get(pair_hash) {
            return Ok(Some(entry));
        }

        let db = self.db.clone();
        let key = pair_hash.to_string();
        let loaded = tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            match conn.query_row(
                "SELECT pair_hash, decision, confidence, reasoning, model, created_at FROM ai_match_cache WHERE pair_hash = ?1",
                params![key],
                |row| {
                    let decision: String = row.get(1)?;
                    let created_at: String = row.get(5)?;
                    Ok((row.get::<_, String>(0)?, decision, row.get::<_, f64>(2)?, row.get::<_, String>(3)?, row.get::<_, String>(4)?, created_at))
                },
            ) {
                Ok((pair_hash, decision, confidence, reasoning, model, created_at)) => Ok(Some((pair_hash, decision, confidence, reasoning, model, created_at))),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(other) => Err(InfraError::from(other).0),
            }
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))??;

        let Some((pair_hash, decision, confidence, reasoning, model, created_at)) = loaded else {
            return Ok(None);
        };

        let entry = CacheEntry { pair_hash, decision: verdict_from_str(&decision)?, confidence, reasoning, model, created_at: parse_rfc3339(&created_at)? };
        self.memo.insert(entry.pair_hash.clone(), entry.clone());
        Ok(Some(entry))
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        self.memo.insert(entry.pair_hash.clone(), entry.clone());

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR IGNORE INTO ai_match_cache (pair_hash, decision, confidence, reasoning, model, created_at) VALUES (?1,?2,?3,?4,?5,?6)",
                params![entry.pair_hash, verdict_to_str(entry.decision), entry.confidence, entry.reasoning, entry.model, rfc3339(entry.created_at)],
            )
            .map_err(|e| InfraError::from(e).0)?;
            Ok(())
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}

pub struct SqliteUsageLogRepository {
    db: Arc<DbManager>,
}

impl SqliteUsageLogRepository {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageLogRepository for SqliteUsageLogRepository {
    async fn append(&self, row: UsageLogRow) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO ai_usage_log (id, batch_id, pair_hash, tokens_in, tokens_out, cost_usd, was_cached, created_at) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![row.id, row.batch_id, row.pair_hash, row.tokens_in, row.tokens_out, row.cost_usd, row.was_cached, rfc3339(row.created_at)],
            )
            .map_err(|e| InfraError::from(e).0)?;
            Ok(())
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}
