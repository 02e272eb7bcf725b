//! SQLite-backed `MatchDecisionRepository` (§6: `match_decisions`).

use std::sync::Arc;

use async_trait::async_trait;
use regiodedupe_core::ports::MatchDecisionRepository;
use regiodedupe_domain::{Decision, DedupeError, MatchDecision, Result, SignalScores, Tier};
use rusqlite::{params, Row};

use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteMatchDecisionRepository {
    db: Arc<DbManager>,
}

impl SqliteMatchDecisionRepository {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn decision_to_str(decision: Decision) -> &'static str {
    match decision {
        Decision::Match => "match",
        Decision::NoMatch => "no_match",
        Decision::Ambiguous => "ambiguous",
    }
}

fn decision_from_str(raw: &str) -> Result<Decision> {
    match raw {
        "match" => Ok(Decision::Match),
        "no_match" => Ok(Decision::NoMatch),
        "ambiguous" => Ok(Decision::Ambiguous),
        other => Err(DedupeError::Database(format!("unknown decision: {other}"))),
    }
}

fn tier_to_str(tier: Tier) -> &'static str {
    match tier {
        Tier::Deterministic => "deterministic",
        Tier::Ai => "ai",
        Tier::AiLowConfidence => "ai_low_confidence",
        Tier::AiUnexpected => "ai_unexpected",
    }
}

fn tier_from_str(raw: &str) -> Result<Tier> {
    match raw {
        "deterministic" => Ok(Tier::Deterministic),
        "ai" => Ok(Tier::Ai),
        "ai_low_confidence" => Ok(Tier::AiLowConfidence),
        "ai_unexpected" => Ok(Tier::AiUnexpected),
        other => Err(DedupeError::Database(format!("unknown tier: {other}"))),
    }
}

fn decision_from_row(row: &Row) -> rusqlite::Result<MatchDecision> {
    let decision: String = row.get("decision")?;
    let tier: String = row.get("tier")?;
    Ok(MatchDecision {
        event_id_a: row.get("event_id_a")?,
        event_id_b: row.get("event_id_b")?,
        scores: SignalScores {
            date: row.get("score_date")?,
            geo: row.get("score_geo")?,
            title: row.get("score_title")?,
            description: row.get("score_description")?,
        },
        combined_score: row.get("combined_score")?,
        decision: decision_from_str(&decision).unwrap_or(Decision::Ambiguous),
        tier: tier_from_str(&tier).unwrap_or(Tier::Deterministic),
    })
}

#[async_trait]
impl MatchDecisionRepository for SqliteMatchDecisionRepository {
    async fn replace_all(&self, decisions: Vec<MatchDecision>) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(|e| InfraError::from(e).0)?;

            tx.execute("DELETE FROM match_decisions", []).map_err(|e| InfraError::from(e).0)?;

            for decision in &decisions {
                let result = tx
                    .execute(
                        "INSERT INTO match_decisions (
                            event_id_a, event_id_b, score_date, score_geo, score_title, score_description,
                            combined_score, decision, tier
                        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                        params![
                            decision.event_id_a,
                            decision.event_id_b,
                            decision.scores.date,
                            decision.scores.geo,
                            decision.scores.title,
                            decision.scores.description,
                            decision.combined_score,
                            decision_to_str(decision.decision),
                            tier_to_str(decision.tier),
                        ],
                    )
                    .map_err(|e| InfraError::from(e).0);

                if let Err(err) = result {
                    tx.rollback().map_err(|e| InfraError::from(e).0)?;
                    return Err(err);
                }
            }

            tx.commit().map_err(|e| InfraError::from(e).0)?;
            Ok(())
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn load_all(&self) -> Result<Vec<MatchDecision>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT * FROM match_decisions ORDER BY event_id_a, event_id_b")
                .map_err(|e| InfraError::from(e).0)?;
            stmt.query_map([], decision_from_row)
                .map_err(|e| InfraError::from(e).0)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| InfraError::from(e).0)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn decision(a: &str, b: &str) -> MatchDecision {
        MatchDecision {
            event_id_a: a.to_string(),
            event_id_b: b.to_string(),
            scores: SignalScores { date: 0.9, geo: 0.8, title: 0.85, description: 0.7 },
            combined_score: 0.83,
            decision: Decision::Match,
            tier: Tier::Deterministic,
        }
    }

    #[tokio::test]
    async fn replace_all_is_atomic_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(dir.path().join("test.db"), 2).unwrap());
        db.run_migrations().unwrap();
        let repo = SqliteMatchDecisionRepository::new(db);

        repo.replace_all(vec![decision("a", "b")]).await.unwrap();
        assert_eq!(repo.load_all().await.unwrap().len(), 1);

        repo.replace_all(vec![decision("a", "b"), decision("a", "c")]).await.unwrap();
        assert_eq!(repo.load_all().await.unwrap().len(), 2);
    }
}
