//! SQLite-backed `GroundTruthRepository` (§6: `ground_truth_pairs`, §4.13).

use std::sync::Arc;

use async_trait::async_trait;
use regiodedupe_core::ports::GroundTruthRepository;
use regiodedupe_domain::{DedupeError, GroundTruthLabel, GroundTruthPair, Result};

use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteGroundTruthRepository {
    db: Arc<DbManager>,
}

impl SqliteGroundTruthRepository {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn label_from_str(raw: &str) -> Result<GroundTruthLabel> {
    match raw {
        "same" => Ok(GroundTruthLabel::Same),
        "different" => Ok(GroundTruthLabel::Different),
        "ambiguous" => Ok(GroundTruthLabel::Ambiguous),
        other => Err(DedupeError::Database(format!("unknown ground truth label: {other}"))),
    }
}

#[async_trait]
impl GroundTruthRepository for SqliteGroundTruthRepository {
    async fn load_all(&self) -> Result<Vec<GroundTruthPair>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT event_id_a, event_id_b, label FROM ground_truth_pairs ORDER BY event_id_a, event_id_b")
                .map_err(|e| InfraError::from(e).0)?;
            let rows = stmt
                .query_map([], |row| {
                    let label: String = row.get(2)?;
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, label))
                })
                .map_err(|e| InfraError::from(e).0)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| InfraError::from(e).0)?;

            rows.into_iter()
                .map(|(event_id_a, event_id_b, label)| Ok(GroundTruthPair { event_id_a, event_id_b, label: label_from_str(&label)? }))
                .collect()
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn load_all_parses_labels() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(dir.path().join("test.db"), 2).unwrap());
        db.run_migrations().unwrap();
        {
            let conn = db.get_connection().unwrap();
            conn.execute("INSERT INTO ground_truth_pairs (event_id_a, event_id_b, label) VALUES ('a','b','same')", []).unwrap();
        }
        let repo = SqliteGroundTruthRepository::new(db);
        let pairs = repo.load_all().await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].label, GroundTruthLabel::Same);
    }
}
