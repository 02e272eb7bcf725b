//! SQLite-backed `AuditLogRepository` (§6: `audit_log`).

use std::sync::Arc;

use async_trait::async_trait;
use regiodedupe_core::ports::AuditLogRepository;
use regiodedupe_domain::{AuditAction, AuditRecord, DedupeError, Result};
use rusqlite::params;

use super::manager::DbManager;
use super::mapping::rfc3339;
use crate::errors::InfraError;

pub struct SqliteAuditLogRepository {
    db: Arc<DbManager>,
}

impl SqliteAuditLogRepository {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

pub(crate) fn action_to_str(action: AuditAction) -> &'static str {
    match action {
        AuditAction::Split => "split",
        AuditAction::Merge => "merge",
        AuditAction::Override => "override",
        AuditAction::ReviewApprove => "review_approve",
        AuditAction::ReviewDismiss => "review_dismiss",
    }
}

#[async_trait]
impl AuditLogRepository for SqliteAuditLogRepository {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let details_json = serde_json::to_string(&record.details).map_err(|e| DedupeError::Internal(format!("audit details not serializable: {e}")))?;
            conn.execute(
                "INSERT INTO audit_log (id, action, canonical_id, source_id, operator, details_json, created_at) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    record.id,
                    action_to_str(record.action),
                    record.canonical_id,
                    record.source_id,
                    record.operator,
                    details_json,
                    rfc3339(record.created_at),
                ],
            )
            .map_err(|e| InfraError::from(e).0)?;
            Ok(())
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn append_persists_audit_row() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(dir.path().join("test.db"), 2).unwrap());
        db.run_migrations().unwrap();
        let repo = SqliteAuditLogRepository::new(db.clone());

        repo.append(AuditRecord {
            id: "audit-1".to_string(),
            action: AuditAction::ReviewDismiss,
            canonical_id: Some("c1".to_string()),
            source_id: None,
            operator: "operator".to_string(),
            details: BTreeMap::new(),
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

        let conn = db.get_connection().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
