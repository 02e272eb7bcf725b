//! Wraps the pure review planners (`regiodedupe_core::review`) in a single
//! database transaction each, so a split/merge/dismiss is all-or-nothing
//! (§5, §7) — grounded in the teacher's batch-snapshot transaction pattern:
//! one `BEGIN`, apply every write, roll back on the first error, `COMMIT`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regiodedupe_core::review::{self, DismissOutcome, MergeOutcome, SplitOutcome};
use regiodedupe_domain::{CanonicalEvent, DedupeError, Record, Result, SourceType};
use rusqlite::{params, Connection};

use super::audit::action_to_str;
use super::canonical::{canonical_from_row, upsert_one};
use super::events::load_one as load_record_row;
use super::manager::DbManager;
use super::mapping::rfc3339;
use crate::errors::InfraError;

pub struct SqliteReviewService {
    db: Arc<DbManager>,
}

impl SqliteReviewService {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Detach `source_id` from `origin_canonical_id`, re-synthesizing the
    /// origin (or deleting it if it has no records left) and attaching the
    /// source onto `target_canonical_id` — or a brand-new singleton
    /// canonical, if none is given.
    pub async fn split(
        &self,
        origin_canonical_id: &str,
        source_id: &str,
        target_canonical_id: Option<&str>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<SplitOutcome> {
        let db = self.db.clone();
        let origin_canonical_id = origin_canonical_id.to_string();
        let source_id = source_id.to_string();
        let target_canonical_id = target_canonical_id.map(str::to_string);
        let operator = operator.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(|e| InfraError::from(e).0)?;

            let result = (|| -> Result<SplitOutcome> {
                let origin = load_canonical(&tx, &origin_canonical_id)?
                    .ok_or_else(|| DedupeError::NotFound(format!("canonical not found: {origin_canonical_id}")))?;

                if !link_exists(&tx, &origin_canonical_id, &source_id)? {
                    return Err(DedupeError::NotFound(format!("source {source_id} is not linked to canonical {origin_canonical_id}")));
                }

                let detached = load_record_opt(&tx, &source_id)?.ok_or_else(|| DedupeError::NotFound(format!("source event not found: {source_id}")))?;

                let origin_remaining_records = linked_records(&tx, &origin_canonical_id, Some(&source_id))?;

                let target_link_already_present = match &target_canonical_id {
                    Some(target_id) => link_exists(&tx, target_id, &source_id)?,
                    None => false,
                };

                let target_canonical_loaded = match &target_canonical_id {
                    Some(target_id) => {
                        Some(load_canonical(&tx, target_id)?.ok_or_else(|| DedupeError::NotFound(format!("canonical not found: {target_id}")))?)
                    }
                    None => None,
                };

                let mut target_records = Vec::new();
                if let Some(target_id) = &target_canonical_id {
                    target_records = linked_records(&tx, target_id, None)?;
                    if !target_link_already_present {
                        target_records.push(detached.clone());
                    }
                }

                let existing_target = target_canonical_loaded.as_ref().map(|c| (c, target_records.as_slice()));

                let outcome = review::plan_split(
                    &origin,
                    &origin_remaining_records,
                    &detached,
                    existing_target,
                    target_link_already_present,
                    || uuid::Uuid::new_v4().to_string(),
                    &operator,
                    now,
                )?;

                unlink(&tx, &origin_canonical_id, &source_id)?;
                if outcome.origin_deleted {
                    delete_canonical(&tx, &origin_canonical_id)?;
                } else if let Some(updated) = &outcome.origin_updated {
                    upsert_one(&tx, updated)?;
                }

                upsert_one(&tx, &outcome.target)?;
                if outcome.target_is_new || !outcome.target_link_already_present {
                    link(&tx, &outcome.target.id, &source_id, detached.source_type)?;
                }

                append_audit(&tx, &outcome.audit)?;
                Ok(outcome)
            })();

            finish(tx, result)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    /// Merge `source_canonical_id` into `target_canonical_id`: all of
    /// `source`'s source-event links move onto `target` (skipping any
    /// already present) and `source` is deleted.
    pub async fn merge(&self, source_canonical_id: &str, target_canonical_id: &str, operator: &str, now: DateTime<Utc>) -> Result<MergeOutcome> {
        let db = self.db.clone();
        let source_canonical_id = source_canonical_id.to_string();
        let target_canonical_id = target_canonical_id.to_string();
        let operator = operator.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(|e| InfraError::from(e).0)?;

            let result = (|| -> Result<MergeOutcome> {
                let source = load_canonical(&tx, &source_canonical_id)?
                    .ok_or_else(|| DedupeError::NotFound(format!("canonical not found: {source_canonical_id}")))?;
                let target = load_canonical(&tx, &target_canonical_id)?
                    .ok_or_else(|| DedupeError::NotFound(format!("canonical not found: {target_canonical_id}")))?;

                let mut merged_records = linked_records(&tx, &target_canonical_id, None)?;
                let target_source_ids = linked_source_ids(&tx, &target_canonical_id)?;
                for record in linked_records(&tx, &source_canonical_id, None)? {
                    if !target_source_ids.contains(&record.id) {
                        merged_records.push(record);
                    }
                }

                let outcome = review::merge(&source, &target, &merged_records, &operator, now)?;

                upsert_one(&tx, &outcome.target_updated)?;
                for source_event_id in linked_source_ids(&tx, &source_canonical_id)? {
                    if !target_source_ids.contains(&source_event_id) {
                        let source_type = record_source_type(&tx, &source_event_id)?;
                        link(&tx, &target_canonical_id, &source_event_id, source_type)?;
                    }
                }
                delete_canonical(&tx, &outcome.deleted_source_id)?;
                append_audit(&tx, &outcome.audit)?;
                Ok(outcome)
            })();

            finish(tx, result)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    /// Clear `canonical_id`'s `needs_review` flag, floor a low
    /// `match_confidence`, and record the dismissal.
    pub async fn dismiss(&self, canonical_id: &str, reason: Option<&str>, operator: &str, now: DateTime<Utc>) -> Result<DismissOutcome> {
        let db = self.db.clone();
        let canonical_id = canonical_id.to_string();
        let reason = reason.map(str::to_string);
        let operator = operator.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(|e| InfraError::from(e).0)?;

            let result = (|| -> Result<DismissOutcome> {
                let canonical =
                    load_canonical(&tx, &canonical_id)?.ok_or_else(|| DedupeError::NotFound(format!("canonical not found: {canonical_id}")))?;
                let outcome = review::dismiss(&canonical, reason.as_deref(), &operator, now)?;
                upsert_one(&tx, &outcome.updated)?;
                append_audit(&tx, &outcome.audit)?;
                Ok(outcome)
            })();

            finish(tx, result)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}

fn finish<T>(tx: rusqlite::Transaction<'_>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().map_err(|e| InfraError::from(e).0)?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().map_err(|e| InfraError::from(e).0)?;
            Err(err)
        }
    }
}

fn load_canonical(conn: &Connection, canonical_id: &str) -> Result<Option<CanonicalEvent>> {
    match conn.query_row("SELECT * FROM canonical_events WHERE id = ?1", params![canonical_id], canonical_from_row) {
        Ok(canonical) => Ok(Some(canonical)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(other) => Err(InfraError::from(other).0),
    }
}

fn load_record_opt(conn: &Connection, id: &str) -> Result<Option<Record>> {
    match load_record_row(conn, id) {
        Ok(record) => Ok(Some(record)),
        Err(DedupeError::NotFound(_)) => Ok(None),
        Err(other) => Err(other),
    }
}

fn link_exists(conn: &Connection, canonical_id: &str, source_event_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM canonical_event_sources WHERE canonical_id = ?1 AND source_event_id = ?2",
        params![canonical_id, source_event_id],
        |_| Ok(()),
    )
    .map(|()| true)
    .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(false) } else { Err(InfraError::from(e).0) })
}

fn linked_source_ids(conn: &Connection, canonical_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT source_event_id FROM canonical_event_sources WHERE canonical_id = ?1 ORDER BY source_event_id")
        .map_err(|e| InfraError::from(e).0)?;
    stmt.query_map(params![canonical_id], |row| row.get(0))
        .map_err(|e| InfraError::from(e).0)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| InfraError::from(e).0)
}

/// Records currently linked to `canonical_id`, optionally excluding one id
/// (the source being detached mid-split).
fn linked_records(conn: &Connection, canonical_id: &str, exclude: Option<&str>) -> Result<Vec<Record>> {
    linked_source_ids(conn, canonical_id)?
        .into_iter()
        .filter(|id| exclude != Some(id.as_str()))
        .map(|id| load_record_row(conn, &id))
        .collect()
}

fn record_source_type(conn: &Connection, source_event_id: &str) -> Result<SourceType> {
    Ok(load_record_row(conn, source_event_id)?.source_type)
}

fn unlink(conn: &Connection, canonical_id: &str, source_event_id: &str) -> Result<()> {
    conn.execute("DELETE FROM canonical_event_sources WHERE canonical_id = ?1 AND source_event_id = ?2", params![canonical_id, source_event_id])
        .map_err(|e| InfraError::from(e).0)?;
    Ok(())
}

fn link(conn: &Connection, canonical_id: &str, source_event_id: &str, source_type: SourceType) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO canonical_event_sources (canonical_id, source_event_id, source_type) VALUES (?1,?2,?3)",
        params![canonical_id, source_event_id, super::mapping::source_type_to_str(source_type)],
    )
    .map_err(|e| InfraError::from(e).0)?;
    Ok(())
}

fn delete_canonical(conn: &Connection, canonical_id: &str) -> Result<()> {
    conn.execute("DELETE FROM canonical_events WHERE id = ?1", params![canonical_id]).map_err(|e| InfraError::from(e).0)?;
    Ok(())
}

fn append_audit(conn: &Connection, audit: &regiodedupe_domain::AuditRecord) -> Result<()> {
    let details_json =
        serde_json::to_string(&audit.details).map_err(|e| DedupeError::Internal(format!("audit details not serializable: {e}")))?;
    conn.execute(
        "INSERT INTO audit_log (id, action, canonical_id, source_id, operator, details_json, created_at) VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![audit.id, action_to_str(audit.action), audit.canonical_id, audit.source_id, audit.operator, details_json, rfc3339(audit.created_at)],
    )
    .map_err(|e| InfraError::from(e).0)?;
    Ok(())
}
