//! SQLite-backed `EventRepository` (§6: `source_events`, `event_dates`,
//! `file_ingestions`).

use std::sync::Arc;

use async_trait::async_trait;
use regiodedupe_core::ports::EventRepository;
use regiodedupe_domain::{DedupeError, Record, Result};
use rusqlite::params;

use super::manager::DbManager;
use super::mapping::{json_string_set, json_strings, load_dates_for, record_from_row, source_type_to_str};
use crate::errors::InfraError;

pub struct SqliteEventRepository {
    db: Arc<DbManager>,
}

impl SqliteEventRepository {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn ingest_file(&self, file_id: &str, records: Vec<Record>) -> Result<()> {
        let db = self.db.clone();
        let file_id = file_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(|e| InfraError::from(e).0)?;

            tx.execute(
                "INSERT OR IGNORE INTO file_ingestions (id, file_path, ingested_at, record_count) VALUES (?1, ?2, CAST(strftime('%s','now') AS TEXT), ?3)",
                params![file_id, file_id, records.len() as i64],
            )
            .map_err(|e| InfraError::from(e).0)?;

            for record in &records {
                let result = (|| -> Result<()> {
                    tx.execute(
                        "INSERT OR REPLACE INTO source_events (
                            id, file_id, source_code, source_type, title, title_normalized,
                            short_description, description, highlights_json,
                            location_name, location_city, location_city_normalized,
                            location_district, location_street, location_zipcode,
                            geo_latitude, geo_longitude, geo_confidence,
                            categories_json, is_family_event, is_child_focused, admission_free,
                            blocking_keys_json
                        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23)",
                        params![
                            record.id,
                            file_id,
                            record.source_code,
                            source_type_to_str(record.source_type),
                            record.title,
                            record.title_normalized,
                            record.short_description,
                            record.description,
                            json_strings(&record.highlights),
                            record.location_name,
                            record.location_city,
                            record.location_city_normalized,
                            record.location_district,
                            record.location_street,
                            record.location_zipcode,
                            record.geo.map(|g| g.latitude),
                            record.geo.map(|g| g.longitude),
                            record.geo.map(|g| g.confidence),
                            json_string_set(&record.categories),
                            record.is_family_event,
                            record.is_child_focused,
                            record.admission_free,
                            json_string_set(&record.blocking_keys),
                        ],
                    )
                    .map_err(|e| InfraError::from(e).0)?;

                    tx.execute("DELETE FROM event_dates WHERE source_event_id = ?1", params![record.id]).map_err(|e| InfraError::from(e).0)?;
                    for date in &record.dates {
                        tx.execute(
                            "INSERT INTO event_dates (source_event_id, date, start_time, end_time, end_date) VALUES (?1,?2,?3,?4,?5)",
                            params![
                                record.id,
                                date.date.format("%Y-%m-%d").to_string(),
                                date.start_time.map(|t| t.format("%H:%M:%S").to_string()),
                                date.end_time.map(|t| t.format("%H:%M:%S").to_string()),
                                date.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                            ],
                        )
                        .map_err(|e| InfraError::from(e).0)?;
                    }
                    Ok(())
                })();

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

    async fn load_all(&self) -> Result<Vec<Record>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare("SELECT * FROM source_events ORDER BY id").map_err(|e| InfraError::from(e).0)?;
            let ids_and_rows: Vec<Record> = stmt
                .query_map([], |row| {
                    let id: String = row.get("id")?;
                    Ok(id)
                })
                .map_err(|e| InfraError::from(e).0)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| InfraError::from(e).0)?
                .into_iter()
                .map(|id| load_one(&conn, &id))
                .collect::<Result<Vec<_>>>()?;
            Ok(ids_and_rows)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn load_by_id(&self, id: &str) -> Result<Option<Record>> {
        let db = self.db.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            match load_one(&conn, &id) {
                Ok(record) => Ok(Some(record)),
                Err(DedupeError::NotFound(_)) => Ok(None),
                Err(other) => Err(other),
            }
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}

pub(crate) fn load_one(conn: &rusqlite::Connection, id: &str) -> Result<Record> {
    let dates = load_dates_for(conn, id)?;
    conn.query_row("SELECT * FROM source_events WHERE id = ?1", params![id], |row| record_from_row(row, dates))
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DedupeError::NotFound(format!("source event not found: {id}")),
            other => InfraError::from(other).0,
        })
}
