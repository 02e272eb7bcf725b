//! SQLite-backed `CanonicalEventRepository` (§6: `canonical_events`,
//! `canonical_event_sources`).

use std::sync::Arc;

use async_trait::async_trait;
use regiodedupe_core::ports::CanonicalEventRepository;
use regiodedupe_domain::{CanonicalEvent, CanonicalEventSource, DedupeError, Result};
use rusqlite::{params, Row};

use super::manager::DbManager;
use super::mapping::{
    dates_from_json, dates_to_json, field_provenance_from_json, field_provenance_to_json, json_string_set, json_strings,
    parse_json_string_set, parse_json_strings, parse_rfc3339, rfc3339, source_type_from_str, source_type_to_str,
};
use crate::errors::InfraError;

pub struct SqliteCanonicalEventRepository {
    db: Arc<DbManager>,
}

impl SqliteCanonicalEventRepository {
    #[must_use]
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

pub(crate) fn canonical_from_row(row: &Row) -> rusqlite::Result<CanonicalEvent> {
    let highlights_json: String = row.get("highlights_json")?;
    let categories_json: String = row.get("categories_json")?;
    let dates_json: String = row.get("dates_json")?;
    let provenance_json: String = row.get("field_provenance_json")?;
    let geo_latitude: Option<f64> = row.get("geo_latitude")?;
    let geo_longitude: Option<f64> = row.get("geo_longitude")?;
    let geo_confidence: Option<f64> = row.get("geo_confidence")?;
    let first_date: Option<String> = row.get("first_date")?;
    let last_date: Option<String> = row.get("last_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let version: i64 = row.get("version")?;
    let source_count: i64 = row.get("source_count")?;

    Ok(CanonicalEvent {
        id: row.get("id")?,
        title: row.get("title")?,
        short_description: row.get("short_description")?,
        description: row.get("description")?,
        highlights: parse_json_strings(&highlights_json).unwrap_or_default(),
        location_name: row.get("location_name")?,
        location_city: row.get("location_city")?,
        location_district: row.get("location_district")?,
        location_street: row.get("location_street")?,
        location_zipcode: row.get("location_zipcode")?,
        geo: match (geo_latitude, geo_longitude, geo_confidence) {
            (Some(latitude), Some(longitude), Some(confidence)) => {
                Some(regiodedupe_domain::GeoPoint { latitude, longitude, confidence })
            }
            _ => None,
        },
        categories: parse_json_string_set(&categories_json).unwrap_or_default(),
        is_family_event: row.get("is_family_event")?,
        is_child_focused: row.get("is_child_focused")?,
        admission_free: row.get("admission_free")?,
        dates: dates_from_json(&dates_json).unwrap_or_default(),
        source_count: source_count as usize,
        match_confidence: row.get("match_confidence")?,
        needs_review: row.get("needs_review")?,
        ai_assisted: row.get("ai_assisted")?,
        first_date: first_date.as_deref().map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")).transpose().unwrap_or(None),
        last_date: last_date.as_deref().map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")).transpose().unwrap_or(None),
        field_provenance: field_provenance_from_json(&provenance_json).unwrap_or_default(),
        version: version as u32,
        created_at: parse_rfc3339(&created_at).unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: parse_rfc3339(&updated_at).unwrap_or_else(|_| chrono::Utc::now()),
    })
}

pub(crate) fn upsert_one(conn: &rusqlite::Connection, canonical: &CanonicalEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO canonical_events (
            id, title, short_description, description, highlights_json,
            location_name, location_city, location_district, location_street, location_zipcode,
            geo_latitude, geo_longitude, geo_confidence,
            categories_json, is_family_event, is_child_focused, admission_free,
            dates_json, source_count, match_confidence, needs_review, ai_assisted,
            first_date, last_date, field_provenance_json, version, created_at, updated_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26,?27,?28)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title, short_description = excluded.short_description, description = excluded.description,
            highlights_json = excluded.highlights_json, location_name = excluded.location_name,
            location_city = excluded.location_city, location_district = excluded.location_district,
            location_street = excluded.location_street, location_zipcode = excluded.location_zipcode,
            geo_latitude = excluded.geo_latitude, geo_longitude = excluded.geo_longitude, geo_confidence = excluded.geo_confidence,
            categories_json = excluded.categories_json, is_family_event = excluded.is_family_event,
            is_child_focused = excluded.is_child_focused, admission_free = excluded.admission_free,
            dates_json = excluded.dates_json, source_count = excluded.source_count, match_confidence = excluded.match_confidence,
            needs_review = excluded.needs_review, ai_assisted = excluded.ai_assisted,
            first_date = excluded.first_date, last_date = excluded.last_date,
            field_provenance_json = excluded.field_provenance_json, version = excluded.version, updated_at = excluded.updated_at",
        params![
            canonical.id,
            canonical.title,
            canonical.short_description,
            canonical.description,
            json_strings(&canonical.highlights),
            canonical.location_name,
            canonical.location_city,
            canonical.location_district,
            canonical.location_street,
            canonical.location_zipcode,
            canonical.geo.map(|g| g.latitude),
            canonical.geo.map(|g| g.longitude),
            canonical.geo.map(|g| g.confidence),
            json_string_set(&canonical.categories),
            canonical.is_family_event,
            canonical.is_child_focused,
            canonical.admission_free,
            dates_to_json(&canonical.dates),
            canonical.source_count as i64,
            canonical.match_confidence,
            canonical.needs_review,
            canonical.ai_assisted,
            canonical.first_date.map(|d| d.format("%Y-%m-%d").to_string()),
            canonical.last_date.map(|d| d.format("%Y-%m-%d").to_string()),
            field_provenance_to_json(&canonical.field_provenance),
            canonical.version,
            rfc3339(canonical.created_at),
            rfc3339(canonical.updated_at),
        ],
    )
    .map_err(|e| InfraError::from(e).0)?;
    Ok(())
}

#[async_trait]
impl CanonicalEventRepository for SqliteCanonicalEventRepository {
    async fn replace_all(&self, canonicals: Vec<CanonicalEvent>, sources: Vec<CanonicalEventSource>) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(|e| InfraError::from(e).0)?;

            let result = (|| -> Result<()> {
                tx.execute("DELETE FROM canonical_event_sources", []).map_err(|e| InfraError::from(e).0)?;
                tx.execute("DELETE FROM canonical_events", []).map_err(|e| InfraError::from(e).0)?;

                for canonical in &canonicals {
                    upsert_one(&tx, canonical)?;
                }
                for source in &sources {
                    tx.execute(
                        "INSERT OR IGNORE INTO canonical_event_sources (canonical_id, source_event_id, source_type) VALUES (?1,?2,?3)",
                        params![source.canonical_id, source.source_event_id, source_type_to_str(source.source_type)],
                    )
                    .map_err(|e| InfraError::from(e).0)?;
                }
                Ok(())
            })();

            match result {
                Ok(()) => {
                    tx.commit().map_err(|e| InfraError::from(e).0)?;
                    Ok(())
                }
                Err(err) => {
                    tx.rollback().map_err(|e| InfraError::from(e).0)?;
                    Err(err)
                }
            }
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn load_all(&self) -> Result<Vec<CanonicalEvent>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare("SELECT * FROM canonical_events ORDER BY id").map_err(|e| InfraError::from(e).0)?;
            stmt.query_map([], canonical_from_row)
                .map_err(|e| InfraError::from(e).0)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| InfraError::from(e).0)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn get(&self, canonical_id: &str) -> Result<Option<CanonicalEvent>> {
        let db = self.db.clone();
        let canonical_id = canonical_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            match conn.query_row("SELECT * FROM canonical_events WHERE id = ?1", params![canonical_id], canonical_from_row) {
                Ok(canonical) => Ok(Some(canonical)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(other) => Err(InfraError::from(other).0),
            }
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn upsert(&self, canonical: CanonicalEvent) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            upsert_one(&conn, &canonical)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn delete(&self, canonical_id: &str) -> Result<()> {
        let db = self.db.clone();
        let canonical_id = canonical_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM canonical_events WHERE id = ?1", params![canonical_id]).map_err(|e| InfraError::from(e).0)?;
            Ok(())
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn sources_for(&self, canonical_id: &str) -> Result<Vec<CanonicalEventSource>> {
        let db = self.db.clone();
        let canonical_id = canonical_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT canonical_id, source_event_id, source_type FROM canonical_event_sources WHERE canonical_id = ?1 ORDER BY source_event_id")
                .map_err(|e| InfraError::from(e).0)?;
            stmt.query_map(params![canonical_id], |row| {
                let source_type: String = row.get(2)?;
                Ok(CanonicalEventSource {
                    canonical_id: row.get(0)?,
                    source_event_id: row.get(1)?,
                    source_type: source_type_from_str(&source_type).unwrap_or(regiodedupe_domain::SourceType::Article),
                })
            })
            .map_err(|e| InfraError::from(e).0)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| InfraError::from(e).0)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn find_by_source(&self, source_event_id: &str) -> Result<Option<String>> {
        let db = self.db.clone();
        let source_event_id = source_event_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            match conn.query_row(
                "SELECT canonical_id FROM canonical_event_sources WHERE source_event_id = ?1",
                params![source_event_id],
                |row| row.get::<_, String>(0),
            ) {
                Ok(canonical_id) => Ok(Some(canonical_id)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(other) => Err(InfraError::from(other).0),
            }
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn link_source(&self, link: CanonicalEventSource) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR IGNORE INTO canonical_event_sources (canonical_id, source_event_id, source_type) VALUES (?1,?2,?3)",
                params![link.canonical_id, link.source_event_id, source_type_to_str(link.source_type)],
            )
            .map_err(|e| InfraError::from(e).0)?;
            Ok(())
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }

    async fn unlink_source(&self, canonical_id: &str, source_event_id: &str) -> Result<bool> {
        let db = self.db.clone();
        let canonical_id = canonical_id.to_string();
        let source_event_id = source_event_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let affected = conn
                .execute(
                    "DELETE FROM canonical_event_sources WHERE canonical_id = ?1 AND source_event_id = ?2",
                    params![canonical_id, source_event_id],
                )
                .map_err(|e| InfraError::from(e).0)?;
            Ok(affected > 0)
        })
        .await
        .map_err(|e| DedupeError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn canonical(id: &str) -> CanonicalEvent {
        CanonicalEvent {
            id: id.to_string(),
            title: "Weinfest".to_string(),
            short_description: None,
            description: None,
            highlights: vec![],
            location_name: None,
            location_city: Some("Offenburg".to_string()),
            location_district: None,
            location_street: None,
            location_zipcode: None,
            geo: None,
            categories: Default::default(),
            is_family_event: false,
            is_child_focused: false,
            admission_free: true,
            dates: vec![],
            source_count: 1,
            match_confidence: Some(0.9),
            needs_review: false,
            ai_assisted: false,
            first_date: None,
            last_date: None,
            field_provenance: Default::default(),
            version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn db() -> Arc<DbManager> {
        let dir = TempDir::new().unwrap();
        let manager = DbManager::new(dir.path().join("test.db"), 2).unwrap();
        manager.run_migrations().unwrap();
        Arc::new(manager)
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = SqliteCanonicalEventRepository::new(db());
        repo.upsert(canonical("c1")).await.unwrap();
        let loaded = repo.get("c1").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Weinfest");
        assert!(loaded.admission_free);
    }

    #[tokio::test]
    async fn link_and_find_by_source() {
        let repo = SqliteCanonicalEventRepository::new(db());
        repo.upsert(canonical("c1")).await.unwrap();
        repo.link_source(CanonicalEventSource {
            canonical_id: "c1".to_string(),
            source_event_id: "s1".to_string(),
            source_type: regiodedupe_domain::SourceType::Article,
        })
        .await
        .unwrap();
        assert_eq!(repo.find_by_source("s1").await.unwrap(), Some("c1".to_string()));
        assert!(repo.unlink_source("c1", "s1").await.unwrap());
        assert_eq!(repo.find_by_source("s1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_all_clears_prior_state() {
        let repo = SqliteCanonicalEventRepository::new(db());
        repo.upsert(canonical("stale")).await.unwrap();
        repo.replace_all(vec![canonical("c1")], vec![]).await.unwrap();
        assert!(repo.get("stale").await.unwrap().is_none());
        assert!(repo.get("c1").await.unwrap().is_some());
    }
}
