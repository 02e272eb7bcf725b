//! Row <-> domain-type conversions shared by the SQLite repositories.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regiodedupe_domain::{DateRange, DedupeError, GeoPoint, Record, Result, SourceType};
use rusqlite::Row;

use crate::errors::InfraError;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";

pub fn source_type_to_str(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::Article => "article",
        SourceType::Listing => "listing",
        SourceType::Ad => "ad",
    }
}

pub fn source_type_from_str(value: &str) -> Result<SourceType> {
    match value {
        "article" => Ok(SourceType::Article),
        "listing" => Ok(SourceType::Listing),
        "ad" => Ok(SourceType::Ad),
        other => Err(DedupeError::Database(format!("unknown source_type: {other}"))),
    }
}

pub fn json_strings(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

pub fn json_string_set(values: &BTreeSet<String>) -> String {
    let vec: Vec<&str> = values.iter().map(String::as_str).collect();
    serde_json::to_string(&vec).unwrap_or_else(|_| "[]".to_string())
}

pub fn parse_json_strings(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| DedupeError::Database(format!("invalid JSON array: {e}")))
}

pub fn parse_json_string_set(raw: &str) -> Result<BTreeSet<String>> {
    Ok(parse_json_strings(raw)?.into_iter().collect())
}

pub fn dates_to_json(dates: &[DateRange]) -> String {
    let rows: Vec<(String, Option<String>, Option<String>, Option<String>)> = dates
        .iter()
        .map(|d| {
            (
                d.date.format(DATE_FMT).to_string(),
                d.start_time.map(|t| t.format(TIME_FMT).to_string()),
                d.end_time.map(|t| t.format(TIME_FMT).to_string()),
                d.end_date.map(|d| d.format(DATE_FMT).to_string()),
            )
        })
        .collect();
    serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
}

pub fn dates_from_json(raw: &str) -> Result<Vec<DateRange>> {
    let rows: Vec<(String, Option<String>, Option<String>, Option<String>)> =
        serde_json::from_str(raw).map_err(|e| DedupeError::Database(format!("invalid dates JSON: {e}")))?;
    rows.into_iter()
        .map(|(date, start_time, end_time, end_date)| {
            Ok(DateRange {
                date: parse_date(&date)?,
                start_time: start_time.as_deref().map(parse_time).transpose()?,
                end_time: end_time.as_deref().map(parse_time).transpose()?,
                end_date: end_date.as_deref().map(parse_date).transpose()?,
            })
        })
        .collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|e| DedupeError::Database(format!("invalid date '{raw}': {e}")))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FMT).map_err(|e| DedupeError::Database(format!("invalid time '{raw}': {e}")))
}

pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|e| DedupeError::Database(format!("invalid timestamp '{raw}': {e}")))
}

pub fn field_provenance_to_json(provenance: &BTreeMap<String, String>) -> String {
    serde_json::to_string(provenance).unwrap_or_else(|_| "{}".to_string())
}

pub fn field_provenance_from_json(raw: &str) -> Result<BTreeMap<String, String>> {
    serde_json::from_str(raw).map_err(|e| DedupeError::Database(format!("invalid provenance JSON: {e}")))
}

/// Load a record's `event_dates` rows given its id. Requires a live `conn`;
/// kept separate from `record_from_row` since dates live in a joined table.
pub fn load_dates_for(conn: &rusqlite::Connection, source_event_id: &str) -> Result<Vec<DateRange>> {
    let mut stmt = conn
        .prepare("SELECT date, start_time, end_time, end_date FROM event_dates WHERE source_event_id = ?1 ORDER BY id")
        .map_err(|e| InfraError::from(e).0)?;
    let rows = stmt
        .query_map([source_event_id], |row| {
            let date: String = row.get(0)?;
            let start_time: Option<String> = row.get(1)?;
            let end_time: Option<String> = row.get(2)?;
            let end_date: Option<String> = row.get(3)?;
            Ok((date, start_time, end_time, end_date))
        })
        .map_err(|e| InfraError::from(e).0)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| InfraError::from(e).0)?;

    rows.into_iter()
        .map(|(date, start_time, end_time, end_date)| {
            Ok(DateRange {
                date: parse_date(&date)?,
                start_time: start_time.as_deref().map(parse_time).transpose()?,
                end_time: end_time.as_deref().map(parse_time).transpose()?,
                end_date: end_date.as_deref().map(parse_date).transpose()?,
            })
        })
        .collect()
}

pub fn record_from_row(row: &Row, dates: Vec<DateRange>) -> rusqlite::Result<Record> {
    let source_type: String = row.get("source_type")?;
    let categories_json: String = row.get("categories_json")?;
    let highlights_json: String = row.get("highlights_json")?;
    let blocking_keys_json: String = row.get("blocking_keys_json")?;
    let geo_latitude: Option<f64> = row.get("geo_latitude")?;
    let geo_longitude: Option<f64> = row.get("geo_longitude")?;
    let geo_confidence: Option<f64> = row.get("geo_confidence")?;

    Ok(Record {
        id: row.get("id")?,
        source_code: row.get("source_code")?,
        source_type: source_type_from_str(&source_type).unwrap_or(SourceType::Article),
        title: row.get("title")?,
        title_normalized: row.get("title_normalized")?,
        short_description: row.get("short_description")?,
        description: row.get("description")?,
        highlights: parse_json_strings(&highlights_json).unwrap_or_default(),
        location_name: row.get("location_name")?,
        location_city: row.get("location_city")?,
        location_city_normalized: row.get("location_city_normalized")?,
        location_district: row.get("location_district")?,
        location_street: row.get("location_street")?,
        location_zipcode: row.get("location_zipcode")?,
        geo: match (geo_latitude, geo_longitude, geo_confidence) {
            (Some(latitude), Some(longitude), Some(confidence)) => Some(GeoPoint { latitude, longitude, confidence }),
            _ => None,
        },
        categories: parse_json_string_set(&categories_json).unwrap_or_default(),
        is_family_event: row.get("is_family_event")?,
        is_child_focused: row.get("is_child_focused")?,
        admission_free: row.get("admission_free")?,
        dates,
        blocking_keys: parse_json_string_set(&blocking_keys_json).unwrap_or_default(),
    })
}
