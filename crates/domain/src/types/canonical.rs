//! Canonical event types — §3 Data Model.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::record::{DateRange, GeoPoint, SourceType};

/// A synthesized canonical event, derived from a non-empty cluster of
/// source records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalEvent {
    pub id: String,

    pub title: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub highlights: Vec<String>,

    pub location_name: Option<String>,
    pub location_city: Option<String>,
    pub location_district: Option<String>,
    pub location_street: Option<String>,
    pub location_zipcode: Option<String>,
    pub geo: Option<GeoPoint>,

    pub categories: BTreeSet<String>,

    pub is_family_event: bool,
    pub is_child_focused: bool,
    pub admission_free: bool,

    pub dates: Vec<DateRange>,

    pub source_count: usize,
    pub match_confidence: Option<f64>,
    pub needs_review: bool,
    pub ai_assisted: bool,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,

    pub field_provenance: BTreeMap<String, String>,

    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Link row for `canonical_event_sources` — which records make up a
/// canonical event, and which source type each contributed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalEventSource {
    pub canonical_id: String,
    pub source_event_id: String,
    pub source_type: SourceType,
}
