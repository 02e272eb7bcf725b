//! §4.9 Canonical Synthesizer — per-field strategy dispatch from an
//! ordered, non-empty sequence of records to a canonical field set plus
//! provenance.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use regiodedupe_domain::constants::{PROVENANCE_UNION_ALL_SOURCES, TITLE_MIN_NON_GENERIC_LENGTH};
use regiodedupe_domain::{CanonicalEvent, DateRange, DedupeError, GeoPoint, Record, Result};

/// The canonical fields and provenance produced by synthesis. Does not
/// include orchestrator-managed fields (`id`, `match_confidence`,
/// `needs_review`, `ai_assisted`, `version`, timestamps) — those are
/// assigned by the caller (the full-pipeline orchestrator or a review
/// operation), which owns the cluster- and decision-level context the
/// synthesizer itself never sees.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedCanonical {
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
    pub first_date: Option<chrono::NaiveDate>,
    pub last_date: Option<chrono::NaiveDate>,

    pub field_provenance: BTreeMap<String, String>,
}

/// Synthesize a canonical field set from a non-empty, ordered slice of
/// records. Order matters: "longest" and "most_complete" ties, and union
/// dedup order, are all broken by first occurrence in `records`.
///
/// # Errors
/// Returns [`DedupeError::InvalidInput`] if `records` is empty.
pub fn synthesize(records: &[Record]) -> Result<SynthesizedCanonical> {
    if records.is_empty() {
        return Err(DedupeError::InvalidInput("synthesize requires at least one record".to_string()));
    }

    let mut provenance = BTreeMap::new();

    let (title, title_id) = longest_non_generic(records, |r| &r.title);
    provenance.insert("title".to_string(), title_id);

    let short_description = pick_longest_field(records, |r| r.short_description.as_deref(), &mut provenance, "short_description");
    let description = pick_longest_field(records, |r| r.description.as_deref(), &mut provenance, "description");

    let highlights = union_preserving_order(records.iter().map(|r| r.highlights.clone()));
    if !highlights.is_empty() {
        provenance.insert("highlights".to_string(), PROVENANCE_UNION_ALL_SOURCES.to_string());
    }

    let categories: BTreeSet<String> = records.iter().flat_map(|r| r.categories.iter().cloned()).collect();
    if !categories.is_empty() {
        provenance.insert("categories".to_string(), PROVENANCE_UNION_ALL_SOURCES.to_string());
    }

    let location_name = most_complete(records, |r| r.location_name.as_deref(), &mut provenance, "location_name");
    let location_district = most_complete(records, |r| r.location_district.as_deref(), &mut provenance, "location_district");
    let location_street = most_complete(records, |r| r.location_street.as_deref(), &mut provenance, "location_street");
    let location_zipcode = most_complete(records, |r| r.location_zipcode.as_deref(), &mut provenance, "location_zipcode");
    let location_city = most_frequent_city(records, &mut provenance);

    let geo = highest_confidence_geo(records, &mut provenance);

    let is_family_event = any_true(records, |r| r.is_family_event, &mut provenance, "is_family_event");
    let is_child_focused = any_true(records, |r| r.is_child_focused, &mut provenance, "is_child_focused");
    let admission_free = any_true(records, |r| r.admission_free, &mut provenance, "admission_free");

    let dates = union_dates(records);
    if !dates.is_empty() {
        provenance.insert("dates".to_string(), PROVENANCE_UNION_ALL_SOURCES.to_string());
    }
    let mut expanded_days: Vec<chrono::NaiveDate> = dates.iter().flat_map(DateRange::expand_days).collect();
    expanded_days.sort_unstable();
    let first_date = expanded_days.first().copied();
    let last_date = expanded_days.last().copied();

    Ok(SynthesizedCanonical {
        title,
        short_description,
        description,
        highlights,
        location_name,
        location_city,
        location_district,
        location_street,
        location_zipcode,
        geo,
        categories,
        is_family_event,
        is_child_focused,
        admission_free,
        dates,
        source_count: records.len(),
        first_date,
        last_date,
        field_provenance: provenance,
    })
}

/// Build a brand-new canonical event (version 1) from a non-empty record
/// slice — used for singleton canonicals created by ingestion and by
/// review operations that detach a source with no merge target.
///
/// `match_confidence` and `ai_assisted` are left at their neutral
/// defaults; the caller (orchestrator or review operation) stamps them
/// from cluster/decision context this function never sees.
pub fn build_canonical(id: String, records: &[Record], now: DateTime<Utc>) -> Result<CanonicalEvent> {
    let fields = synthesize(records)?;
    Ok(CanonicalEvent {
        id,
        title: fields.title,
        short_description: fields.short_description,
        description: fields.description,
        highlights: fields.highlights,
        location_name: fields.location_name,
        location_city: fields.location_city,
        location_district: fields.location_district,
        location_street: fields.location_street,
        location_zipcode: fields.location_zipcode,
        geo: fields.geo,
        categories: fields.categories,
        is_family_event: fields.is_family_event,
        is_child_focused: fields.is_child_focused,
        admission_free: fields.admission_free,
        dates: fields.dates,
        source_count: fields.source_count,
        match_confidence: None,
        needs_review: false,
        ai_assisted: false,
        first_date: fields.first_date,
        last_date: fields.last_date,
        field_provenance: fields.field_provenance,
        version: 1,
        created_at: now,
        updated_at: now,
    })
}

/// `longest_non_generic`: prefer the longest value with length ≥
/// [`TITLE_MIN_NON_GENERIC_LENGTH`]; else the longest overall. Ties break by
/// first occurrence.
fn longest_non_generic(records: &[Record], field: impl Fn(&Record) -> &str) -> (String, String) {
    let qualifying = records.iter().filter(|r| field(r).chars().count() >= TITLE_MIN_NON_GENERIC_LENGTH);
    if let Some(best) = longest_by(qualifying, &field) {
        return best;
    }
    longest_by(records.iter(), &field).unwrap_or_else(|| (String::new(), records[0].id.clone()))
}

fn longest_by<'a>(
    mut iter: impl Iterator<Item = &'a Record>,
    field: &impl Fn(&Record) -> &str,
) -> Option<(String, String)> {
    let first = iter.next()?;
    let mut best_text = field(first).to_string();
    let mut best_id = first.id.clone();
    let mut best_len = best_text.chars().count();
    for record in iter {
        let text = field(record);
        let len = text.chars().count();
        if len > best_len {
            best_len = len;
            best_text = text.to_string();
            best_id = record.id.clone();
        }
    }
    Some((best_text, best_id))
}

fn pick_longest_field(
    records: &[Record],
    field: impl Fn(&Record) -> Option<&str>,
    provenance: &mut BTreeMap<String, String>,
    key: &str,
) -> Option<String> {
    let mut best: Option<(&str, &str)> = None;
    for record in records {
        if let Some(text) = field(record) {
            if text.is_empty() {
                continue;
            }
            let better = best.map_or(true, |(best_text, _)| text.chars().count() > best_text.chars().count());
            if better {
                best = Some((text, record.id.as_str()));
            }
        }
    }
    best.map(|(text, id)| {
        provenance.insert(key.to_string(), id.to_string());
        text.to_string()
    })
}

fn most_complete(
    records: &[Record],
    field: impl Fn(&Record) -> Option<&str>,
    provenance: &mut BTreeMap<String, String>,
    key: &str,
) -> Option<String> {
    pick_longest_field(records, field, provenance, key)
}

fn most_frequent_city(records: &[Record], provenance: &mut BTreeMap<String, String>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut first_seen_order: Vec<&str> = Vec::new();
    let mut owner_id: BTreeMap<&str, &str> = BTreeMap::new();
    for record in records {
        if let Some(city) = record.location_city.as_deref().filter(|c| !c.is_empty()) {
            if !counts.contains_key(city) {
                first_seen_order.push(city);
                owner_id.insert(city, record.id.as_str());
            }
            *counts.entry(city).or_insert(0) += 1;
        }
    }
    let mut winner: Option<&str> = None;
    let mut best_count = 0usize;
    for city in first_seen_order {
        let count = counts[city];
        if count > best_count {
            best_count = count;
            winner = Some(city);
        }
    }
    let winner = winner?;
    provenance.insert("location_city".to_string(), owner_id[winner].to_string());
    Some(winner.to_string())
}

fn highest_confidence_geo(records: &[Record], provenance: &mut BTreeMap<String, String>) -> Option<GeoPoint> {
    let mut best: Option<(&GeoPoint, &str)> = None;
    for record in records {
        if let Some(geo) = &record.geo {
            let better = best.map_or(true, |(best_geo, _)| geo.confidence > best_geo.confidence);
            if better {
                best = Some((geo, record.id.as_str()));
            }
        }
    }
    best.map(|(geo, id)| {
        provenance.insert("geo".to_string(), id.to_string());
        *geo
    })
}

fn any_true(
    records: &[Record],
    field: impl Fn(&Record) -> Option<bool>,
    provenance: &mut BTreeMap<String, String>,
    key: &str,
) -> bool {
    for record in records {
        if field(record) == Some(true) {
            provenance.insert(key.to_string(), record.id.clone());
            return true;
        }
    }
    false
}

fn union_preserving_order(lists: impl Iterator<Item = Vec<String>>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for list in lists {
        for item in list {
            if seen.insert(item.clone()) {
                out.push(item);
            }
        }
    }
    out
}

fn union_dates(records: &[Record]) -> Vec<DateRange> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for record in records {
        for date in &record.dates {
            let key = (date.date, date.start_time, date.end_time, date.end_date);
            if seen.insert(key) {
                out.push(*date);
            }
        }
    }
    out
}
