//! §4.10 Enrichment / Re-synthesis — re-runs the synthesizer against an
//! updated record set, then prevents downgrading text fields that were
//! already longer on the existing canonical.

use chrono::{DateTime, Utc};

use regiodedupe_domain::{CanonicalEvent, Record, Result};

use crate::synthesize::{synthesize, SynthesizedCanonical};

/// Re-synthesize `records` into `existing`'s canonical shell, applying
/// downgrade prevention to `title`, `short_description`, and
/// `description`: if the existing value is strictly longer than the
/// freshly synthesized one, keep the existing value and its provenance.
///
/// `ai_assisted` and `needs_review` are carried over unless
/// `ai_assisted_override`/`needs_review_override` say otherwise — per
/// the spec these flags are recomputed from the current decision set by
/// the orchestrator and never silently downgraded by this function.
pub fn enrich(
    existing: &CanonicalEvent,
    records: &[Record],
    ai_assisted_override: Option<bool>,
    needs_review_override: Option<bool>,
    now: DateTime<Utc>,
) -> Result<CanonicalEvent> {
    let fresh = synthesize(records)?;

    let mut next = existing.clone();
    next.version += 1;
    next.updated_at = now;

    apply_no_downgrade(&mut next.title, &mut next.field_provenance, "title", Some(fresh.title.clone()), fresh.field_provenance.get("title").cloned());
    apply_no_downgrade_option(
        &mut next.short_description,
        &mut next.field_provenance,
        "short_description",
        fresh.short_description.clone(),
        fresh.field_provenance.get("short_description").cloned(),
    );
    apply_no_downgrade_option(
        &mut next.description,
        &mut next.field_provenance,
        "description",
        fresh.description.clone(),
        fresh.field_provenance.get("description").cloned(),
    );

    copy_remaining_fields(&mut next, &fresh);

    next.source_count = fresh.source_count;
    next.first_date = fresh.first_date;
    next.last_date = fresh.last_date;

    if let Some(ai_assisted) = ai_assisted_override {
        next.ai_assisted = next.ai_assisted || ai_assisted;
    }
    if let Some(needs_review) = needs_review_override {
        next.needs_review = next.needs_review || needs_review;
    }

    Ok(next)
}

fn apply_no_downgrade(
    current: &mut String,
    provenance: &mut std::collections::BTreeMap<String, String>,
    key: &str,
    candidate: Option<String>,
    candidate_provenance: Option<String>,
) {
    if let Some(candidate) = candidate {
        if candidate.chars().count() >= current.chars().count() {
            *current = candidate;
            if let Some(prov) = candidate_provenance {
                provenance.insert(key.to_string(), prov);
            }
        }
    }
}

fn apply_no_downgrade_option(
    current: &mut Option<String>,
    provenance: &mut std::collections::BTreeMap<String, String>,
    key: &str,
    candidate: Option<String>,
    candidate_provenance: Option<String>,
) {
    let current_len = current.as_ref().map_or(0, |s| s.chars().count());
    if let Some(candidate) = candidate {
        if candidate.chars().count() >= current_len {
            *current = Some(candidate);
            if let Some(prov) = candidate_provenance {
                provenance.insert(key.to_string(), prov);
            }
        }
    }
}

fn copy_remaining_fields(next: &mut CanonicalEvent, fresh: &SynthesizedCanonical) {
    next.highlights = fresh.highlights.clone();
    next.location_name = fresh.location_name.clone();
    next.location_city = fresh.location_city.clone();
    next.location_district = fresh.location_district.clone();
    next.location_street = fresh.location_street.clone();
    next.location_zipcode = fresh.location_zipcode.clone();
    next.geo = fresh.geo;
    next.categories = fresh.categories.clone();
    next.is_family_event = fresh.is_family_event;
    next.is_child_focused = fresh.is_child_focused;
    next.admission_free = fresh.admission_free;
    next.dates = fresh.dates.clone();

    for (key, value) in &fresh.field_provenance {
        if !matches!(key.as_str(), "title" | "short_description" | "description") {
            next.field_provenance.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use regiodedupe_domain::SourceType;

    fn record(id: &str, title: &str) -> Record {
        Record {
            id: id.to_string(),
            source_code: format!("src-{id}"),
            source_type: SourceType::Article,
            title: title.to_string(),
            title_normalized: title.to_lowercase(),
            short_description: None,
            description: None,
            highlights: vec![],
            location_name: None,
            location_city: None,
            location_city_normalized: None,
            location_district: None,
            location_street: None,
            location_zipcode: None,
            geo: None,
            categories: Default::default(),
            is_family_event: None,
            is_child_focused: None,
            admission_free: None,
            dates: vec![],
            blocking_keys: Default::default(),
        }
    }

    fn canonical_from(records: &[Record]) -> CanonicalEvent {
        let fresh = synthesize(records).unwrap();
        let now = Utc::now();
        CanonicalEvent {
            id: "canon-1".to_string(),
            title: fresh.title,
            short_description: fresh.short_description,
            description: fresh.description,
            highlights: fresh.highlights,
            location_name: fresh.location_name,
            location_city: fresh.location_city,
            location_district: fresh.location_district,
            location_street: fresh.location_street,
            location_zipcode: fresh.location_zipcode,
            geo: fresh.geo,
            categories: fresh.categories,
            is_family_event: fresh.is_family_event,
            is_child_focused: fresh.is_child_focused,
            admission_free: fresh.admission_free,
            dates: fresh.dates,
            source_count: fresh.source_count,
            match_confidence: None,
            needs_review: false,
            ai_assisted: false,
            first_date: fresh.first_date,
            last_date: fresh.last_date,
            field_provenance: fresh.field_provenance,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn never_shortens_title_on_resynthesis() {
        let existing = canonical_from(&[record("a", "Ein sehr langer und ausfuehrlicher Titel")]);
        // Re-ingestion truncated source "a"'s title; downgrade prevention must
        // keep the longer title the canonical already had.
        let updated = vec![record("a", "Titel gekuerzt"), record("b", "Kurz")];
        let result = enrich(&existing, &updated, None, None, Utc::now()).unwrap();
        assert_eq!(result.title, "Ein sehr langer und ausfuehrlicher Titel");
        assert_eq!(result.version, 2);
    }

    #[test]
    fn adopts_longer_title_when_available() {
        let existing = canonical_from(&[record("a", "Kurz")]);
        let updated = vec![record("a", "Kurz"), record("b", "Ein sehr viel laengerer Titel als vorher")];
        let result = enrich(&existing, &updated, None, None, Utc::now()).unwrap();
        assert_eq!(result.title, "Ein sehr viel laengerer Titel als vorher");
    }

    #[test]
    fn source_count_recomputed() {
        let existing = canonical_from(&[record("a", "genau zehnze")]);
        let updated = vec![record("a", "genau zehnze"), record("b", "genau zehnze")];
        let result = enrich(&existing, &updated, None, None, Utc::now()).unwrap();
        assert_eq!(result.source_count, 2);
    }
}
