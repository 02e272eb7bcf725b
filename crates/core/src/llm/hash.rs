//! §4.7 step 1 — `pair_hash`: a content-addressed, order-independent key
//! over the matching-relevant fields of a record pair.

use sha2::{Digest, Sha256};

use regiodedupe_domain::Record;

/// Compute the lowercase hex SHA-256 `pair_hash` over the matching-relevant
/// fields of two records. Records are first ordered by id so that
/// `pair_hash(a, b) == pair_hash(b, a)`.
#[must_use]
pub fn pair_hash(a: &Record, b: &Record) -> String {
    let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
    let canonical = format!("{}\u{1f}{}", canonicalize(first), canonicalize(second));
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

fn canonicalize(record: &Record) -> String {
    let mut dates: Vec<String> = record
        .dates
        .iter()
        .map(|d| format!("{}|{:?}|{:?}|{:?}", d.date, d.start_time, d.end_time, d.end_date))
        .collect();
    dates.sort_unstable();

    let mut categories: Vec<&str> = record.categories.iter().map(String::as_str).collect();
    categories.sort_unstable();

    let geo = record
        .geo
        .map(|g| format!("{:.6},{:.6}", g.latitude, g.longitude))
        .unwrap_or_default();

    [
        record.title.as_str(),
        record.title_normalized.as_str(),
        record.short_description.as_deref().unwrap_or(""),
        record.description.as_deref().unwrap_or(""),
        &dates.join(","),
        record.location_city_normalized.as_deref().unwrap_or(""),
        &geo,
        &categories.join(","),
        source_type_label(record),
    ]
    .join("\u{1e}")
}

fn source_type_label(record: &Record) -> &'static str {
    match record.source_type {
        regiodedupe_domain::SourceType::Article => "article",
        regiodedupe_domain::SourceType::Listing => "listing",
        regiodedupe_domain::SourceType::Ad => "ad",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regiodedupe_domain::SourceType;

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            source_code: format!("src-{id}"),
            source_type: SourceType::Article,
            title: "Fastnacht".to_string(),
            title_normalized: "fastnacht".to_string(),
            short_description: None,
            description: None,
            highlights: vec![],
            location_name: None,
            location_city: None,
            location_city_normalized: Some("waldkirch".to_string()),
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

    #[test]
    fn symmetric_regardless_of_argument_order() {
        let a = record("a");
        let b = record("b");
        assert_eq!(pair_hash(&a, &b), pair_hash(&b, &a));
    }

    #[test]
    fn differs_for_different_content() {
        let a = record("a");
        let b = record("b");
        let mut c = record("c");
        c.title_normalized = "completely different".to_string();
        assert_ne!(pair_hash(&a, &b), pair_hash(&a, &c));
    }

    #[test]
    fn is_hex_sha256_length() {
        let a = record("a");
        let b = record("b");
        assert_eq!(pair_hash(&a, &b).len(), 64);
    }
}
