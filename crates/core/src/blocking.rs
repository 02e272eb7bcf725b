//! §4.3 Blocking — emits coarse candidate-generation keys per record.

use std::collections::BTreeSet;

use regiodedupe_domain::constants::{
    GEOCELL_LAT_MAX, GEOCELL_LAT_MIN, GEOCELL_LAT_STEP, GEOCELL_LON_MAX, GEOCELL_LON_MIN,
    GEOCELL_LON_STEP, GEOCELL_MIN_CONFIDENCE,
};
use regiodedupe_domain::Record;

/// Compute the set of blocking keys for a record, expanding multi-day date
/// ranges into one key-pair per contained date.
#[must_use]
pub fn blocking_keys(record: &Record) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    let city = record.location_city_normalized.as_deref().filter(|c| !c.is_empty());
    let geocell = geocell_for(record);

    for date in record.expanded_days() {
        if let Some(city) = city {
            keys.insert(format!("dc|{date}|{city}"));
        }
        if let Some((lat_cell, lon_cell)) = geocell {
            keys.insert(format!("dg|{date}|{lat_cell:.2}|{lon_cell:.2}"));
        }
    }
    keys
}

/// Compute the geocell `(lat_cell, lon_cell)` for a record's coordinates, if
/// its confidence and position qualify it for the geo blocking key.
fn geocell_for(record: &Record) -> Option<(f64, f64)> {
    let geo = record.geo.as_ref()?;
    if geo.confidence < GEOCELL_MIN_CONFIDENCE {
        return None;
    }
    if !(GEOCELL_LAT_MIN..=GEOCELL_LAT_MAX).contains(&geo.latitude)
        || !(GEOCELL_LON_MIN..=GEOCELL_LON_MAX).contains(&geo.longitude)
    {
        return None;
    }
    let lat_cell = (geo.latitude / GEOCELL_LAT_STEP).round() * GEOCELL_LAT_STEP;
    let lon_cell = (geo.longitude / GEOCELL_LON_STEP).round() * GEOCELL_LON_STEP;
    Some((lat_cell, lon_cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use regiodedupe_domain::{DateRange, GeoPoint, SourceType};

    fn record_with(city: Option<&str>, geo: Option<GeoPoint>, dates: Vec<DateRange>) -> Record {
        Record {
            id: "r1".into(),
            source_code: "src".into(),
            source_type: SourceType::Article,
            title: "t".into(),
            title_normalized: "t".into(),
            short_description: None,
            description: None,
            highlights: vec![],
            location_name: None,
            location_city: city.map(str::to_string),
            location_city_normalized: city.map(str::to_string),
            location_district: None,
            location_street: None,
            location_zipcode: None,
            geo,
            categories: Default::default(),
            is_family_event: None,
            is_child_focused: None,
            admission_free: None,
            dates,
            blocking_keys: Default::default(),
        }
    }

    fn single_day(date: NaiveDate) -> DateRange {
        DateRange { date, end_date: None, start_time: None, end_time: None }
    }

    #[test]
    fn date_city_key_emitted_for_each_day() {
        let start = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let r = record_with(
            Some("waldkirch"),
            None,
            vec![DateRange { date: start, end_date: Some(end), start_time: None, end_time: None }],
        );
        let keys = blocking_keys(&r);
        assert!(keys.contains("dc|2026-05-01|waldkirch"));
        assert!(keys.contains("dc|2026-05-02|waldkirch"));
    }

    #[test]
    fn geocell_key_requires_high_confidence() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let low_conf = GeoPoint { latitude: 48.0, longitude: 7.9, confidence: 0.5 };
        let r = record_with(None, Some(low_conf), vec![single_day(date)]);
        assert!(blocking_keys(&r).is_empty());
    }

    #[test]
    fn geocell_key_requires_bounding_box() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let outside = GeoPoint { latitude: 52.5, longitude: 13.4, confidence: 0.95 };
        let r = record_with(None, Some(outside), vec![single_day(date)]);
        assert!(blocking_keys(&r).is_empty());
    }

    #[test]
    fn geocell_key_emitted_when_qualified() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let geo = GeoPoint { latitude: 48.0, longitude: 7.9, confidence: 0.95 };
        let r = record_with(None, Some(geo), vec![single_day(date)]);
        let keys = blocking_keys(&r);
        assert_eq!(keys.len(), 1);
        assert!(keys.iter().next().unwrap().starts_with("dg|2026-05-01|"));
    }
}
