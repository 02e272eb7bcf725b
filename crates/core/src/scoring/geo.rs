//! §4.4 Geo score — haversine distance with a venue-name fuzzy tiebreak.

use regiodedupe_domain::{GeoConfig, Record};

use crate::text::token_sort_ratio;

const EARTH_RADIUS_KM: f64 = 6371.0;
const IDENTICAL_COORD_EPSILON: f64 = 1e-6;
const VENUE_FUZZY_THRESHOLD: f64 = 0.5;

/// Score how well two records' coordinates and venue names agree.
#[must_use]
pub fn score(a: &Record, b: &Record, config: &GeoConfig) -> f64 {
    let (geo_a, geo_b) = match (&a.geo, &b.geo) {
        (Some(ga), Some(gb)) => (ga, gb),
        _ => return config.neutral_score,
    };

    let identical_coords = (geo_a.latitude - geo_b.latitude).abs() < IDENTICAL_COORD_EPSILON
        && (geo_a.longitude - geo_b.longitude).abs() < IDENTICAL_COORD_EPSILON;

    if !identical_coords && (geo_a.confidence < config.min_confidence || geo_b.confidence < config.min_confidence) {
        return config.neutral_score;
    }

    let dist_km = if identical_coords {
        0.0
    } else {
        haversine_km(geo_a.latitude, geo_a.longitude, geo_b.latitude, geo_b.longitude)
    };

    let base = (1.0 - dist_km / config.max_distance_km).max(0.0);

    if dist_km < config.venue_match_distance_km {
        if let (Some(name_a), Some(name_b)) = (&a.location_name, &b.location_name) {
            if !name_a.is_empty() && !name_b.is_empty() {
                let venue_ratio = token_sort_ratio(name_a, name_b);
                if venue_ratio < VENUE_FUZZY_THRESHOLD {
                    return base * config.venue_mismatch_factor;
                }
            }
        }
    }

    base
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1_r, lat2_r) = (lat1.to_radians(), lat2.to_radians());
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::test_support::record_fixture;
    use regiodedupe_domain::GeoPoint;

    #[test]
    fn missing_coords_neutral() {
        let cfg = GeoConfig::default();
        let a = record_fixture("a");
        let b = record_fixture("b");
        assert_eq!(score(&a, &b, &cfg), cfg.neutral_score);
    }

    #[test]
    fn identical_coords_score_one_even_if_low_confidence() {
        let cfg = GeoConfig::default();
        let mut a = record_fixture("a");
        a.geo = Some(GeoPoint { latitude: 48.0, longitude: 7.9, confidence: 0.1 });
        let mut b = record_fixture("b");
        b.geo = Some(GeoPoint { latitude: 48.0, longitude: 7.9, confidence: 0.1 });
        assert_eq!(score(&a, &b, &cfg), 1.0);
    }

    #[test]
    fn low_confidence_nonidentical_is_neutral() {
        let cfg = GeoConfig::default();
        let mut a = record_fixture("a");
        a.geo = Some(GeoPoint { latitude: 48.0, longitude: 7.9, confidence: 0.5 });
        let mut b = record_fixture("b");
        b.geo = Some(GeoPoint { latitude: 48.01, longitude: 7.91, confidence: 0.95 });
        assert_eq!(score(&a, &b, &cfg), cfg.neutral_score);
    }

    #[test]
    fn venue_mismatch_penalizes_close_points() {
        let cfg = GeoConfig::default();
        let mut a = record_fixture("a");
        a.geo = Some(GeoPoint { latitude: 48.0, longitude: 7.9, confidence: 0.95 });
        a.location_name = Some("Stadthalle".to_string());
        let mut b = record_fixture("b");
        b.geo = Some(GeoPoint { latitude: 48.001, longitude: 7.901, confidence: 0.95 });
        b.location_name = Some("Jugendzentrum".to_string());
        let s = score(&a, &b, &cfg);
        assert!(s < 1.0);
    }

    #[test]
    fn far_apart_scores_near_zero() {
        let cfg = GeoConfig::default();
        let mut a = record_fixture("a");
        a.geo = Some(GeoPoint { latitude: 48.0, longitude: 7.9, confidence: 0.95 });
        let mut b = record_fixture("b");
        b.geo = Some(GeoPoint { latitude: 47.0, longitude: 7.0, confidence: 0.95 });
        assert_eq!(score(&a, &b, &cfg), 0.0);
    }
}
