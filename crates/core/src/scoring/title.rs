//! §4.4 Title score — blended token-sort/token-set ratio with a
//! cross-source-type override for article/listing pairs.

use regiodedupe_domain::{Record, SourceType, TitleConfig};

use crate::text::{token_set_ratio, token_sort_ratio};

/// Score how well two records' normalized titles agree.
#[must_use]
pub fn score(a: &Record, b: &Record, config: &TitleConfig) -> f64 {
    let primary = token_sort_ratio(&a.title_normalized, &b.title_normalized);
    let secondary = token_set_ratio(&a.title_normalized, &b.title_normalized);

    if is_cross_source_type_pair(a.source_type, b.source_type, config) {
        return blend(primary, secondary, &config.cross_source_type);
    }

    if primary < config.blend_lower || primary > config.blend_upper {
        return primary;
    }
    config.primary_weight * primary + config.secondary_weight * secondary
}

fn blend(primary: f64, secondary: f64, blend_cfg: &regiodedupe_domain::CrossSourceTypeBlend) -> f64 {
    if primary < blend_cfg.blend_lower || primary > blend_cfg.blend_upper {
        return primary;
    }
    blend_cfg.primary_weight * primary + blend_cfg.secondary_weight * secondary
}

fn is_cross_source_type_pair(a: SourceType, b: SourceType, config: &TitleConfig) -> bool {
    if a == b {
        return false;
    }
    let name = |t: SourceType| match t {
        SourceType::Article => "article",
        SourceType::Listing => "listing",
        SourceType::Ad => "ad",
    };
    let (na, nb) = (name(a), name(b));
    config
        .cross_source_type_pairs
        .iter()
        .any(|(x, y)| (x == na && y == nb) || (x == nb && y == na))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::test_support::record_fixture;

    #[test]
    fn identical_titles_score_one() {
        let cfg = TitleConfig::default();
        let mut a = record_fixture("a");
        a.title_normalized = "fastnacht waldkirch".to_string();
        let mut b = record_fixture("b");
        b.title_normalized = "fastnacht waldkirch".to_string();
        assert_eq!(score(&a, &b, &cfg), 1.0);
    }

    #[test]
    fn cinema_title_veto_scenario_scores_low() {
        let cfg = TitleConfig::default();
        let mut a = record_fixture("a");
        a.title_normalized = "die eiskoenigin".to_string();
        let mut b = record_fixture("b");
        b.title_normalized = "jurassic park".to_string();
        assert!(score(&a, &b, &cfg) < cfg.blend_lower || score(&a, &b, &cfg) < 0.5);
    }

    #[test]
    fn cross_source_type_override_applies_for_article_listing() {
        let cfg = TitleConfig::default();
        let mut a = record_fixture("a");
        a.source_type = SourceType::Article;
        a.title_normalized = "fastnacht umzug waldkirch 2026 grosser festzug".to_string();
        let mut b = record_fixture("b");
        b.source_type = SourceType::Listing;
        b.title_normalized = "fastnachtsumzug".to_string();
        // Just confirm the cross-source branch is reachable without panicking
        // and returns a valid score.
        let s = score(&a, &b, &cfg);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn same_source_type_does_not_use_cross_override() {
        let cfg = TitleConfig::default();
        assert!(!is_cross_source_type_pair(SourceType::Article, SourceType::Article, &cfg));
        assert!(is_cross_source_type_pair(SourceType::Article, SourceType::Listing, &cfg));
        assert!(!is_cross_source_type_pair(SourceType::Listing, SourceType::Ad, &cfg));
    }
}
