//! §4.4 Date score — Jaccard overlap of expanded calendar days, scaled by
//! a time-proximity factor from each record's first start time.

use chrono::{NaiveTime, Timelike};
use regiodedupe_domain::{DateConfig, Record};

/// Score how well two records' dates agree, in `[0, 1]`.
#[must_use]
pub fn score(a: &Record, b: &Record, config: &DateConfig) -> f64 {
    let days_a = a.expanded_days();
    let days_b = b.expanded_days();

    let jaccard = if days_a.is_empty() || days_b.is_empty() {
        1.0
    } else {
        let intersection = days_a.intersection(&days_b).count();
        let union = days_a.union(&days_b).count();
        intersection as f64 / union as f64
    };

    jaccard * time_proximity_factor(a, b, config)
}

fn time_proximity_factor(a: &Record, b: &Record, config: &DateConfig) -> f64 {
    let (time_a, time_b) = match (a.first_start(), b.first_start()) {
        (Some((_, Some(t_a))), Some((_, Some(t_b)))) => (t_a, t_b),
        _ => return 1.0,
    };

    let diff_minutes = minutes_apart(time_a, time_b);
    if diff_minutes <= config.time_tolerance_minutes {
        1.0
    } else if diff_minutes <= config.time_close_minutes {
        config.close_factor
    } else if diff_minutes <= (config.time_gap_penalty_hours * 60.0) as i64 {
        config.far_factor
    } else {
        config.time_gap_penalty_factor
    }
}

fn minutes_apart(a: NaiveTime, b: NaiveTime) -> i64 {
    let a_minutes = i64::from(a.num_seconds_from_midnight()) / 60;
    let b_minutes = i64::from(b.num_seconds_from_midnight()) / 60;
    (a_minutes - b_minutes).abs()
}
