//! §4.4 Description score — falls back to `short_description` when the
//! full description is missing on either side.

use regiodedupe_domain::Record;

use crate::text::token_sort_ratio;

const BOTH_MISSING_SCORE: f64 = 0.5;
const ONE_MISSING_SCORE: f64 = 0.4;

/// Score how well two records' descriptions agree.
#[must_use]
pub fn score(a: &Record, b: &Record) -> f64 {
    let text_a = a.description.as_deref().or(a.short_description.as_deref());
    let text_b = b.description.as_deref().or(b.short_description.as_deref());

    match (text_a, text_b) {
        (None, None) => BOTH_MISSING_SCORE,
        (Some(_), None) | (None, Some(_)) => ONE_MISSING_SCORE,
        (Some(ta), Some(tb)) => token_sort_ratio(ta, tb),
    }
}
