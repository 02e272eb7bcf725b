//! §4.4 Signal Scorers and §4.5 Weight Resolver & Combiner.

pub mod date;
pub mod description;
pub mod geo;
pub mod title;
pub mod weights;

#[cfg(test)]
mod test_support;

use regiodedupe_domain::{Config, Record, SignalScores};

/// Compute all four signal scores for a pair of records against a config.
#[must_use]
pub fn score_pair(a: &Record, b: &Record, config: &Config) -> SignalScores {
    SignalScores {
        date: date::score(a, b, &config.date),
        geo: geo::score(a, b, &config.geo),
        title: title::score(a, b, &config.title),
        description: description::score(a, b),
    }
}
