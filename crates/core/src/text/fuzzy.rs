//! Token-order-insensitive and token-set string ratios used by the title
//! and geo-venue scorers (§4.4). Both are expressed in terms of a
//! Levenshtein-distance ratio over whitespace tokens, following the
//! classic token-sort / token-set formulation: order differences and
//! shared-token overlap shouldn't sink an otherwise-identical title.

use std::collections::BTreeSet;

/// Levenshtein-distance-based similarity ratio in `[0, 1]`, after sorting
/// each input's whitespace tokens alphabetically. Two strings built from
/// the same tokens in a different order score 1.0.
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Fuzzywuzzy-style token-set ratio: best of three comparisons between the
/// sorted shared-token intersection and each side's full token set. This
/// rewards strings where one is a subset of the other's tokens (e.g. a
/// short listing title contained within a longer article title).
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let sorted_intersection = intersection.join(" ");
    let combined_a = join_sorted(&intersection, &only_a);
    let combined_b = join_sorted(&intersection, &only_b);

    let r1 = ratio(&sorted_intersection, &combined_a);
    let r2 = ratio(&sorted_intersection, &combined_b);
    let r3 = ratio(&combined_a, &combined_b);

    r1.max(r2).max(r3)
}

fn join_sorted(base: &[&str], extra: &[&str]) -> String {
    let mut all: Vec<&str> = base.iter().chain(extra.iter()).copied().collect();
    all.sort_unstable();
    all.join(" ")
}

fn sorted_tokens(input: &str) -> String {
    let mut tokens: Vec<&str> = input.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// `(len_a + len_b - levenshtein_distance) / (len_a + len_b)`, clamped to
/// `[0, 1]`. Two empty strings are considered identical (ratio 1.0).
fn ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a_chars, &b_chars);
    ((total - distance) as f64 / total as f64).clamp(0.0, 1.0)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
