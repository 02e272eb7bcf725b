//! §4.2 Prefix Stripper — removes a configured recurring series/section
//! label from the front of a title, operating on the *raw* title (before
//! normalization) so the stripped remainder can still be normalized on its
//! own terms.

use regiodedupe_domain::TextConfig;

const DASH_VARIANTS: [&str; 4] = ["-", "--", "\u{2013}", "\u{2014}"];

/// Strip a leading series/section prefix from `title`, per §4.2.
///
/// Tries a dash-terminated prefix first (`"Kinderfilm - Die Eiskönigin"` ->
/// `"Die Eiskönigin"` when `"Kinderfilm"` is configured), then a
/// colon-terminated prefix. Matching is case-insensitive on the prefix but
/// preserves the case of the remainder. Returns the original title
/// unchanged when no configured prefix matches.
#[must_use]
pub fn strip_prefix(title: &str, config: &TextConfig) -> String {
    if let Some(stripped) = strip_dash_prefix(title, &config.dash_prefixes) {
        return stripped;
    }
    if let Some(stripped) = strip_colon_prefix(title, &config.colon_prefixes) {
        return stripped;
    }
    title.to_string()
}

fn strip_dash_prefix(title: &str, prefixes: &[String]) -> Option<String> {
    for prefix in prefixes {
        for dash in DASH_VARIANTS {
            let needle = format!("{prefix}{dash}");
            if let Some(rest) = case_insensitive_strip(title, &needle) {
                let trimmed = rest.trim_start();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

fn strip_colon_prefix(title: &str, prefixes: &[String]) -> Option<String> {
    for prefix in prefixes {
        let needle = format!("{prefix}:");
        if let Some(rest) = case_insensitive_strip(title, &needle) {
            let trimmed = rest.trim_start();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// If `title` starts with `needle` (case-insensitively), return the
/// remainder of `title` after `needle`'s length, preserving original case.
fn case_insensitive_strip<'a>(title: &'a str, needle: &str) -> Option<&'a str> {
    if title.len() < needle.len() {
        return None;
    }
    let (head, tail) = title.split_at(needle.len());
    if head.eq_ignore_ascii_case(needle) {
        Some(tail)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(dash: &[&str], colon: &[&str]) -> TextConfig {
        TextConfig {
            dash_prefixes: dash.iter().map(|s| s.to_string()).collect(),
            colon_prefixes: colon.iter().map(|s| s.to_string()).collect(),
            ..TextConfig::default()
        }
    }

    #[test]
    fn strips_dash_prefix() {
        let c = cfg(&["Kinderfilm"], &[]);
        assert_eq!(strip_prefix("Kinderfilm - Die Eiskönigin", &c), "Die Eiskönigin");
    }

    #[test]
    fn strips_em_dash_variant() {
        let c = cfg(&["Kinderfilm"], &[]);
        assert_eq!(strip_prefix("Kinderfilm\u{2014}Die Eiskönigin", &c), "Die Eiskönigin");
    }

    #[test]
    fn strips_colon_prefix() {
        let c = cfg(&[], &["Vortragsreihe"]);
        assert_eq!(strip_prefix("Vortragsreihe: Stadtgeschichte", &c), "Stadtgeschichte");
    }

    #[test]
    fn case_insensitive_prefix_match() {
        let c = cfg(&["kinderfilm"], &[]);
        assert_eq!(strip_prefix("KINDERFILM - Die Eiskönigin", &c), "Die Eiskönigin");
    }

    #[test]
    fn no_match_returns_original() {
        let c = cfg(&["Kinderfilm"], &[]);
        assert_eq!(strip_prefix("Die Eiskönigin", &c), "Die Eiskönigin");
    }

    #[test]
    fn prefix_with_empty_remainder_is_not_stripped() {
        let c = cfg(&["Kinderfilm"], &[]);
        assert_eq!(strip_prefix("Kinderfilm -", &c), "Kinderfilm -");
    }
}
