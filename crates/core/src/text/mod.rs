//! Text normalization (§4.1) and title prefix stripping (§4.2).

pub mod fuzzy;
pub mod normalizer;
pub mod prefix_stripper;

pub use fuzzy::{token_set_ratio, token_sort_ratio};
pub use normalizer::{normalize, normalize_city};
pub use prefix_stripper::strip_prefix;
