//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

/// Blocking geocell bounding box (south-west Germany / Breisgau region).
pub const GEOCELL_LAT_MIN: f64 = 47.5;
pub const GEOCELL_LAT_MAX: f64 = 48.5;
pub const GEOCELL_LON_MIN: f64 = 7.3;
pub const GEOCELL_LON_MAX: f64 = 8.5;

/// Geocell rounding step, approximating 10km grid cells at this latitude.
pub const GEOCELL_LAT_STEP: f64 = 0.09;
pub const GEOCELL_LON_STEP: f64 = 0.13;

/// Minimum geo confidence required for a record to participate in
/// date-geocell blocking.
pub const GEOCELL_MIN_CONFIDENCE: f64 = 0.85;

/// Sentinel provenance value for union-merged fields.
pub const PROVENANCE_UNION_ALL_SOURCES: &str = "union_all_sources";

/// Minimum title length preferred by the `longest_non_generic` strategy.
pub const TITLE_MIN_NON_GENERIC_LENGTH: usize = 10;

/// Maximum days a cluster's dates may span before it is flagged incoherent.
pub const COHERENCE_MAX_DATE_SPREAD_DAYS: i64 = 3;
