//! Configuration surface for the matching and canonicalization engine.
//!
//! Every field has a default matching §6 of the specification; operators
//! override only the handful they care about.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the dedupe engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub text: TextConfig,
    pub scoring: ScoringConfig,
    pub thresholds: ThresholdConfig,
    pub geo: GeoConfig,
    pub date: DateConfig,
    pub title: TitleConfig,
    pub cluster: ClusterConfig,
    pub category_weights: CategoryWeightConfig,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text: TextConfig::default(),
            scoring: ScoringConfig::default(),
            thresholds: ThresholdConfig::default(),
            geo: GeoConfig::default(),
            date: DateConfig::default(),
            title: TitleConfig::default(),
            cluster: ClusterConfig::default(),
            category_weights: CategoryWeightConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

/// Normalizer inputs that aren't pure algorithm: the flat synonym map
/// (§4.1 step 4), the district→parent-municipality alias table used for
/// city normalization, and the configured title prefixes (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TextConfig {
    /// variant -> canonical. Must not contain a canonical form that is
    /// itself a variant of another group (spec.md §4.1 invariant).
    pub synonyms: HashMap<String, String>,
    /// district/neighborhood name -> parent municipality, applied after
    /// text normalization during city normalization.
    pub district_aliases: HashMap<String, String>,
    /// Title prefixes stripped by a trailing dash (`-`, `--`, `–`, `—`).
    pub dash_prefixes: Vec<String>,
    /// Title prefixes stripped by a trailing colon.
    pub colon_prefixes: Vec<String>,
}

/// Per-signal weights used by the combiner (§4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalWeights {
    pub date: f64,
    pub geo: f64,
    pub title: f64,
    pub description: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self { date: 0.30, geo: 0.25, title: 0.30, description: 0.15 }
    }
}

impl SignalWeights {
    /// Linearly rescale the four weights so they sum to 1.0.
    ///
    /// A zero-sum input (all weights zero) falls back to the default
    /// weights rather than dividing by zero.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let sum = self.date + self.geo + self.title + self.description;
        if sum <= f64::EPSILON {
            return Self::default();
        }
        Self { date: self.date / sum, geo: self.geo / sum, title: self.title / sum, description: self.description / sum }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: SignalWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { weights: SignalWeights::default() }
    }
}

/// Decision thresholds and the title veto (§4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub high: f64,
    pub low: f64,
    pub title_veto: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { high: 0.75, low: 0.35, title_veto: 0.30 }
    }
}

/// Geo scorer tuning (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub max_distance_km: f64,
    pub min_confidence: f64,
    pub neutral_score: f64,
    pub venue_match_distance_km: f64,
    pub venue_mismatch_factor: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 10.0,
            min_confidence: 0.85,
            neutral_score: 0.5,
            venue_match_distance_km: 1.0,
            venue_mismatch_factor: 0.5,
        }
    }
}

/// Date scorer tuning (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    pub time_tolerance_minutes: i64,
    pub time_close_minutes: i64,
    pub close_factor: f64,
    pub far_factor: f64,
    pub time_gap_penalty_hours: f64,
    pub time_gap_penalty_factor: f64,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            time_tolerance_minutes: 30,
            time_close_minutes: 90,
            close_factor: 0.7,
            far_factor: 0.3,
            time_gap_penalty_hours: 2.0,
            time_gap_penalty_factor: 0.15,
        }
    }
}

/// Cross-source-type title blend override (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSourceTypeBlend {
    pub primary_weight: f64,
    pub secondary_weight: f64,
    pub blend_lower: f64,
    pub blend_upper: f64,
}

impl Default for CrossSourceTypeBlend {
    fn default() -> Self {
        Self { primary_weight: 0.4, secondary_weight: 0.6, blend_lower: 0.25, blend_upper: 0.95 }
    }
}

/// Title scorer tuning (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub primary_weight: f64,
    pub secondary_weight: f64,
    pub blend_lower: f64,
    pub blend_upper: f64,
    pub cross_source_type: CrossSourceTypeBlend,
    /// Source-type pairs eligible for the cross-source-type override.
    /// Default: only article<->listing, per spec.md's Open Question answer.
    pub cross_source_type_pairs: Vec<(String, String)>,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            primary_weight: 0.7,
            secondary_weight: 0.3,
            blend_lower: 0.40,
            blend_upper: 0.80,
            cross_source_type: CrossSourceTypeBlend::default(),
            cross_source_type_pairs: vec![("article".to_string(), "listing".to_string())],
        }
    }
}

/// Clustering coherence thresholds (§4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub max_cluster_size: usize,
    pub min_internal_similarity: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { max_cluster_size: 15, min_internal_similarity: 0.40 }
    }
}

/// Category-aware weight overrides (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CategoryWeightConfig {
    /// Categories consulted in order; first one present in both events wins.
    pub priority: Vec<String>,
    pub overrides: HashMap<String, SignalWeights>,
}

/// LLM resolver configuration (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub max_concurrent_requests: usize,
    pub confidence_threshold: f64,
    pub cache_enabled: bool,
    pub cost_per_1m_input_tokens: f64,
    pub cost_per_1m_output_tokens: f64,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_output_tokens: 512,
            max_concurrent_requests: 4,
            confidence_threshold: 0.6,
            cache_enabled: true,
            cost_per_1m_input_tokens: 0.150,
            cost_per_1m_output_tokens: 0.600,
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}
