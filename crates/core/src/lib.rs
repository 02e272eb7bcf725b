//! # RegioDedupe Core
//!
//! Pure matching, clustering, and synthesis algorithms plus the port
//! traits the orchestrator depends on. Every fallible boundary returns
//! `regiodedupe_domain::Result`; the scorers, normalizer, combiner,
//! synthesizer, and clusterer are total functions with no I/O.
//!
//! ## Architecture
//! - Depends only on `regiodedupe-domain`
//! - No direct database or network access — adapters live in `regiodedupe-infra`

pub mod blocking;
pub mod candidates;
pub mod cluster;
pub mod enrich;
pub mod evaluate;
pub mod llm;
pub mod orchestrator;
pub mod ports;
pub mod review;
pub mod scoring;
pub mod synthesize;
pub mod text;

pub use blocking::blocking_keys;
pub use candidates::{generate_candidates, CandidatePair, CandidateResult, CandidateStats};
pub use cluster::{cluster, Cluster, ClusterResult};
pub use enrich::enrich;
pub use evaluate::{evaluate, filter_by_category, threshold_sweep, EvaluationMetrics};
pub use orchestrator::{build_canonicals, resolve_with_ai, score_candidates, CanonicalWithSources};
pub use ports::{AuditLogRepository, CanonicalEventRepository, EventRepository, GroundTruthRepository, MatchDecisionRepository};
pub use scoring::score_pair;
pub use synthesize::{build_canonical, synthesize, SynthesizedCanonical};
