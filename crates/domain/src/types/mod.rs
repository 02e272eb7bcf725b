//! Domain types and models

pub mod audit;
pub mod canonical;
pub mod decision;
pub mod record;

pub use audit::{
    AuditAction, AuditRecord, CacheEntry, GroundTruthLabel, GroundTruthPair, LlmVerdict,
    UsageLogRow,
};
pub use canonical::{CanonicalEvent, CanonicalEventSource};
pub use decision::{Decision, MatchDecision, SignalScores, Tier};
pub use record::{DateRange, GeoPoint, Record, SourceType};
