//! Top-level persistence port interfaces. Implementations live in the
//! infra crate, backed by SQLite (§6 Persisted state layout).

use async_trait::async_trait;
use regiodedupe_domain::{
    AuditRecord, CanonicalEvent, CanonicalEventSource, GroundTruthPair, MatchDecision, Record, Result,
};

/// Source event ingestion and retrieval.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Ingest one file's worth of records, recording the ingestion under
    /// `file_id` for idempotent re-runs.
    async fn ingest_file(&self, file_id: &str, records: Vec<Record>) -> Result<()>;

    /// All known source events, ordered by id (§5 ordering guarantee).
    async fn load_all(&self) -> Result<Vec<Record>>;

    async fn load_by_id(&self, id: &str) -> Result<Option<Record>>;
}

/// Deterministic and AI-resolved match decisions.
#[async_trait]
pub trait MatchDecisionRepository: Send + Sync {
    /// Delete all existing decisions and insert `decisions`, in one
    /// transaction (§5 replace-all semantics).
    async fn replace_all(&self, decisions: Vec<MatchDecision>) -> Result<()>;

    async fn load_all(&self) -> Result<Vec<MatchDecision>>;
}

/// Canonical events and their source links.
#[async_trait]
pub trait CanonicalEventRepository: Send + Sync {
    /// Delete all existing canonicals and links and insert the new set,
    /// in one transaction (§5 replace-all semantics).
    async fn replace_all(&self, canonicals: Vec<CanonicalEvent>, sources: Vec<CanonicalEventSource>) -> Result<()>;

    async fn load_all(&self) -> Result<Vec<CanonicalEvent>>;

    async fn get(&self, canonical_id: &str) -> Result<Option<CanonicalEvent>>;

    async fn upsert(&self, canonical: CanonicalEvent) -> Result<()>;

    async fn delete(&self, canonical_id: &str) -> Result<()>;

    async fn sources_for(&self, canonical_id: &str) -> Result<Vec<CanonicalEventSource>>;

    /// Find the canonical, if any, that currently links `source_event_id`.
    async fn find_by_source(&self, source_event_id: &str) -> Result<Option<String>>;

    /// Insert a link; ignored (not an error) if it already exists.
    async fn link_source(&self, link: CanonicalEventSource) -> Result<()>;

    /// Remove a link. Returns `Ok(false)` if the link was not present.
    async fn unlink_source(&self, canonical_id: &str, source_event_id: &str) -> Result<bool>;
}

/// Append-only review/audit log.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<()>;
}

/// Labeled pairs consumed by the evaluator (§4.13).
#[async_trait]
pub trait GroundTruthRepository: Send + Sync {
    async fn load_all(&self) -> Result<Vec<GroundTruthPair>>;
}
