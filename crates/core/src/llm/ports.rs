//! Port interfaces the LLM resolver depends on. Implementations live in
//! the infra crate (HTTP client, SQLite-backed cache and usage log).

use async_trait::async_trait;
use regiodedupe_domain::{CacheEntry, LlmVerdict, Result, UsageLogRow};

/// One structured resolution returned by the external LLM for a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResolution {
    /// `None` when the response parsed but carried a decision literal
    /// outside the known `same`/`different` set — a well-formed reply the
    /// resolver still can't act on, distinct from a transport failure.
    pub decision: Option<LlmVerdict>,
    pub confidence: f64,
    pub reasoning: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// A request to resolve one ambiguous pair, carrying everything the
/// prompt needs — titles, descriptions, dates, location — already
/// extracted so the client stays a thin typed wrapper (§9 design note).
#[derive(Debug, Clone, PartialEq)]
pub struct LlmPairContext {
    pub title_a: String,
    pub title_b: String,
    pub description_a: Option<String>,
    pub description_b: Option<String>,
    pub city: Option<String>,
    pub dates_a: Vec<String>,
    pub dates_b: Vec<String>,
}

/// Thin typed wrapper around the external structured-output LLM call.
#[async_trait]
pub trait LlmResolverPort: Send + Sync {
    /// Resolve one pair. Transport or schema failures are returned as
    /// [`regiodedupe_domain::DedupeError::Unavailable`]; the resolver
    /// loop fails open to `ambiguous` on that error. A successfully parsed
    /// response with an unrecognized decision literal is returned `Ok`
    /// with [`LlmResolution::decision`] set to `None`, not as an error.
    async fn resolve_pair(&self, context: &LlmPairContext) -> Result<LlmResolution>;

    /// Model identifier this client is currently configured to use. Cache
    /// hits are only reusable when they match this model.
    fn model(&self) -> &str;
}

/// Content-addressed cache of prior LLM resolutions, keyed by `pair_hash`.
#[async_trait]
pub trait CacheRepository: Send + Sync {
    async fn get(&self, pair_hash: &str) -> Result<Option<CacheEntry>>;

    /// Insert or ignore on a duplicate `pair_hash` (concurrent producers
    /// may race; the first writer wins).
    async fn put(&self, entry: CacheEntry) -> Result<()>;
}

/// Append-only usage/cost ledger for LLM calls and cache hits.
#[async_trait]
pub trait UsageLogRepository: Send + Sync {
    async fn append(&self, row: UsageLogRow) -> Result<()>;
}
