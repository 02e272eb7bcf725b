//! §4.7 LLM Resolver + Cache + Cost Ledger.

pub mod hash;
pub mod ports;
pub mod resolver;

pub use hash::pair_hash;
pub use ports::{CacheRepository, LlmPairContext, LlmResolution, LlmResolverPort, UsageLogRepository};
pub use resolver::resolve_ambiguous;
