//! # RegioDedupe Infrastructure
//!
//! Infrastructure implementations of the ports defined in
//! `regiodedupe-core`: SQLite persistence, the LLM HTTP client,
//! configuration loading, and structured logging helpers.
//!
//! ## Architecture
//! - Implements traits defined in `regiodedupe-core`
//! - Depends on `regiodedupe-domain` and `regiodedupe-core`
//! - Contains all "impure" code (I/O, network, filesystem)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod llm;
pub mod logging;

pub use config::load;
pub use database::{
    DbManager, SqliteAuditLogRepository, SqliteCacheRepository, SqliteCanonicalEventRepository, SqliteEventRepository,
    SqliteGroundTruthRepository, SqliteMatchDecisionRepository, SqliteReviewService, SqliteUsageLogRepository,
};
pub use errors::{error_label, InfraError};
pub use http::{HttpClient, HttpClientBuilder};
pub use llm::LlmHttpClient;
