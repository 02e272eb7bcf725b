//! Application context — dependency injection container wiring the
//! configuration and every repository/resolver adapter the commands need.

use std::path::PathBuf;
use std::sync::Arc;

use regiodedupe_core::llm::{CacheRepository, LlmResolverPort, UsageLogRepository};
use regiodedupe_core::ports::{AuditLogRepository, CanonicalEventRepository, EventRepository, GroundTruthRepository, MatchDecisionRepository};
use regiodedupe_domain::{Config, Result};
use regiodedupe_infra::database::{
    SqliteAuditLogRepository, SqliteCacheRepository, SqliteCanonicalEventRepository, SqliteEventRepository, SqliteGroundTruthRepository,
    SqliteMatchDecisionRepository, SqliteReviewService, SqliteUsageLogRepository,
};
use regiodedupe_infra::{DbManager, HttpClient, LlmHttpClient};

const DEFAULT_DB_PATH: &str = "regiodedupe.db";
const DEFAULT_POOL_SIZE: u32 = 8;

/// Holds the configuration and every repository/resolver adapter the
/// command handlers depend on. Built once per CLI invocation.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub events: Arc<dyn EventRepository>,
    pub decisions: Arc<dyn MatchDecisionRepository>,
    pub canonicals: Arc<dyn CanonicalEventRepository>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub ground_truth: Arc<dyn GroundTruthRepository>,
    pub cache: Arc<dyn CacheRepository>,
    pub usage_log: Arc<dyn UsageLogRepository>,
    pub review: Arc<SqliteReviewService>,
    pub llm: Option<Arc<dyn LlmResolverPort>>,
}

impl AppContext {
    /// Build the application context.
    ///
    /// `db_path`/`pool_size` are CLI-level concerns (the engine's own
    /// [`Config`] has no database fields — §6 Config surface is purely
    /// algorithmic) and fall back to `REGIODEDUPE_DB_PATH` /
    /// `REGIODEDUPE_DB_POOL_SIZE` env vars, then to conventional defaults.
    ///
    /// # Errors
    /// Returns an error if configuration loading, database connection, or
    /// (when AI is enabled) LLM client construction fails.
    pub fn new(db_path: Option<PathBuf>, pool_size: Option<u32>) -> Result<Self> {
        let config = regiodedupe_infra::load()?;

        let db_path = db_path
            .or_else(|| std::env::var("REGIODEDUPE_DB_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let pool_size = pool_size
            .or_else(|| std::env::var("REGIODEDUPE_DB_POOL_SIZE").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_POOL_SIZE);

        let db = Arc::new(DbManager::new(&db_path, pool_size)?);
        db.run_migrations()?;

        let llm: Option<Arc<dyn LlmResolverPort>> = if config.ai.enabled && config.ai.api_key.is_some() {
            let http_client = HttpClient::new()?;
            Some(Arc::new(LlmHttpClient::new(&config.ai, http_client)?))
        } else {
            None
        };

        Ok(Self {
            events: Arc::new(SqliteEventRepository::new(db.clone())),
            decisions: Arc::new(SqliteMatchDecisionRepository::new(db.clone())),
            canonicals: Arc::new(SqliteCanonicalEventRepository::new(db.clone())),
            audit_log: Arc::new(SqliteAuditLogRepository::new(db.clone())),
            ground_truth: Arc::new(SqliteGroundTruthRepository::new(db.clone())),
            cache: Arc::new(SqliteCacheRepository::new(db.clone())),
            usage_log: Arc::new(SqliteUsageLogRepository::new(db.clone())),
            review: Arc::new(SqliteReviewService::new(db.clone())),
            config,
            db,
            llm,
        })
    }
}
