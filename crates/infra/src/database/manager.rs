//! Database connection manager backed by a pooled SQLite connection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use regiodedupe_domain::Result;
use rusqlite::params;
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps a pooled SQLite connection.
pub struct DbManager {
    pool: Arc<Pool<SqliteConnectionManager>>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size, opening (and creating,
    /// if absent) the SQLite file at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        });
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager).map_err(|e| InfraError::from(e).0)?;

        info!(db_path = %path.display(), max_connections = pool_size.max(1), "sqlite pool initialised");

        Ok(Self { pool: Arc::new(pool), path })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<Pool<SqliteConnectionManager>> {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<PooledConnection> {
        self.pool.get().map_err(|e| InfraError::from(e).0)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        Ok(())
    }

    /// Return the configured database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform a health check to verify database connectivity.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(|e| InfraError::from(e).0)?;
        Ok(())
    }
}

fn create_schema(conn: &PooledConnection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(|e| InfraError::from(e).0)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(|e| InfraError::from(e).0)?;
    Ok(())
}
