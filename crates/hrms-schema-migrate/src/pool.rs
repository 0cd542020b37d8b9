//! Connection pool handle.
//!
//! The pool is an explicit handle threaded through every operation rather
//! than ambient global state. Process-wide sharing is available through
//! [`Db::shared`], which is idempotent: repeated initialization attempts
//! from multiple entry points all observe the same pool.

use crate::config::DbConfig;
use crate::error::{MigrateError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{info, warn};

/// Retry policy for pool establishment.
///
/// Applied only at the connection-establishment boundary; steady-state
/// catalog queries are never retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of connection attempts before giving up.
    pub attempts: u32,

    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

static SHARED: OnceCell<Db> = OnceCell::const_new();

/// Pooled database handle.
///
/// Every logical operation borrows one connection, executes, and releases
/// it immediately. No operation holds a connection across multiple catalog
/// queries, so the several queries that describe one table see a
/// best-effort consistency window, not a transactional snapshot.
#[derive(Clone)]
pub struct Db {
    pool: Pool,
}

impl Db {
    /// Create a pool and verify connectivity, retrying per `retry`.
    pub async fn connect(config: &DbConfig, retry: RetryPolicy) -> Result<Self> {
        let mut last_err = None;

        for attempt in 1..=retry.attempts.max(1) {
            match Self::try_connect(config).await {
                Ok(db) => {
                    info!(
                        "Connected to PostgreSQL: {}:{}/{} (pool_size={})",
                        config.host, config.port, config.database, config.pool_size
                    );
                    return Ok(db);
                }
                Err(e) => {
                    warn!(
                        "Connection attempt {}/{} failed: {}",
                        attempt, retry.attempts, e
                    );
                    last_err = Some(e);
                    if attempt < retry.attempts {
                        tokio::time::sleep(retry.delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            MigrateError::pool("no connection attempts made", "establishing pool")
        }))
    }

    /// Return the process-wide shared handle, creating it on first call.
    ///
    /// Multiple entry-point scripts may each attempt initialization; only
    /// the first wins and later callers get the existing pool.
    pub async fn shared(config: &DbConfig) -> Result<&'static Db> {
        SHARED
            .get_or_try_init(|| Db::connect(config, RetryPolicy::default()))
            .await
    }

    async fn try_connect(config: &DbConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| MigrateError::pool(e, "creating PostgreSQL pool"))?;

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;

        Ok(Self { pool })
    }

    /// Borrow one pooled connection. Released when the guard drops, on
    /// every exit path.
    pub async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting connection"))
    }

    /// Execute a bound-parameterized query on a freshly borrowed connection.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>> {
        let client = self.client().await?;
        Ok(client.query(sql, params).await?)
    }

    /// Round-trip latency of a trivial query.
    pub async fn ping(&self) -> Result<Duration> {
        let client = self.client().await?;
        let start = Instant::now();
        client.simple_query("SELECT 1").await?;
        Ok(start.elapsed())
    }
}
