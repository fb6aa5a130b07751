//! Bounded SQLite connection pool.
//!
//! The pool is only ever built through [`ConnectionPool::connect`], which
//! retries the first connection with linear backoff and runs migrations
//! before the pool is handed to anyone. Callers never observe a pool that
//! has not passed its liveness probe.
//!
//! Opening connections, probing and migrating all run on tokio's blocking
//! pool: a locked database file can hold a connection attempt for the whole
//! busy timeout.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::migrations;
use crate::session::Session;
use crate::url::DatabaseUrl;

/// Tuning for pool construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Attempts at the initial connection + probe. Values below 1 count as 1.
    pub max_retries: u32,
    /// Base delay; the wait after attempt `n` is `backoff * n`.
    pub backoff: Duration,
    /// Upper bound on open connections. In-memory databases always use 1.
    pub max_connections: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(1),
            max_connections: 5,
        }
    }
}

pub struct ConnectionPool {
    url: DatabaseUrl,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    max_connections: usize,
}

impl ConnectionPool {
    /// Open the first connection, probe it with `SELECT 1`, apply migrations
    /// and return the ready pool.
    ///
    /// Fails with [`StoreError::PersistenceUnavailable`] once `max_retries`
    /// attempts have failed, carrying the last underlying error.
    pub async fn connect(url: DatabaseUrl, options: &PoolOptions) -> Result<Arc<Self>> {
        let max_retries = options.max_retries.max(1);
        let mut attempt = 1;

        let conn = loop {
            let target = url.clone();
            match tokio::task::spawn_blocking(move || open_and_probe(&target)).await? {
                Ok(conn) => {
                    info!(
                        event_type = "db_engine_init",
                        attempt,
                        url = %url,
                        "Database connection pool initialized"
                    );
                    break conn;
                }
                Err(e) if attempt < max_retries => {
                    warn!(
                        event_type = "db_engine_retry",
                        attempt,
                        error = %e,
                        "Database connection attempt failed"
                    );
                    tokio::time::sleep(options.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        event_type = "db_engine_retry",
                        attempt,
                        error = %e,
                        "Database connection attempt failed, giving up"
                    );
                    return Err(StoreError::PersistenceUnavailable {
                        attempts: max_retries,
                        source: e,
                    });
                }
            }
        };

        let conn = tokio::task::spawn_blocking(move || {
            migrations::run_migrations(&conn)?;
            Ok::<_, StoreError>(conn)
        })
        .await??;

        let max_connections = if url.is_memory() {
            1
        } else {
            options.max_connections.max(1)
        };

        Ok(Arc::new(Self {
            url,
            idle: Mutex::new(vec![conn]),
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }))
    }

    /// Check out a connection as a scoped [`Session`].
    ///
    /// Waits while all connections are in use. Never retries: a failure to
    /// open a new connection is returned as-is.
    pub async fn session(self: &Arc<Self>) -> Result<Session> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::PoolClosed)?;

        let idle = self.idle.lock().pop();
        let conn = match idle {
            Some(conn) => conn,
            None => {
                debug!(url = %self.url, "Opening new pooled connection");
                let url = self.url.clone();
                tokio::task::spawn_blocking(move || url.open()).await??
            }
        };

        Ok(Session::new(Arc::clone(self), conn, permit))
    }

    pub(crate) fn release(&self, conn: Connection) {
        self.idle.lock().push(conn);
    }

    /// Stop handing out sessions. Sessions already checked out stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn idle_connections(&self) -> usize {
        self.idle.lock().len()
    }
}

fn open_and_probe(url: &DatabaseUrl) -> rusqlite::Result<Connection> {
    let conn = url.open()?;
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    use super::*;

    fn quick_options(max_retries: u32) -> PoolOptions {
        PoolOptions {
            max_retries,
            backoff: Duration::from_millis(10),
            max_connections: 2,
        }
    }

    #[tokio::test]
    async fn connect_runs_migrations() {
        let pool = ConnectionPool::connect(DatabaseUrl::Memory, &quick_options(1))
            .await
            .unwrap();
        let session = pool.session().await.unwrap();
        let version: u32 = session
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[tokio::test]
    async fn memory_pool_is_single_connection() {
        let options = PoolOptions {
            max_connections: 8,
            ..quick_options(1)
        };
        let pool = ConnectionPool::connect(DatabaseUrl::Memory, &options)
            .await
            .unwrap();
        assert_eq!(pool.max_connections(), 1);
        assert_eq!(pool.idle_connections(), 1);
    }

    #[tokio::test]
    async fn retries_with_linear_backoff_then_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        let url = DatabaseUrl::File(dir.path().join("missing").join("nova.db"));

        let started = Instant::now();
        let err = ConnectionPool::connect(url, &quick_options(3))
            .await
            .err()
            .expect("connect should fail");

        // Waits of 10ms and 20ms between the three attempts, none after the last.
        assert!(started.elapsed() >= Duration::from_millis(30));
        match err {
            StoreError::PersistenceUnavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn locked_database_does_not_stall_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nova.db");
        let holder = Connection::open(&path).unwrap();
        holder
            .execute_batch("CREATE TABLE hold (x INTEGER); BEGIN EXCLUSIVE;")
            .unwrap();

        let ticks = Arc::new(AtomicU32::new(0));
        let ticker = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(100));
                loop {
                    interval.tick().await;
                    ticks.fetch_add(1, Ordering::Relaxed);
                }
            })
        };

        let result = ConnectionPool::connect(DatabaseUrl::File(path), &quick_options(1)).await;
        ticker.abort();

        assert!(matches!(
            result,
            Err(StoreError::PersistenceUnavailable { attempts: 1, .. })
        ));
        // The attempt waits out the 5s busy timeout; the single-threaded
        // runtime must keep polling other tasks meanwhile.
        assert!(ticks.load(Ordering::Relaxed) >= 10);
        drop(holder);
    }

    #[tokio::test]
    async fn sessions_are_bounded_by_max_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = DatabaseUrl::File(dir.path().join("nova.db"));
        let pool = ConnectionPool::connect(url, &quick_options(1)).await.unwrap();

        let first = pool.session().await.unwrap();
        let second = pool.session().await.unwrap();

        let third = tokio::time::timeout(Duration::from_millis(50), pool.session()).await;
        assert!(third.is_err(), "third session should wait for a free connection");

        drop(first);
        let third = tokio::time::timeout(Duration::from_millis(500), pool.session())
            .await
            .expect("a connection was released")
            .unwrap();

        drop(second);
        drop(third);
        assert_eq!(pool.idle_connections(), 2);
    }

    #[tokio::test]
    async fn closed_pool_refuses_sessions() {
        let pool = ConnectionPool::connect(DatabaseUrl::Memory, &quick_options(1))
            .await
            .unwrap();
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.session().await, Err(StoreError::PoolClosed)));
    }
}
