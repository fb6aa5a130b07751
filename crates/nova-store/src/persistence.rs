//! Process-level persistence context.
//!
//! [`Persistence`] replaces a global engine/session-factory pair: it is built
//! once at startup, cloned into whatever needs the database, and owns the
//! lazily-constructed [`ConnectionPool`]. The pool doubles as the session
//! factory. Tests get a clean slate by building a new `Persistence`.

use std::sync::Arc;

use nova_shared::constants::{ENV_DATABASE_URL, ENV_NOVA_DATABASE_URL};
use tokio::sync::OnceCell;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::pool::{ConnectionPool, PoolOptions};
use crate::session::Session;
use crate::url::DatabaseUrl;

const NOT_CONFIGURED: &str =
    "Database URL not configured. Set NOVA_DATABASE_URL or DATABASE_URL in your environment.";

/// Resolve the connection string from the configured value, then
/// `NOVA_DATABASE_URL`, then `DATABASE_URL`. Empty values are skipped.
pub fn resolve_connection_string(configured: Option<&str>) -> Result<String> {
    resolve_connection_string_with(configured, |key| std::env::var(key).ok())
}

/// Same as [`resolve_connection_string`] with an explicit environment lookup.
pub fn resolve_connection_string_with<F>(configured: Option<&str>, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    non_empty(configured.map(str::to_string))
        .or_else(|| non_empty(lookup(ENV_NOVA_DATABASE_URL)))
        .or_else(|| non_empty(lookup(ENV_DATABASE_URL)))
        .ok_or_else(|| StoreError::Configuration(NOT_CONFIGURED.to_string()))
}

/// Which database backend this process can talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceProvider {
    Sqlite(DatabaseUrl),
    /// Persistence is unavailable; every request fails fast with
    /// [`StoreError::Configuration`] carrying `reason`.
    NotConfigured { reason: String },
}

impl PersistenceProvider {
    pub fn from_connection_string(raw: &str) -> Result<Self> {
        DatabaseUrl::parse(raw).map(Self::Sqlite)
    }

    /// Resolve and parse the connection string. Never fails: problems are
    /// logged and turned into [`PersistenceProvider::NotConfigured`] so the
    /// service can start without a database.
    pub fn resolve(configured: Option<&str>) -> Self {
        match resolve_connection_string(configured).and_then(|raw| Self::from_connection_string(&raw))
        {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    event_type = "db_not_configured",
                    error_kind = e.kind(),
                    error = %e,
                    "Persistence disabled"
                );
                Self::NotConfigured {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn url(&self) -> Result<&DatabaseUrl> {
        match self {
            Self::Sqlite(url) => Ok(url),
            Self::NotConfigured { reason } => Err(StoreError::Configuration(reason.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceStatus {
    NotConfigured,
    /// Configured, pool not built yet.
    Uninitialized,
    Ready,
}

impl PersistenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
        }
    }
}

#[derive(Clone)]
pub struct Persistence {
    inner: Arc<Inner>,
}

struct Inner {
    provider: PersistenceProvider,
    options: PoolOptions,
    pool: OnceCell<Arc<ConnectionPool>>,
}

impl Persistence {
    pub fn new(provider: PersistenceProvider, options: PoolOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                options,
                pool: OnceCell::new(),
            }),
        }
    }

    /// Build from the configured URL and environment; see
    /// [`PersistenceProvider::resolve`].
    pub fn from_config(configured: Option<&str>, options: PoolOptions) -> Self {
        Self::new(PersistenceProvider::resolve(configured), options)
    }

    pub fn provider(&self) -> &PersistenceProvider {
        &self.inner.provider
    }

    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    /// Return the process pool, building it on first use.
    ///
    /// Concurrent first callers wait on the same construction, so exactly
    /// one pool is ever built. A failed construction is not cached; the
    /// next call starts a fresh round of attempts.
    pub async fn pool(&self) -> Result<Arc<ConnectionPool>> {
        let url = self.inner.provider.url()?;
        let pool = self
            .inner
            .pool
            .get_or_try_init(|| ConnectionPool::connect(url.clone(), &self.inner.options))
            .await?;
        Ok(Arc::clone(pool))
    }

    /// Check out a unit of work. The returned [`Session`] releases its
    /// connection when dropped.
    pub async fn acquire_session(&self) -> Result<Session> {
        self.pool().await?.session().await
    }

    /// Acquire a session and run `f` with it off the async workers; see
    /// [`Session::run`].
    pub async fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Session) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.acquire_session().await?.run(f).await
    }

    /// Current state, without triggering pool construction.
    pub fn status(&self) -> PersistenceStatus {
        match (&self.inner.provider, self.inner.pool.initialized()) {
            (PersistenceProvider::NotConfigured { .. }, _) => PersistenceStatus::NotConfigured,
            (_, false) => PersistenceStatus::Uninitialized,
            (_, true) => PersistenceStatus::Ready,
        }
    }

    /// Stop handing out new sessions, if the pool was ever built.
    pub fn close(&self) {
        if let Some(pool) = self.inner.pool.get() {
            pool.close();
        }
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("provider", &self.inner.provider)
            .field("status", &self.status())
            .finish()
    }
}
