//! Scoped unit of work.
//!
//! A [`Session`] owns one pooled connection for as long as it lives. Dropping
//! it, on any path, rolls back a transaction the caller left open and hands
//! the connection back to the pool. Transaction boundaries are the caller's
//! business: the session runs in autocommit mode until [`Session::begin`].

use std::sync::Arc;

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tokio::sync::OwnedSemaphorePermit;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::models::{parse_instant, Record, Stored};
use crate::pool::ConnectionPool;

pub struct Session {
    pool: Arc<ConnectionPool>,
    // Only `None` inside `Drop`.
    conn: Option<Connection>,
    _permit: OwnedSemaphorePermit,
}

impl Session {
    pub(crate) fn new(
        pool: Arc<ConnectionPool>,
        conn: Connection,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            pool,
            conn: Some(conn),
            _permit: permit,
        }
    }

    /// Direct access to the underlying connection for ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("session connection is only taken on drop")
    }

    pub fn begin(&self) -> Result<()> {
        self.conn().execute_batch("BEGIN")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.conn().execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        self.conn().execute_batch("ROLLBACK")?;
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn().is_autocommit()
    }

    /// Run `f` on tokio's blocking pool and release the session there once
    /// it returns. Use this from async code for anything that may wait on a
    /// database lock.
    pub async fn run<F, R>(self, f: F) -> Result<R>
    where
        F: FnOnce(&Session) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(move || f(&self)).await?
    }

    // -- Records ------------------------------------------------------------

    /// Insert a new record. `id` is assigned by the database and both
    /// timestamps are set to now.
    pub fn insert<T: Record + Clone>(&self, record: &T) -> Result<Stored<T>> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();

        let mut values = record.to_values();
        values.push(Value::Text(stamp.clone()));
        values.push(Value::Text(stamp));

        let placeholders = (1..=values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}, created_at, updated_at) VALUES ({})",
            T::TABLE,
            T::COLUMNS.join(", "),
            placeholders,
        );

        let conn = self.conn();
        conn.execute(&sql, params_from_iter(values))?;

        Ok(Stored {
            id: conn.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            record: record.clone(),
        })
    }

    pub fn get<T: Record>(&self, id: i64) -> Result<Stored<T>> {
        let sql = format!("{} WHERE id = ?1", select_sql::<T>());
        self.conn()
            .query_row(&sql, params![id], row_to_stored::<T>)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Look a record up by its identity in the source system. If the source
    /// sent duplicates, the oldest row wins.
    pub fn find_by_external_id<T: Record>(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<Stored<T>>> {
        let sql = format!(
            "{} WHERE source = ?1 AND external_id = ?2 ORDER BY id ASC LIMIT 1",
            select_sql::<T>()
        );
        let found = self
            .conn()
            .query_row(&sql, params![source, external_id], row_to_stored::<T>)
            .optional()?;
        Ok(found)
    }

    pub fn list<T: Record>(&self) -> Result<Vec<Stored<T>>> {
        let sql = format!("{} ORDER BY id ASC", select_sql::<T>());
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], row_to_stored::<T>)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Write every domain column of `stored` back and refresh `updated_at`.
    /// `id` and `created_at` never change.
    pub fn update<T: Record + Clone>(&self, stored: &Stored<T>) -> Result<Stored<T>> {
        let now = Utc::now();

        let mut values = stored.record.to_values();
        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {}, updated_at = ?{} WHERE id = ?{}",
            T::TABLE,
            assignments,
            values.len() + 1,
            values.len() + 2,
        );
        values.push(Value::Text(now.to_rfc3339()));
        values.push(Value::Integer(stored.id));

        let affected = self.conn().execute(&sql, params_from_iter(values))?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(Stored {
            id: stored.id,
            created_at: stored.created_at,
            updated_at: now,
            record: stored.record.clone(),
        })
    }

    // -- Schema introspection -----------------------------------------------

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if !conn.is_autocommit() {
            warn!("Session dropped with an open transaction, rolling back");
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                // Don't hand a connection in an unknown state back to the pool.
                warn!(error = %e, "Rollback failed, discarding connection");
                return;
            }
        }

        self.pool.release(conn);
    }
}

fn select_sql<T: Record>() -> String {
    format!(
        "SELECT id, created_at, updated_at, {} FROM {}",
        T::COLUMNS.join(", "),
        T::TABLE
    )
}

fn row_to_stored<T: Record>(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stored<T>> {
    let id: i64 = row.get(0)?;
    let created_str: String = row.get(1)?;
    let updated_str: String = row.get(2)?;

    Ok(Stored {
        id,
        created_at: parse_instant(&created_str, 1)?,
        updated_at: parse_instant(&updated_str, 2)?,
        record: T::from_row(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::models::{Account, Transaction};
    use crate::testing::{file_persistence, memory_session};
    use crate::StoreError;

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let (_persistence, session) = memory_session().await;
        assert!(matches!(
            session.get::<Account>(42),
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn find_missing_external_id_is_none() {
        let (_persistence, session) = memory_session().await;
        let found = session
            .find_by_external_id::<Account>("lunchmoney", "nope")
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn external_id_is_scoped_to_source() {
        let (_persistence, session) = memory_session().await;
        session.insert(&Account::new("lunchmoney", "acc_1")).unwrap();
        let other = session.insert(&Account::new("manual", "acc_1")).unwrap();

        let found = session
            .find_by_external_id::<Account>("manual", "acc_1")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, other.id);
    }

    #[tokio::test]
    async fn update_refreshes_updated_at_only() {
        let (_persistence, session) = memory_session().await;
        let mut stored = session
            .insert(&Transaction::new("lunchmoney", "txn_1"))
            .unwrap();

        stored.is_pending = true;
        stored.amount = Some(Decimal::new(-1999, 2));
        let updated = session.update(&stored).unwrap();

        assert_eq!(updated.id, stored.id);
        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at >= stored.updated_at);

        let fetched = session.get::<Transaction>(stored.id).unwrap();
        assert_eq!(fetched, updated);
        assert!(fetched.is_pending);
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let (_persistence, session) = memory_session().await;
        let mut stored = session.insert(&Account::new("lunchmoney", "acc_1")).unwrap();
        stored.id += 100;
        assert!(matches!(session.update(&stored), Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn list_returns_insertion_order() {
        let (_persistence, session) = memory_session().await;
        for n in 0..3 {
            session
                .insert(&Account::new("lunchmoney", format!("acc_{n}")))
                .unwrap();
        }
        let ids: Vec<String> = session
            .list::<Account>()
            .unwrap()
            .into_iter()
            .map(|a| a.into_record().external_id)
            .collect();
        assert_eq!(ids, ["acc_0", "acc_1", "acc_2"]);
    }

    #[tokio::test]
    async fn dropping_session_rolls_back_open_transaction() {
        let (persistence, session) = memory_session().await;
        session.begin().unwrap();
        assert!(session.in_transaction());
        session.insert(&Account::new("lunchmoney", "acc_tx")).unwrap();
        drop(session);

        let session = persistence.acquire_session().await.unwrap();
        assert!(!session.in_transaction());
        assert!(session
            .find_by_external_id::<Account>("lunchmoney", "acc_tx")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible_to_next_session() {
        let (_dir, persistence) = file_persistence();

        {
            let session = persistence.acquire_session().await.unwrap();
            session.begin().unwrap();
            session.insert(&Account::new("lunchmoney", "acc_c")).unwrap();
            session.commit().unwrap();
        }

        let session = persistence.acquire_session().await.unwrap();
        assert!(session
            .find_by_external_id::<Account>("lunchmoney", "acc_c")
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn session_is_released_on_error_path() {
        let (persistence, session) = memory_session().await;
        drop(session);

        async fn failing_unit_of_work(
            persistence: &crate::Persistence,
        ) -> crate::Result<()> {
            let session = persistence.acquire_session().await?;
            session.get::<Account>(999)?;
            Ok(())
        }

        assert!(failing_unit_of_work(&persistence).await.is_err());

        // The single in-memory connection is back in the pool.
        let pool = persistence.pool().await.unwrap();
        assert_eq!(pool.idle_connections(), 1);
        assert!(persistence.acquire_session().await.is_ok());
    }

    #[tokio::test]
    async fn run_executes_off_runtime_and_releases_session() {
        let (persistence, session) = memory_session().await;

        let id = session
            .run(|session| Ok(session.insert(&Account::new("lunchmoney", "acc_run"))?.id))
            .await
            .unwrap();

        let pool = persistence.pool().await.unwrap();
        assert_eq!(pool.idle_connections(), 1);

        let fetched = persistence
            .run(move |session| session.get::<Account>(id))
            .await
            .unwrap();
        assert_eq!(fetched.external_id, "acc_run");
        assert_eq!(pool.idle_connections(), 1);
    }

    #[tokio::test]
    async fn run_error_rolls_back_open_transaction() {
        let (persistence, session) = memory_session().await;

        let result = session
            .run(|session| {
                session.begin()?;
                session.insert(&Account::new("lunchmoney", "acc_lost"))?;
                session.get::<Account>(999)
            })
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));

        let found = persistence
            .run(|session| session.find_by_external_id::<Account>("lunchmoney", "acc_lost"))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
