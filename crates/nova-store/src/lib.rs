//! # nova-store
//!
//! Persistence layer for Nova's financial records, backed by SQLite.
//!
//! A [`Persistence`] context is built once at startup and handed to every
//! component that needs the database. It lazily creates a single
//! [`ConnectionPool`] (with bounded retry on the first connection) and hands
//! out scoped [`Session`]s that are always released when dropped.

pub mod migrations;
pub mod models;
pub mod persistence;
pub mod pool;
pub mod session;
pub mod url;

mod accounts;
mod budgets;
mod error;
mod recurring_items;
mod transactions;

pub use error::{Result, StoreError};
pub use models::*;
pub use persistence::{
    resolve_connection_string, resolve_connection_string_with, Persistence, PersistenceProvider,
    PersistenceStatus,
};
pub use pool::{ConnectionPool, PoolOptions};
pub use session::Session;
pub use url::DatabaseUrl;
