//! Connection-string parsing.
//!
//! Only SQLite is compiled in. Accepted forms:
//! - `sqlite::memory:`, `sqlite:///:memory:`, `:memory:` for a private
//!   in-memory database
//! - `sqlite:///abs/path.db`, `sqlite://rel/path.db`, `sqlite:rel/path.db`
//! - a bare filesystem path

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// In-memory database that lives as long as its single connection.
    Memory,
    /// On-disk database file.
    File(PathBuf),
}

impl DatabaseUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StoreError::Configuration(
                "Database URL is empty".to_string(),
            ));
        }

        let rest = if let Some(rest) = raw.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = raw.strip_prefix("sqlite:") {
            rest
        } else if let Some((scheme, _)) = raw.split_once("://") {
            return Err(StoreError::UnsupportedScheme(scheme.to_string()));
        } else if let Some(scheme) = bare_scheme(raw) {
            // `file:nova.db`, `postgres:...`
            return Err(StoreError::UnsupportedScheme(scheme.to_string()));
        } else {
            raw
        };

        // `sqlite:///:memory:` leaves a leading slash behind
        let rest = rest.split('?').next().unwrap_or_default();
        match rest.trim_start_matches('/') {
            ":memory:" | "memory:" => return Ok(Self::Memory),
            "" => {
                return Err(StoreError::Configuration(format!(
                    "Database URL has no path: {raw}"
                )))
            }
            _ => {}
        }

        Ok(Self::File(PathBuf::from(rest)))
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Open and configure a fresh connection.
    pub fn open(&self) -> rusqlite::Result<Connection> {
        let conn = match self {
            Self::Memory => Connection::open_in_memory()?,
            Self::File(path) => {
                let conn = Connection::open(path)?;
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn
            }
        };

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(conn)
    }
}

/// Scheme of a `scheme:rest` URL without `//`. Single letters are left alone
/// so Windows drive paths still parse as files.
fn bare_scheme(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "sqlite::memory:"),
            Self::File(path) => write!(f, "sqlite://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_forms() {
        for raw in ["sqlite::memory:", "sqlite:///:memory:", ":memory:", "sqlite://:memory:"] {
            assert_eq!(DatabaseUrl::parse(raw).unwrap(), DatabaseUrl::Memory, "{raw}");
        }
    }

    #[test]
    fn test_file_forms() {
        assert_eq!(
            DatabaseUrl::parse("sqlite:///var/lib/nova/nova.db").unwrap(),
            DatabaseUrl::File(PathBuf::from("/var/lib/nova/nova.db"))
        );
        assert_eq!(
            DatabaseUrl::parse("sqlite://data/nova.db").unwrap(),
            DatabaseUrl::File(PathBuf::from("data/nova.db"))
        );
        assert_eq!(
            DatabaseUrl::parse("nova.db").unwrap(),
            DatabaseUrl::File(PathBuf::from("nova.db"))
        );
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = DatabaseUrl::parse("postgresql://settings-db/test").unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedScheme(ref s) if s == "postgresql"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_bare_scheme_is_not_a_file_name() {
        let err = DatabaseUrl::parse("file:nova.db?mode=ro").unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedScheme(ref s) if s == "file"));
        assert!(err.is_configuration());

        assert_eq!(
            DatabaseUrl::parse("C:\\nova\\nova.db").unwrap(),
            DatabaseUrl::File(PathBuf::from("C:\\nova\\nova.db"))
        );
    }

    #[test]
    fn test_empty_is_configuration_error() {
        assert!(DatabaseUrl::parse("   ").unwrap_err().is_configuration());
        assert!(DatabaseUrl::parse("sqlite://").unwrap_err().is_configuration());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = DatabaseUrl::File(dir.path().join("nova.db"));
        let conn = url.open().expect("should open");
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
    }
}
