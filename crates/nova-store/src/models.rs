//! Financial record models persisted in the Nova database.
//!
//! Each record kind is a plain struct of domain columns. Once stored it is
//! wrapped in [`Stored`], which adds the shared surrogate `id` and the
//! `created_at` / `updated_at` stamps. Every struct derives `Serialize` and
//! `Deserialize` so it can be returned straight from an HTTP handler.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Shared base shape
// ---------------------------------------------------------------------------

/// A record as it exists in the database.
///
/// `id` is assigned by SQLite on insert and never changes. `created_at` is set
/// once; `updated_at` is refreshed by every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Stored<T> {
    pub fn into_record(self) -> T {
        self.record
    }
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl<T> DerefMut for Stored<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.record
    }
}

/// Table mapping for a record kind.
///
/// `COLUMNS` lists the domain columns (everything except `id`, `created_at`
/// and `updated_at`) in the order produced by [`Record::to_values`] and read
/// by [`Record::from_row`]. The first two are always `source` and
/// `external_id`.
pub trait Record: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn to_values(&self) -> Vec<Value>;

    /// Read the domain columns starting at column index `offset`.
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self>;
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A financial account (checking, credit card, loan, ...) mirrored from an
/// external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Source system, e.g. `"lunchmoney"`.
    pub source: String,
    /// Identifier within `source`. Not globally unique.
    pub external_id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub subtype: Option<String>,
    pub currency: Option<String>,
    pub is_active: bool,
    pub is_excluded: bool,
    pub institution_name: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(source: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
            name: None,
            account_type: None,
            subtype: None,
            currency: None,
            is_active: true,
            is_excluded: false,
            institution_name: None,
            last_synced_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// A spending limit for a category over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub source: String,
    pub external_id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub limit_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub is_active: bool,
}

impl Budget {
    pub fn new(source: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
            name: None,
            category: None,
            period_start: None,
            period_end: None,
            limit_amount: None,
            currency: None,
            is_active: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A single ledger entry.
///
/// `account_external_id` points at an [`Account::external_id`] but is not
/// checked against the `accounts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub source: String,
    pub external_id: String,
    pub account_external_id: Option<String>,
    pub txn_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub payee: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub is_pending: bool,
    pub is_transfer: bool,
    pub cleared_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(source: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
            account_external_id: None,
            txn_date: None,
            amount: None,
            currency: None,
            payee: None,
            category: None,
            notes: None,
            is_pending: false,
            is_transfer: false,
            cleared_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recurring item
// ---------------------------------------------------------------------------

/// A bill or income that repeats on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringItem {
    pub source: String,
    pub external_id: String,
    pub name: Option<String>,
    pub payee: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    /// Free-form cadence as reported by the source, e.g. `"monthly"`.
    pub frequency: Option<String>,
    pub next_occurrence: Option<NaiveDate>,
    pub last_occurrence: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl RecurringItem {
    pub fn new(source: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
            name: None,
            payee: None,
            category: None,
            amount: None,
            currency: None,
            frequency: None,
            next_occurrence: None,
            last_occurrence: None,
            is_active: true,
            notes: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Column conversions
// ---------------------------------------------------------------------------

pub(crate) fn text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

pub(crate) fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

pub(crate) fn decimal(value: &Option<Decimal>) -> Value {
    match value {
        Some(d) => Value::Text(d.to_string()),
        None => Value::Null,
    }
}

pub(crate) fn date(value: &Option<NaiveDate>) -> Value {
    match value {
        Some(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        None => Value::Null,
    }
}

pub(crate) fn instant(value: &Option<DateTime<Utc>>) -> Value {
    match value {
        Some(ts) => Value::Text(ts.to_rfc3339()),
        None => Value::Null,
    }
}

pub(crate) fn read_flag(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    let value: i64 = row.get(idx)?;
    Ok(value != 0)
}

pub(crate) fn read_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse::<Decimal>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn read_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn read_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_instant(&s, idx)).transpose()
}

pub(crate) fn parse_instant(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
