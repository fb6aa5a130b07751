//! v001 -- Financial record tables.
//!
//! Creates `accounts`, `budgets`, `transactions` and `recurring_items`.
//! `(source, external_id)` is indexed but deliberately not unique, and
//! `transactions.account_external_id` is a soft reference with no foreign key.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at       TEXT NOT NULL,               -- RFC-3339
    updated_at       TEXT NOT NULL,
    source           TEXT NOT NULL,               -- e.g. "lunchmoney"
    external_id      TEXT NOT NULL,               -- id within `source`
    name             TEXT,
    type             TEXT,
    subtype          TEXT,
    currency         TEXT,
    is_active        INTEGER NOT NULL DEFAULT 1,  -- boolean 0/1
    is_excluded      INTEGER NOT NULL DEFAULT 0,
    institution_name TEXT,
    last_synced_at   TEXT
);

CREATE INDEX IF NOT EXISTS idx_accounts_source_external_id
    ON accounts(source, external_id);

-- ----------------------------------------------------------------
-- Budgets
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS budgets (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    source       TEXT NOT NULL,
    external_id  TEXT NOT NULL,
    name         TEXT,
    category     TEXT,
    period_start TEXT,                            -- YYYY-MM-DD
    period_end   TEXT,
    limit_amount TEXT,                            -- decimal as text
    currency     TEXT,
    is_active    INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_budgets_source_external_id
    ON budgets(source, external_id);

-- ----------------------------------------------------------------
-- Transactions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS transactions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    source              TEXT NOT NULL,
    external_id         TEXT NOT NULL,
    account_external_id TEXT,                     -- soft ref -> accounts.external_id
    txn_date            TEXT,
    amount              TEXT,
    currency            TEXT,
    payee               TEXT,
    category            TEXT,
    notes               TEXT,
    is_pending          INTEGER NOT NULL DEFAULT 0,
    is_transfer         INTEGER NOT NULL DEFAULT 0,
    cleared_at          TEXT
);

CREATE INDEX IF NOT EXISTS idx_transactions_source_external_id
    ON transactions(source, external_id);
CREATE INDEX IF NOT EXISTS idx_transactions_account_external_id
    ON transactions(account_external_id);

-- ----------------------------------------------------------------
-- Recurring items
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS recurring_items (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    source          TEXT NOT NULL,
    external_id     TEXT NOT NULL,
    name            TEXT,
    payee           TEXT,
    category        TEXT,
    amount          TEXT,
    currency        TEXT,
    frequency       TEXT,                         -- e.g. "monthly"
    next_occurrence TEXT,
    last_occurrence TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1,
    notes           TEXT
);

CREATE INDEX IF NOT EXISTS idx_recurring_items_source_external_id
    ON recurring_items(source, external_id);
"#;

/// Apply the financial record migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
