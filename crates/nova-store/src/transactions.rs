use rusqlite::types::Value;
use rusqlite::Row;

use crate::models::{
    date, decimal, flag, instant, read_date, read_decimal, read_flag, read_instant, text, Record,
    Transaction,
};

impl Record for Transaction {
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static [&'static str] = &[
        "source",
        "external_id",
        "account_external_id",
        "txn_date",
        "amount",
        "currency",
        "payee",
        "category",
        "notes",
        "is_pending",
        "is_transfer",
        "cleared_at",
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.source.clone()),
            Value::Text(self.external_id.clone()),
            text(&self.account_external_id),
            date(&self.txn_date),
            decimal(&self.amount),
            text(&self.currency),
            text(&self.payee),
            text(&self.category),
            text(&self.notes),
            flag(self.is_pending),
            flag(self.is_transfer),
            instant(&self.cleared_at),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Transaction {
            source: row.get(offset)?,
            external_id: row.get(offset + 1)?,
            account_external_id: row.get(offset + 2)?,
            txn_date: read_date(row, offset + 3)?,
            amount: read_decimal(row, offset + 4)?,
            currency: row.get(offset + 5)?,
            payee: row.get(offset + 6)?,
            category: row.get(offset + 7)?,
            notes: row.get(offset + 8)?,
            is_pending: read_flag(row, offset + 9)?,
            is_transfer: read_flag(row, offset + 10)?,
            cleared_at: read_instant(row, offset + 11)?,
        })
    }
}
