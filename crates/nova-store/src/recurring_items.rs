use rusqlite::types::Value;
use rusqlite::Row;

use crate::models::{
    date, decimal, flag, read_date, read_decimal, read_flag, text, Record, RecurringItem,
};

impl Record for RecurringItem {
    const TABLE: &'static str = "recurring_items";
    const COLUMNS: &'static [&'static str] = &[
        "source",
        "external_id",
        "name",
        "payee",
        "category",
        "amount",
        "currency",
        "frequency",
        "next_occurrence",
        "last_occurrence",
        "is_active",
        "notes",
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.source.clone()),
            Value::Text(self.external_id.clone()),
            text(&self.name),
            text(&self.payee),
            text(&self.category),
            decimal(&self.amount),
            text(&self.currency),
            text(&self.frequency),
            date(&self.next_occurrence),
            date(&self.last_occurrence),
            flag(self.is_active),
            text(&self.notes),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(RecurringItem {
            source: row.get(offset)?,
            external_id: row.get(offset + 1)?,
            name: row.get(offset + 2)?,
            payee: row.get(offset + 3)?,
            category: row.get(offset + 4)?,
            amount: read_decimal(row, offset + 5)?,
            currency: row.get(offset + 6)?,
            frequency: row.get(offset + 7)?,
            next_occurrence: read_date(row, offset + 8)?,
            last_occurrence: read_date(row, offset + 9)?,
            is_active: read_flag(row, offset + 10)?,
            notes: row.get(offset + 11)?,
        })
    }
}
