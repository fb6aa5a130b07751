use rusqlite::types::Value;
use rusqlite::Row;

use crate::models::{flag, instant, read_flag, read_instant, text, Account, Record};

impl Record for Account {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &[
        "source",
        "external_id",
        "name",
        "type",
        "subtype",
        "currency",
        "is_active",
        "is_excluded",
        "institution_name",
        "last_synced_at",
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.source.clone()),
            Value::Text(self.external_id.clone()),
            text(&self.name),
            text(&self.account_type),
            text(&self.subtype),
            text(&self.currency),
            flag(self.is_active),
            flag(self.is_excluded),
            text(&self.institution_name),
            instant(&self.last_synced_at),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Account {
            source: row.get(offset)?,
            external_id: row.get(offset + 1)?,
            name: row.get(offset + 2)?,
            account_type: row.get(offset + 3)?,
            subtype: row.get(offset + 4)?,
            currency: row.get(offset + 5)?,
            is_active: read_flag(row, offset + 6)?,
            is_excluded: read_flag(row, offset + 7)?,
            institution_name: row.get(offset + 8)?,
            last_synced_at: read_instant(row, offset + 9)?,
        })
    }
}
