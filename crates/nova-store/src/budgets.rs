use rusqlite::types::Value;
use rusqlite::Row;

use crate::models::{date, decimal, flag, read_date, read_decimal, read_flag, text, Budget, Record};

impl Record for Budget {
    const TABLE: &'static str = "budgets";
    const COLUMNS: &'static [&'static str] = &[
        "source",
        "external_id",
        "name",
        "category",
        "period_start",
        "period_end",
        "limit_amount",
        "currency",
        "is_active",
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.source.clone()),
            Value::Text(self.external_id.clone()),
            text(&self.name),
            text(&self.category),
            date(&self.period_start),
            date(&self.period_end),
            decimal(&self.limit_amount),
            text(&self.currency),
            flag(self.is_active),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Budget {
            source: row.get(offset)?,
            external_id: row.get(offset + 1)?,
            name: row.get(offset + 2)?,
            category: row.get(offset + 3)?,
            period_start: read_date(row, offset + 4)?,
            period_end: read_date(row, offset + 5)?,
            limit_amount: read_decimal(row, offset + 6)?,
            currency: row.get(offset + 7)?,
            is_active: read_flag(row, offset + 8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::models::Budget;
    use crate::testing::memory_session;

    #[tokio::test]
    async fn budgets_table_has_expected_columns() {
        let (_persistence, session) = memory_session().await;

        let columns = session.table_columns("budgets").unwrap();
        for expected in [
            "id",
            "created_at",
            "updated_at",
            "source",
            "external_id",
            "name",
            "category",
            "period_start",
            "period_end",
            "limit_amount",
            "currency",
            "is_active",
        ] {
            assert!(columns.iter().any(|c| c == expected), "missing column {expected}");
        }
    }

    #[tokio::test]
    async fn create_and_query_budget_round_trip() {
        let (_persistence, session) = memory_session().await;

        let budget = Budget {
            name: Some("Test Groceries Budget".into()),
            category: Some("Groceries".into()),
            period_start: NaiveDate::from_ymd_opt(2025, 11, 1),
            period_end: NaiveDate::from_ymd_opt(2025, 11, 30),
            limit_amount: Some(Decimal::new(30000, 2)),
            currency: Some("USD".into()),
            ..Budget::new("lunchmoney", "bud_123")
        };
        let stored = session.insert(&budget).unwrap();

        let fetched = session
            .find_by_external_id::<Budget>("lunchmoney", "bud_123")
            .unwrap()
            .expect("budget should exist");

        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.limit_amount, budget.limit_amount);
        assert_eq!(fetched.limit_amount.unwrap().to_string(), "300.00");
        assert_eq!(fetched.period_end, NaiveDate::from_ymd_opt(2025, 11, 30));
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn budget_without_period_round_trips_nulls() {
        let (_persistence, session) = memory_session().await;

        let stored = session.insert(&Budget::new("lunchmoney", "bud_empty")).unwrap();
        let fetched = session.get::<Budget>(stored.id).unwrap();

        assert!(fetched.period_start.is_none());
        assert!(fetched.limit_amount.is_none());
        assert_eq!(fetched, stored);
    }
}
