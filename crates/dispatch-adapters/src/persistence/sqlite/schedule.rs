use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

use dispatch_core::ids::ScheduleEntryId;
use dispatch_core::schedule::{weekday_index, Recurrence, ScheduleEntry};
use dispatch_ports::error::PortError;
use dispatch_ports::outbound::ScheduleRepository;

use super::SqliteDb;

fn kind(entry: &ScheduleEntry) -> &'static str {
    match entry.recurrence() {
        Recurrence::Always => "always",
        Recurrence::Weekly { .. } => "weekly",
        Recurrence::Once { .. } => "once",
    }
}

fn decode(rows: Vec<(String,)>) -> Result<Vec<ScheduleEntry>, PortError> {
    rows.into_iter()
        .map(|(data,)| {
            serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl ScheduleRepository for SqliteDb {
    async fn count(&self) -> Result<u64, PortError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schedules")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(count.max(0) as u64)
    }

    async fn find_matching_at(
        &self,
        local: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, PortError> {
        let candidates = self.find_for_date(local.date()).await?;
        Ok(candidates
            .into_iter()
            .filter(|e| e.matches_at(local))
            .collect())
    }

    async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<ScheduleEntry>, PortError> {
        let day = date.format("%Y-%m-%d").to_string();
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM schedules
             WHERE kind = 'always'
                OR (kind = 'once' AND date = ?)
                OR (kind = 'weekly' AND day_of_week = ? AND date <= ?)",
        )
        .bind(&day)
        .bind(i64::from(weekday_index(date.weekday())))
        .bind(&day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        decode(rows)
    }

    async fn list_all(&self) -> Result<Vec<ScheduleEntry>, PortError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM schedules ORDER BY phone_number, date")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        decode(rows)
    }

    async fn save(&self, entry: &ScheduleEntry) -> Result<(), PortError> {
        let data =
            serde_json::to_string(entry).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO schedules (id, phone_number, kind, day_of_week, date, data)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                phone_number = excluded.phone_number,
                kind = excluded.kind,
                day_of_week = excluded.day_of_week,
                date = excluded.date,
                data = excluded.data",
        )
        .bind(entry.id().to_string())
        .bind(entry.phone().as_str())
        .bind(kind(entry))
        .bind(entry.day_of_week().map(i64::from))
        .bind(entry.date().map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &ScheduleEntryId) -> Result<bool, PortError> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
