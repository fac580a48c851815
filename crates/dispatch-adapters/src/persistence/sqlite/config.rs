use async_trait::async_trait;
use chrono::NaiveDate;

use dispatch_ports::error::PortError;
use dispatch_ports::outbound::ConfigRepository;
use dispatch_ports::types::PhoneNumberConfig;

use super::SqliteDb;

const PHONE_NUMBERS: &str = "phone_numbers";
const REMINDER_LAST_RUN: &str = "reminder_last_run";

impl SqliteDb {
    async fn get_value(&self, key: &str) -> Result<Option<String>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(row.map(|(value,)| value))
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO config (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ConfigRepository for SqliteDb {
    async fn phone_numbers(&self) -> Result<PhoneNumberConfig, PortError> {
        let data = self.get_value(PHONE_NUMBERS).await?.ok_or(PortError::NotFound)?;
        serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))
    }

    async fn set_phone_numbers(&self, config: &PhoneNumberConfig) -> Result<(), PortError> {
        let data =
            serde_json::to_string(config).map_err(|e| PortError::Persistence(e.to_string()))?;
        self.set_value(PHONE_NUMBERS, &data).await
    }

    async fn reminder_last_run(&self) -> Result<Option<NaiveDate>, PortError> {
        self.get_value(REMINDER_LAST_RUN)
            .await?
            .map(|v| {
                NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                    .map_err(|e| PortError::Persistence(e.to_string()))
            })
            .transpose()
    }

    async fn set_reminder_last_run(&self, date: NaiveDate) -> Result<(), PortError> {
        self.set_value(REMINDER_LAST_RUN, &date.format("%Y-%m-%d").to_string())
            .await
    }
}
