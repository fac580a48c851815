use async_trait::async_trait;

use dispatch_core::phone::Phone;
use dispatch_ports::error::PortError;
use dispatch_ports::outbound::BlocklistRepository;

use super::SqliteDb;

#[async_trait]
impl BlocklistRepository for SqliteDb {
    async fn is_blocked(&self, phone: &Phone) -> Result<bool, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT phone_number FROM blocked_numbers WHERE phone_number = ?")
                .bind(phone.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn list_blocked(&self) -> Result<Vec<Phone>, PortError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT phone_number FROM blocked_numbers ORDER BY phone_number")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.into_iter()
            .map(|(p,)| Phone::caller(&p).map_err(|e| PortError::Persistence(e.to_string())))
            .collect()
    }

    async fn block(&self, phone: &Phone) -> Result<bool, PortError> {
        let result = sqlx::query(
            "INSERT INTO blocked_numbers (phone_number, created_at) VALUES (?, ?)
             ON CONFLICT(phone_number) DO NOTHING",
        )
        .bind(phone.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn unblock(&self, phone: &Phone) -> Result<bool, PortError> {
        let result = sqlx::query("DELETE FROM blocked_numbers WHERE phone_number = ?")
            .bind(phone.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
