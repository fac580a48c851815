use async_trait::async_trait;

use dispatch_core::ids::StaffId;
use dispatch_core::phone::Phone;
use dispatch_core::staff::StaffMember;
use dispatch_ports::error::PortError;
use dispatch_ports::outbound::StaffRepository;

use super::SqliteDb;

type StaffRow = (String, String, bool);

fn from_row((id, phone, active): StaffRow) -> Result<StaffMember, PortError> {
    let id = StaffId::parse(&id).map_err(|e| PortError::Persistence(e.to_string()))?;
    let phone = Phone::new(&phone).map_err(|e| PortError::Persistence(e.to_string()))?;
    Ok(StaffMember::from_parts(id, phone, active))
}

#[async_trait]
impl StaffRepository for SqliteDb {
    async fn list_active_phones(&self) -> Result<Vec<Phone>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT phone_number FROM staff WHERE active = 1 ORDER BY phone_number",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.into_iter()
            .map(|(p,)| Phone::new(&p).map_err(|e| PortError::Persistence(e.to_string())))
            .collect()
    }

    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<StaffMember>, PortError> {
        let row: Option<StaffRow> =
            sqlx::query_as("SELECT id, phone_number, active FROM staff WHERE phone_number = ?")
                .bind(phone.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        row.map(from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<StaffMember>, PortError> {
        let rows: Vec<StaffRow> =
            sqlx::query_as("SELECT id, phone_number, active FROM staff ORDER BY phone_number")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.into_iter().map(from_row).collect()
    }

    async fn save(&self, member: &StaffMember) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO staff (id, phone_number, active) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                phone_number = excluded.phone_number,
                active = excluded.active",
        )
        .bind(member.id().to_string())
        .bind(member.phone().as_str())
        .bind(member.is_active())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict("phone number already exists".into())
            }
            e => PortError::Persistence(e.to_string()),
        })?;

        Ok(())
    }

    async fn delete_by_phone(&self, phone: &Phone) -> Result<bool, PortError> {
        let result = sqlx::query("DELETE FROM staff WHERE phone_number = ?")
            .bind(phone.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
