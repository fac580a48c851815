use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dispatch_core::conversation::{ConversationThread, ThreadStatus};
use dispatch_core::ids::ThreadId;
use dispatch_core::phone::Phone;
use dispatch_ports::error::PortError;
use dispatch_ports::outbound::ThreadRepository;
use dispatch_ports::types::ThreadInsert;

use super::SqliteDb;

type ThreadRow = (String, String, String, String);

fn from_row((id, phone, status, created_at): ThreadRow) -> Result<ConversationThread, PortError> {
    let id = ThreadId::parse(&id).map_err(|e| PortError::Persistence(e.to_string()))?;
    let phone = Phone::caller(&phone).map_err(|e| PortError::Persistence(e.to_string()))?;
    let status = ThreadStatus::parse(&status)
        .ok_or_else(|| PortError::Persistence(format!("unknown thread status: {status}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| PortError::Persistence(e.to_string()))?
        .with_timezone(&Utc);
    Ok(ConversationThread::from_parts(id, phone, status, created_at))
}

#[async_trait]
impl ThreadRepository for SqliteDb {
    async fn find_open(&self, phone: &Phone) -> Result<Option<ConversationThread>, PortError> {
        let row: Option<ThreadRow> = sqlx::query_as(
            "SELECT id, phone_number, status, created_at FROM threads
             WHERE phone_number = ? AND status = 'OPEN'",
        )
        .bind(phone.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        row.map(from_row).transpose()
    }

    async fn insert_open(&self, thread: &ConversationThread) -> Result<ThreadInsert, PortError> {
        let result = sqlx::query(
            "INSERT INTO threads (id, phone_number, status, created_at) VALUES (?, ?, 'OPEN', ?)
             ON CONFLICT DO NOTHING",
        )
        .bind(thread.id().to_string())
        .bind(thread.phone().as_str())
        .bind(thread.created_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(ThreadInsert::AlreadyOpen);
        }
        Ok(ThreadInsert::Created)
    }

    async fn save(&self, thread: &ConversationThread) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO threads (id, phone_number, status, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status",
        )
        .bind(thread.id().to_string())
        .bind(thread.phone().as_str())
        .bind(thread.status().as_str())
        .bind(thread.created_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> SqliteDb {
        SqliteDb::new("sqlite::memory:").await.unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn phone(n: &str) -> Phone {
        Phone::new(n).unwrap()
    }

    #[tokio::test]
    async fn insert_and_find_open() {
        let db = db().await;
        let thread = ConversationThread::open(phone("+15105557777"), ts("2025-01-15T10:00:00Z"));

        assert_eq!(db.insert_open(&thread).await.unwrap(), ThreadInsert::Created);

        let found = db.find_open(&phone("+15105557777")).await.unwrap();
        assert_eq!(found, Some(thread));
    }

    #[tokio::test]
    async fn second_open_thread_for_same_number_rejected() {
        let db = db().await;
        let first = ConversationThread::open(phone("+15105557777"), ts("2025-01-15T10:00:00Z"));
        let racer = ConversationThread::open(phone("+15105557777"), ts("2025-01-15T10:00:01Z"));

        db.insert_open(&first).await.unwrap();
        assert_eq!(
            db.insert_open(&racer).await.unwrap(),
            ThreadInsert::AlreadyOpen
        );

        let found = db.find_open(&phone("+15105557777")).await.unwrap().unwrap();
        assert_eq!(found.id(), first.id());
    }

    #[tokio::test]
    async fn closing_allows_a_new_thread() {
        let db = db().await;
        let mut first = ConversationThread::open(phone("+15105557777"), ts("2025-01-15T10:00:00Z"));
        db.insert_open(&first).await.unwrap();

        first.close().unwrap();
        db.save(&first).await.unwrap();
        assert!(db.find_open(&phone("+15105557777")).await.unwrap().is_none());

        let next = ConversationThread::open(phone("+15105557777"), ts("2025-01-16T10:00:00Z"));
        assert_eq!(db.insert_open(&next).await.unwrap(), ThreadInsert::Created);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM threads")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn short_code_caller_reads_back() {
        let db = db().await;
        let caller = Phone::caller("22395").unwrap();
        let thread = ConversationThread::open(caller.clone(), ts("2025-01-15T10:00:00Z"));
        db.insert_open(&thread).await.unwrap();

        let found = db.find_open(&caller).await.unwrap();
        assert_eq!(found, Some(thread));
    }
}
