use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{ReminderStorage, StorageError};
use crate::reminder::{NewReminder, Reminder, ReminderId};

#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    id: i64,
    author: String,
    target: String,
    deadline: i64,
    body: Option<String>,
}

impl From<ReminderRow> for Reminder {
    fn from(row: ReminderRow) -> Self {
        Reminder {
            id: row.id,
            author: row.author,
            target: row.target,
            deadline: row.deadline,
            body: row.body,
        }
    }
}

/// Sqlite-backed store owning a long-lived connection pool.
pub struct SqliteReminderStorage {
    pool: SqlitePool,
}

impl SqliteReminderStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderStorage for SqliteReminderStorage {
    async fn setup(&self) -> Result<(), StorageError> {
        log::info!("Setting up the reminders table");
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reminders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author TEXT NOT NULL,
                target TEXT NOT NULL,
                deadline INTEGER NOT NULL,
                body TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        let row: ReminderRow = sqlx::query_as(
            "INSERT INTO reminders (author, target, deadline, body)
             VALUES (?, ?, ?, ?)
             RETURNING id, author, target, deadline, body",
        )
        .bind(&reminder.author)
        .bind(&reminder.target)
        .bind(reminder.deadline)
        .bind(&reminder.body)
        .fetch_one(&self.pool)
        .await?;

        log::info!(
            "Created reminder. [reminder_id = {}, deadline = {}]",
            row.id,
            row.deadline
        );
        Ok(row.into())
    }

    async fn list_ordered(&self) -> Result<Vec<Reminder>, StorageError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(
            "SELECT id, author, target, deadline, body
             FROM reminders
             ORDER BY deadline ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_by_id(&self, id: ReminderId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            log::debug!("Reminder was already removed. [reminder_id = {id}]");
        }
        Ok(())
    }
}
