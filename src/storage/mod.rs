mod sqlite;

#[cfg(test)]
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::reminder::{NewReminder, Reminder, ReminderId};

#[cfg(test)]
pub use memory::InMemoryReminderStorage;
pub use sqlite::SqliteReminderStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Durable table of reminder records. Implementations serialize access
/// internally; callers never see partially applied mutations.
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    /// Idempotently ensures the schema exists. Creates, never migrates or
    /// destroys; safe to call on every startup.
    async fn setup(&self) -> Result<(), StorageError>;

    /// Persists a new record and returns it with its assigned id.
    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError>;

    /// Fresh snapshot of all undelivered records, earliest deadline first,
    /// ties broken by insertion order.
    async fn list_ordered(&self) -> Result<Vec<Reminder>, StorageError>;

    /// Removes a record. Deleting an id that is already gone is a no-op, so a
    /// firing timer and a concurrent listing cannot race into an error.
    async fn delete_by_id(&self, id: ReminderId) -> Result<(), StorageError>;
}
