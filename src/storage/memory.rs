use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ReminderStorage, StorageError};
use crate::reminder::{NewReminder, Reminder, ReminderId};

/// Test stand-in for the sqlite store with the same ordering semantics.
pub struct InMemoryReminderStorage {
    store: RwLock<(ReminderId, HashMap<ReminderId, Reminder>)>,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        InMemoryReminderStorage {
            store: RwLock::new((1, HashMap::new())),
        }
    }
}

#[async_trait]
impl ReminderStorage for InMemoryReminderStorage {
    async fn setup(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        let mut store = self.store.write().await;
        let current_id = store.0;
        let stored = Reminder {
            id: current_id,
            author: reminder.author,
            target: reminder.target,
            deadline: reminder.deadline,
            body: reminder.body,
        };

        store.1.insert(current_id, stored.clone());
        store.0 += 1;
        Ok(stored)
    }

    async fn list_ordered(&self) -> Result<Vec<Reminder>, StorageError> {
        let store = self.store.read().await;
        let mut reminders: Vec<Reminder> = store.1.values().cloned().collect();
        reminders.sort_by_key(|reminder| (reminder.deadline, reminder.id));
        Ok(reminders)
    }

    async fn delete_by_id(&self, id: ReminderId) -> Result<(), StorageError> {
        let mut store = self.store.write().await;
        store.1.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reminder_at(deadline: i64) -> NewReminder {
        NewReminder {
            author: "alex".to_owned(),
            target: "#random".to_owned(),
            deadline,
            body: None,
        }
    }

    fn tokio_ct(
        future: impl std::future::Future<Output = Result<(), TestCaseError>>,
    ) -> Result<(), TestCaseError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #[test]
        fn listing_is_sorted_for_any_insert_sequence(deadlines in prop::collection::vec(-1000i64..1000, 0..32)) {
            tokio_ct(async {
                let storage = InMemoryReminderStorage::new();
                for deadline in &deadlines {
                    storage.insert(reminder_at(*deadline)).await.unwrap();
                }

                let listed = storage.list_ordered().await.unwrap();

                prop_assert_eq!(listed.len(), deadlines.len());
                for pair in listed.windows(2) {
                    prop_assert!(pair[0].deadline < pair[1].deadline
                        || (pair[0].deadline == pair[1].deadline && pair[0].id < pair[1].id));
                }
                Ok(())
            }).unwrap();
        }
    }

    #[tokio::test]
    async fn deleting_a_missing_id_is_a_no_op() {
        let storage = InMemoryReminderStorage::new();

        storage.delete_by_id(4711).await.unwrap();
    }
}
