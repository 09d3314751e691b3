use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use thiserror::Error;

use crate::deadline;
use crate::delivery::DeliveryChannel;
use crate::reminder::{NewReminder, Reminder, pretty_timestamp};
use crate::scheduling::{ReminderWorker, SchedulerContext, SchedulerSender};
use crate::storage::{ReminderStorage, StorageError};

/// User-facing failures of [`ReminderService::create`]. The `Display` strings
/// are the exact lines sent back to the requester.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("{author}: Sorry, I didn't quite get that")]
    AmbiguousDeadline { author: String },
    #[error("Could not set notification")]
    Persistence(#[source] StorageError),
    #[error("Could not set notification")]
    Scheduler(#[source] anyhow::Error),
}

pub struct ReminderService {
    storage: Arc<dyn ReminderStorage>,
    scheduler: SchedulerSender,
    timezone: Tz,
}

impl ReminderService {
    pub fn new(storage: Arc<dyn ReminderStorage>, scheduler: SchedulerSender, timezone: Tz) -> Self {
        Self {
            storage,
            scheduler,
            timezone,
        }
    }

    /// Parses, persists and schedules a reminder request, returning the
    /// confirmation line with the deadline rendered in the configured zone.
    /// Unparseable requests never touch the store.
    pub async fn create(
        &self,
        author: &str,
        target: &str,
        raw_text: &str,
    ) -> Result<String, CreateError> {
        let parsed = deadline::parse(raw_text, self.timezone).map_err(|_| {
            CreateError::AmbiguousDeadline {
                author: author.to_owned(),
            }
        })?;

        let reminder = self
            .storage
            .insert(NewReminder {
                author: author.to_owned(),
                target: target.to_owned(),
                deadline: parsed.deadline.timestamp(),
                body: parsed.body,
            })
            .await
            .map_err(|error| {
                log::error!("Unable to persist reminder. [author = {author}, error = {error:#}]");
                CreateError::Persistence(error)
            })?;

        self.scheduler.rearm().await.map_err(|error| {
            log::error!(
                "Unable to re-arm after insert. [reminder_id = {}, error = {error:#}]",
                reminder.id
            );
            CreateError::Scheduler(error)
        })?;

        Ok(format!(
            "A reminder has been set for {}",
            pretty_timestamp(reminder.deadline, self.timezone)
        ))
    }

    /// Fixed instructional lines; `nick` is the name the bot answers to.
    pub fn help(&self, nick: &str) -> Vec<String> {
        vec![
            "I handle reminders for users and channels.".to_owned(),
            "You can use the following commands:".to_owned(),
            "RemindMe! in 1 hour \"That was easy!\"".to_owned(),
            "RemindMe! January 19, 2038, at 03:14:08 UTC \"Did we make it?\"".to_owned(),
            format!("{nick}: help"),
        ]
    }
}

/// The fire path: composes the delivery text, sends it, removes the record
/// and re-arms through the scheduler context. Deletion precedes the re-arm so
/// the fired record can never be re-selected.
pub struct DeliveryWorker {
    storage: Arc<dyn ReminderStorage>,
    delivery: Arc<dyn DeliveryChannel>,
}

impl DeliveryWorker {
    pub fn new(storage: Arc<dyn ReminderStorage>, delivery: Arc<dyn DeliveryChannel>) -> Self {
        Self { storage, delivery }
    }
}

#[async_trait]
impl ReminderWorker for DeliveryWorker {
    async fn handle_reminder(&self, context: &SchedulerContext) -> anyhow::Result<()> {
        let reminder = &context.reminder;
        let message = fire_message(reminder);

        if let Err(error) = self.delivery.deliver(&reminder.target, &message).await {
            // At-most-once delivery: the reminder is lost when the send
            // fails, and nobody is notified since the requester may be gone.
            log::error!(
                "Could not deliver reminder. [reminder_id = {}, target = {}, error = {error:#}]",
                reminder.id,
                reminder.target
            );
        }

        self.storage.delete_by_id(reminder.id).await?;
        context.sender.rearm().await?;
        Ok(())
    }
}

fn fire_message(reminder: &Reminder) -> String {
    match &reminder.body {
        Some(body) => format!("Reminding {}: {}", reminder.author, body),
        None => format!("Reminding {}", reminder.author),
    }
}
