use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use super::common::{SchedulerContext, SchedulerMessage, SchedulerSender};
use super::scheduler::{ScheduledTask, WakeupScheduler};
use super::worker::ReminderWorker;
use crate::reminder::ReminderId;
use crate::storage::ReminderStorage;

const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

/// The wakeup the scheduler currently holds, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedWakeup {
    pub record_id: ReminderId,
    pub fire_at: i64,
}

/// Owns the at-most-one pending wakeup. A manager task processes re-arm
/// requests serially, so concurrent mutations can never leave two timers
/// armed at once.
pub struct Scheduler {
    sender: SchedulerSender,
    armed: watch::Receiver<Option<ArmedWakeup>>,
    manager_task_handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn start(storage: Arc<dyn ReminderStorage>, worker: Arc<dyn ReminderWorker>) -> Self {
        let (channel_sender, receiver) = mpsc::channel(64);
        let sender = SchedulerSender::new(channel_sender);
        let (armed_sender, armed) = watch::channel(None);

        let tasks_sender = sender.clone();
        let manager_task_handle = tokio::spawn(async move {
            handle_messages(storage, worker, receiver, tasks_sender, armed_sender).await;
        });

        Self {
            sender,
            armed,
            manager_task_handle,
        }
    }

    /// See [`SchedulerSender::rearm`].
    pub async fn rearm(&self) -> anyhow::Result<()> {
        self.sender.rearm().await
    }

    pub fn sender(&self) -> SchedulerSender {
        self.sender.clone()
    }

    /// Snapshot of the currently armed wakeup, `None` when unarmed.
    pub fn armed(&self) -> Option<ArmedWakeup> {
        *self.armed.borrow()
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.sender.stop().await?;
        self.manager_task_handle.await?;
        Ok(())
    }
}

async fn handle_messages(
    storage: Arc<dyn ReminderStorage>,
    worker: Arc<dyn ReminderWorker>,
    mut receiver: mpsc::Receiver<SchedulerMessage>,
    sender: SchedulerSender,
    armed_sender: watch::Sender<Option<ArmedWakeup>>,
) {
    let mut current: Option<ScheduledTask> = None;
    while let Some(message) = receiver.recv().await {
        match message {
            SchedulerMessage::Rearm => {
                // Cancel-and-recreate even when the head record is unchanged;
                // holding exactly one timer matters more than saving a spawn.
                if let Some(task) = current.take() {
                    task.cancel(CANCEL_TIMEOUT).await;
                }
                current = arm_next(&storage, &worker, &sender, &armed_sender).await;
            }
            SchedulerMessage::Stop => break,
        }
    }

    if let Some(task) = current.take() {
        task.cancel(CANCEL_TIMEOUT).await;
    }
    let _ = armed_sender.send(None);
}

async fn arm_next(
    storage: &Arc<dyn ReminderStorage>,
    worker: &Arc<dyn ReminderWorker>,
    sender: &SchedulerSender,
    armed_sender: &watch::Sender<Option<ArmedWakeup>>,
) -> Option<ScheduledTask> {
    let head = match storage.list_ordered().await {
        Ok(reminders) => reminders.into_iter().next(),
        Err(error) => {
            log::error!(
                "Could not list reminders while re-arming; staying unarmed until the next mutation. [error = {error:#}]"
            );
            None
        }
    };

    let Some(reminder) = head else {
        let _ = armed_sender.send(None);
        return None;
    };

    let wakeup = ArmedWakeup {
        record_id: reminder.id,
        fire_at: reminder.deadline,
    };
    let context = SchedulerContext {
        sender: sender.clone(),
        reminder,
    };
    let task = WakeupScheduler::arm(context, Arc::clone(worker));
    let _ = armed_sender.send(Some(wakeup));
    Some(task)
}
