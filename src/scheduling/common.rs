use tokio::sync::mpsc;

use crate::reminder::Reminder;

#[derive(Debug)]
pub(super) enum SchedulerMessage {
    Rearm,
    Stop,
}

/// Handle for nudging the scheduler. Cloned into the command-handling path
/// and into every armed wakeup, so the fire callback can trigger the next
/// re-arm itself.
#[derive(Clone)]
pub struct SchedulerSender(mpsc::Sender<SchedulerMessage>);

impl SchedulerSender {
    pub(super) fn new(inner: mpsc::Sender<SchedulerMessage>) -> Self {
        SchedulerSender(inner)
    }

    /// Asks the scheduler to re-evaluate the store and re-arm for the
    /// earliest record. The single re-entry point after every mutation.
    pub async fn rearm(&self) -> anyhow::Result<()> {
        self.0.send(SchedulerMessage::Rearm).await?;
        Ok(())
    }

    pub(super) async fn stop(&self) -> anyhow::Result<()> {
        self.0.send(SchedulerMessage::Stop).await?;
        Ok(())
    }
}

/// Everything an armed wakeup carries into its firing callback.
pub struct SchedulerContext {
    pub sender: SchedulerSender,
    pub reminder: Reminder,
}
