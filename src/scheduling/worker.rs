use async_trait::async_trait;

use super::common::SchedulerContext;

/// The firing callback of an armed wakeup. Implementations own delivery and
/// cleanup and are responsible for re-arming through the context sender once
/// the fired record has been removed.
#[async_trait]
pub trait ReminderWorker: Send + Sync + 'static {
    async fn handle_reminder(&self, context: &SchedulerContext) -> anyhow::Result<()>;
}
