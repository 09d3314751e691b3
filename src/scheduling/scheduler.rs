use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use super::{common::SchedulerContext, worker::ReminderWorker};

/// Longest single sleep. The runtime's timer wheel cannot represent
/// multi-year delays, so longer waits burn down in slices.
const MAX_SLEEP: Duration = Duration::from_secs(60 * 60 * 24 * 30);

pub(super) struct ScheduledTask {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ScheduledTask {
    pub fn new(task_handle: JoinHandle<()>, cancellation_token: CancellationToken) -> Self {
        Self {
            task_handle,
            cancellation_token,
        }
    }

    /// Cancels the pending wakeup and waits for the task to wind down. A fire
    /// callback that already started is allowed to complete; cancellation only
    /// prevents future firing.
    pub async fn cancel(self, timeout: Duration) {
        self.cancellation_token.cancel();
        let cancel_with_timeout = time::timeout(timeout, self.task_handle);
        let _ = cancel_with_timeout.await;
    }
}

pub(super) struct WakeupScheduler;

impl WakeupScheduler {
    /// Arms a single wakeup for the reminder in `context`. Deadlines already
    /// in the past produce a zero delay and fire immediately, so nothing is
    /// silently lost across a long downtime.
    pub fn arm(context: SchedulerContext, worker: Arc<dyn ReminderWorker>) -> ScheduledTask {
        let cancellation_token = CancellationToken::new();
        let task_cancellation_token = cancellation_token.child_token();

        let delay = wakeup_delay(context.reminder.deadline, Utc::now());
        log::info!(
            "Next wakeup is at {} (in {:?}). [reminder_id = {}]",
            context.reminder.deadline,
            delay,
            context.reminder.id
        );

        let task_handle = tokio::spawn(async move {
            Self::fire_after_delay(task_cancellation_token, context, delay, worker).await;
        });

        ScheduledTask::new(task_handle, cancellation_token)
    }

    /// The delay is measured once at arm time and burned down against the
    /// runtime clock, so the task never consults the wall clock again.
    async fn fire_after_delay(
        cancellation_token: CancellationToken,
        context: SchedulerContext,
        mut delay: Duration,
        worker: Arc<dyn ReminderWorker>,
    ) {
        loop {
            let slice = delay.min(MAX_SLEEP);
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::debug!(
                        "Wakeup was cancelled before firing. [reminder_id = {}]",
                        context.reminder.id
                    );
                    return;
                }
                _ = time::sleep(slice) => {
                    delay -= slice;
                    if delay.is_zero() {
                        break;
                    }
                    log::debug!(
                        "Slept a slice, {:?} remaining. [reminder_id = {}]",
                        delay,
                        context.reminder.id
                    );
                }
            }
        }

        let reminder_id = context.reminder.id;
        if let Err(error) = worker.handle_reminder(&context).await {
            log::error!(
                "Failed to handle a fired reminder. [reminder_id = {reminder_id}, error = {error:#}]"
            );
        }
    }
}

/// Seconds until the deadline, clamped at zero for deadlines that have
/// already passed.
pub(super) fn wakeup_delay(deadline: i64, now: DateTime<Utc>) -> Duration {
    let delta = deadline.saturating_sub(now.timestamp());
    Duration::from_secs(u64::try_from(delta).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn future_deadline_waits_the_difference() {
        let delay = wakeup_delay(now().timestamp() + 3600, now());

        assert_eq!(delay, Duration::from_secs(3600));
    }

    #[test]
    fn past_deadline_yields_zero_delay() {
        let delay = wakeup_delay(now().timestamp() - 100, now());

        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn exact_deadline_yields_zero_delay() {
        let delay = wakeup_delay(now().timestamp(), now());

        assert_eq!(delay, Duration::ZERO);
    }
}
