use crate::delivery::DeliveryChannel;
use crate::service::ReminderService;

pub const COMMAND_PREFIX: &str = "RemindMe! ";

/// Dispatches one inbound chat message: either the help request or a
/// reminder request. Anything else is not for us. Replies (confirmations and
/// user-facing errors alike) go back to the target; direct messages are
/// answered to their author.
pub async fn handle_message(
    service: &ReminderService,
    delivery: &dyn DeliveryChannel,
    nick: &str,
    author: &str,
    target: &str,
    text: &str,
) {
    let target = if target == nick { author } else { target };

    if text == format!("{nick}: help") {
        for line in service.help(nick) {
            send(delivery, target, &line).await;
        }
    } else if let Some(request) = text.strip_prefix(COMMAND_PREFIX) {
        let reply = match service.create(author, target, request).await {
            Ok(confirmation) => confirmation,
            Err(error) => error.to_string(),
        };
        send(delivery, target, &reply).await;
    }
}

async fn send(delivery: &dyn DeliveryChannel, target: &str, text: &str) {
    if let Err(error) = delivery.deliver(target, text).await {
        log::error!("Could not send reply. [target = {target}, error = {error:#}]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::Scheduler;
    use crate::service::DeliveryWorker;
    use crate::storage::{InMemoryReminderStorage, ReminderStorage};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    type SentMessages = Arc<Mutex<Vec<(String, String)>>>;

    struct RecordingChannel {
        sent: SentMessages,
    }

    #[async_trait]
    impl DeliveryChannel for RecordingChannel {
        async fn deliver(&self, target: &str, text: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .await
                .push((target.to_owned(), text.to_owned()));
            Ok(())
        }
    }

    struct TestContext {
        storage: Arc<InMemoryReminderStorage>,
        sent: SentMessages,
        channel: Arc<RecordingChannel>,
        scheduler: Scheduler,
        service: ReminderService,
    }

    fn setup() -> TestContext {
        let storage = Arc::new(InMemoryReminderStorage::new());
        let sent: SentMessages = Arc::new(Mutex::new(Vec::new()));
        let channel = Arc::new(RecordingChannel {
            sent: Arc::clone(&sent),
        });
        let worker = Arc::new(DeliveryWorker::new(
            Arc::clone(&storage) as Arc<dyn ReminderStorage>,
            Arc::clone(&channel) as Arc<dyn DeliveryChannel>,
        ));
        let scheduler = Scheduler::start(Arc::clone(&storage) as Arc<dyn ReminderStorage>, worker);
        let service = ReminderService::new(
            Arc::clone(&storage) as Arc<dyn ReminderStorage>,
            scheduler.sender(),
            chrono_tz::Europe::Stockholm,
        );

        TestContext {
            storage,
            sent,
            channel,
            scheduler,
            service,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn help_request_sends_the_instruction_lines() {
        let ctx = setup();

        handle_message(
            &ctx.service,
            ctx.channel.as_ref(),
            "reminder-bot",
            "alex",
            "#random",
            "reminder-bot: help",
        )
        .await;

        let sent = ctx.sent.lock().await;
        assert_eq!(sent.len(), 5);
        assert!(sent.iter().all(|(target, _)| target == "#random"));
        ctx.scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reminder_request_is_created_and_confirmed() {
        let ctx = setup();

        handle_message(
            &ctx.service,
            ctx.channel.as_ref(),
            "reminder-bot",
            "alex",
            "#random",
            "RemindMe! in 1 hour \"stand up\"",
        )
        .await;

        assert_eq!(ctx.storage.list_ordered().await.unwrap().len(), 1);
        let sent = ctx.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.starts_with("A reminder has been set for "));
        ctx.scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn direct_messages_are_answered_to_the_author() {
        let ctx = setup();

        handle_message(
            &ctx.service,
            ctx.channel.as_ref(),
            "reminder-bot",
            "alex",
            "reminder-bot",
            "RemindMe! in 1 hour",
        )
        .await;

        let stored = ctx.storage.list_ordered().await.unwrap();
        assert_eq!(stored[0].target, "alex");
        assert_eq!(ctx.sent.lock().await[0].0, "alex");
        ctx.scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn parse_failures_reply_with_the_apology() {
        let ctx = setup();

        handle_message(
            &ctx.service,
            ctx.channel.as_ref(),
            "reminder-bot",
            "alex",
            "#random",
            "RemindMe! asdkfj",
        )
        .await;

        assert!(ctx.storage.list_ordered().await.unwrap().is_empty());
        assert_eq!(
            ctx.sent.lock().await[0].1,
            "alex: Sorry, I didn't quite get that"
        );
        ctx.scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_chatter_is_ignored() {
        let ctx = setup();

        handle_message(
            &ctx.service,
            ctx.channel.as_ref(),
            "reminder-bot",
            "alex",
            "#random",
            "good morning everyone",
        )
        .await;

        assert!(ctx.sent.lock().await.is_empty());
        assert!(ctx.storage.list_ordered().await.unwrap().is_empty());
        ctx.scheduler.shutdown().await.unwrap();
    }
}
