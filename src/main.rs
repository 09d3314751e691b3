mod appsettings;
mod bot;
mod deadline;
mod delivery;
mod irc;
mod reminder;
mod scheduling;
mod service;
mod storage;

use std::sync::Arc;

use anyhow::Context as _;
use chrono_tz::Tz;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use appsettings::AppSettings;
use scheduling::Scheduler;
use service::{DeliveryWorker, ReminderService};
use storage::{ReminderStorage, SqliteReminderStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_timed();

    let settings = AppSettings::load().context("loading configuration")?;
    let timezone: Tz = settings
        .reminders
        .timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown timezone {:?}", settings.reminders.timezone))?;

    let options = SqliteConnectOptions::new()
        .filename(&settings.reminders.database)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("opening the reminders database")?;
    let storage: Arc<dyn ReminderStorage> = Arc::new(SqliteReminderStorage::new(pool));
    // Without persistence there is nothing to run; a schema failure aborts.
    storage.setup().await.context("creating the reminders schema")?;

    log::info!(
        "Connecting to {}:{} as {}",
        settings.irc.server,
        settings.irc.port,
        settings.irc.nick
    );
    let mut connection = irc::IrcConnection::connect(&settings.irc).await?;
    for channel in &settings.irc.channels {
        log::info!("Joining channel {channel}");
        connection.join(channel).await?;
    }
    let sender = connection.sender();

    let worker = Arc::new(DeliveryWorker::new(
        Arc::clone(&storage),
        Arc::new(sender.clone()),
    ));
    let scheduler = Scheduler::start(Arc::clone(&storage), worker);
    // Pick up whatever survived the last run.
    scheduler.rearm().await?;

    let service = ReminderService::new(Arc::clone(&storage), scheduler.sender(), timezone);

    log::info!("Starting event loop");
    while let Some(message) = connection.next_message().await? {
        bot::handle_message(
            &service,
            &sender,
            &settings.irc.nick,
            &message.author,
            &message.target,
            &message.body,
        )
        .await;
    }

    log::warn!("Server closed the connection, shutting down");
    scheduler.shutdown().await
}
