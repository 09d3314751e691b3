mod common;
mod manager;
mod scheduler;
mod worker;

pub use common::{SchedulerContext, SchedulerSender};
pub use manager::{ArmedWakeup, Scheduler};
pub use worker::ReminderWorker;
