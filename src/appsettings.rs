use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct IrcSettings {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_nick")]
    pub nick: String,
    #[serde(default = "default_nick")]
    pub user: String,
    #[serde(default = "default_gecos")]
    pub gecos: String,
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct ReminderSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            database: default_database(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct AppSettings {
    pub irc: IrcSettings,
    #[serde(default)]
    pub reminders: ReminderSettings,
}

impl AppSettings {
    /// Layers `appsettings`, an optional `appsettings.local` override file
    /// and `APP_*` environment variables (`APP_IRC__SERVER=...`).
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_port() -> u16 {
    6667
}

fn default_nick() -> String {
    "reminder-bot".to_owned()
}

fn default_gecos() -> String {
    "Reminder Bot v1.0.0".to_owned()
}

fn default_channels() -> Vec<String> {
    vec!["#random".to_owned()]
}

fn default_timezone() -> String {
    "Europe/Stockholm".to_owned()
}

fn default_database() -> String {
    "reminders.sqlite".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_server_is_mandatory() {
        let settings: AppSettings = Config::builder()
            .set_override("irc.server", "irc.example.org")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.irc.server, "irc.example.org");
        assert_eq!(settings.irc.port, 6667);
        assert_eq!(settings.irc.nick, "reminder-bot");
        assert_eq!(settings.reminders.timezone, "Europe/Stockholm");
        assert_eq!(settings.reminders.database, "reminders.sqlite");
    }
}
