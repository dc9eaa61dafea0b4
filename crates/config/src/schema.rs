use std::{path::PathBuf, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

use crate::error::{Error, Result};

/// Telegram's upper bound for the long-polling `timeout` parameter.
const MAX_POLL_TIMEOUT_SECS: u32 = 50;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JoingateConfig {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub setup: SetupConfig,
}

impl JoingateConfig {
    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<()> {
        let token = self.telegram.token.expose_secret();
        if token.trim().is_empty() {
            return Err(Error::invalid("telegram.token is empty (set BOT_TOKEN)"));
        }
        if token.contains("${") {
            return Err(Error::invalid(
                "telegram.token has an unresolved ${...} placeholder",
            ));
        }
        if self.telegram.super_admin_id <= 0 {
            return Err(Error::invalid(
                "telegram.super_admin_id must be a positive user id (set SUPER_ADMIN_ID)",
            ));
        }
        if !(1..=MAX_POLL_TIMEOUT_SECS).contains(&self.telegram.poll_timeout_secs) {
            return Err(Error::invalid(format!(
                "telegram.poll_timeout_secs must be between 1 and {MAX_POLL_TIMEOUT_SECS}"
            )));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(Error::invalid("database.path is empty"));
        }
        Ok(())
    }
}

/// Bot credentials and polling.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,

    /// The only identity allowed to approve administrators.
    pub super_admin_id: i64,

    /// Long-polling timeout for `getUpdates` (seconds).
    pub poll_timeout_secs: u32,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("super_admin_id", &self.super_admin_id)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            super_admin_id: 0,
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file. `:memory:` keeps everything in memory.
    pub path: PathBuf,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("joingate.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Expire setup sessions idle for this long. `0` disables expiry.
    pub idle_timeout_secs: u64,
}

impl SetupConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
