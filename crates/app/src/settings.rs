//! Handles settings for the application.
//!
//! Values come from an optional `config/settings.toml`, overridden by
//! environment variables of the same name in upper case (`BOT_TOKEN`,
//! `GIST_ID`, `ADMIN_CHAT_ID`, ...). See `config/settings.example.toml`.
use config::{Config, ConfigError, Environment, File};
use engine::PriceEntry;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// GitHub Gist, one file per document.
    Gist,
    /// Process memory; everything is lost on restart.
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub bot_token: String,
    pub admin_chat_id: i64,
    pub gist_id: Option<String>,
    pub gist_token: Option<String>,
    /// Public base URL of the service; the webhook is registered under it.
    pub cloud_run_service_url: Option<String>,
    /// Shared with Telegram on registration and checked on every update.
    /// Letters, digits, `_` and `-` only.
    pub webhook_secret: Option<String>,
    pub port: u16,
    pub bind: String,
    pub log_level: String,
    pub store: StoreKind,
    pub bank_id: String,
    pub bank_account: String,
    pub bank_account_name: Option<String>,
    /// Replaces the built-in price table when not empty.
    #[serde(default)]
    pub prices: Vec<PriceEntry>,
    #[serde(default)]
    pub free_packages: Vec<String>,
    pub register_webhook: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // No `try_parsing`: bank account numbers must keep their leading zeros.
        let settings = Config::builder()
            .set_default("port", 8080)?
            .set_default("bind", "0.0.0.0")?
            .set_default("log_level", "info")?
            .set_default("store", "gist")?
            .set_default("bank_id", "970436")?
            .set_default("register_webhook", true)?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(Environment::default())
            .build()?;

        settings.try_deserialize()
    }

    /// Full webhook URL, when the public base URL is known.
    pub fn webhook_url(&self) -> Option<String> {
        self.cloud_run_service_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}{}", url.trim_end_matches('/'), telegram_bot::WEBHOOK_PATH))
    }
}
