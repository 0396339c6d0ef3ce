//! Telegram bot.
//!
//! The bot runs in webhook mode: the server hands every update to
//! [`ShopBot::handle_update`] and bank notifications to
//! [`ShopBot::handle_payment`]. Business rules live in [`engine::Shop`];
//! this crate only parses updates, renders menus and sends messages.

use std::sync::Arc;

use engine::Shop;
use reqwest::Url;
use teloxide::{
    payloads::SetWebhookSetters, prelude::*, types::Update, utils::command::BotCommands,
};

pub use commands::UserCommand;
pub use inbound::{Inbound, IncomingCallback, IncomingMessage};
pub use messenger::{Delivery, Messenger, TelegramMessenger};
pub use parsing::{AdminCommand, AdminParseError, CallbackAction, UnknownCallback};

mod commands;
mod handlers;
mod inbound;
mod messenger;
mod parsing;
mod ui;

pub const WEBHOOK_PATH: &str = "/webhook";
/// Header carrying the secret token given to [`register_webhook`].
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

const DEFAULT_FREE_PACKAGES: [&str; 3] = ["GO", "EDU", "PLUS"];

pub struct ShopBot {
    shop: Arc<Shop>,
    messenger: Arc<dyn Messenger>,
    admin_chat: ChatId,
    bot_username: String,
    free_packages: Vec<String>,
}

impl ShopBot {
    pub fn builder() -> ShopBotBuilder {
        ShopBotBuilder::default()
    }

    pub fn shop(&self) -> &Arc<Shop> {
        &self.shop
    }

    /// Entry point of the webhook. Updates that are neither a message from a
    /// user nor a callback on a message are dropped.
    pub async fn handle_update(&self, update: Update) {
        let update_id = update.id;
        match Inbound::from_update(update) {
            Some(inbound) => self.handle(inbound).await,
            None => tracing::debug!("ignoring update {update_id:?}"),
        }
    }
}

#[derive(Default)]
pub struct ShopBotBuilder {
    shop: Option<Arc<Shop>>,
    messenger: Option<Arc<dyn Messenger>>,
    admin_chat: Option<ChatId>,
    bot_username: String,
    free_packages: Option<Vec<String>>,
}

impl ShopBotBuilder {
    pub fn shop(mut self, shop: Arc<Shop>) -> ShopBotBuilder {
        self.shop = Some(shop);
        self
    }

    pub fn messenger(mut self, messenger: Arc<dyn Messenger>) -> ShopBotBuilder {
        self.messenger = Some(messenger);
        self
    }

    /// Chat that receives order notifications and may run admin commands.
    pub fn admin_chat(mut self, chat_id: i64) -> ShopBotBuilder {
        self.admin_chat = Some(ChatId(chat_id));
        self
    }

    /// Needed to recognise commands addressed as `/start@bot`.
    pub fn bot_username(mut self, username: &str) -> ShopBotBuilder {
        self.bot_username = username.to_string();
        self
    }

    pub fn free_packages(mut self, packages: Vec<String>) -> ShopBotBuilder {
        let packages: Vec<String> = packages
            .into_iter()
            .map(|p| p.trim().to_ascii_uppercase())
            .filter(|p| !p.is_empty())
            .collect();
        if !packages.is_empty() {
            self.free_packages = Some(packages);
        }
        self
    }

    pub fn build(self) -> Result<ShopBot, String> {
        tracing::info!("Initializing telegram bot...");
        let shop = self.shop.ok_or("missing shop")?;
        let messenger = self.messenger.ok_or("missing messenger")?;
        let admin_chat = self.admin_chat.ok_or("missing admin chat id")?;
        let free_packages = self
            .free_packages
            .unwrap_or_else(|| DEFAULT_FREE_PACKAGES.map(str::to_string).to_vec());

        Ok(ShopBot {
            shop,
            messenger,
            admin_chat,
            bot_username: self.bot_username,
            free_packages,
        })
    }
}

/// Points Telegram at `url` and publishes the user command list. With a
/// `secret`, Telegram sends it back in [`SECRET_TOKEN_HEADER`] on every call.
pub async fn register_webhook(
    bot: &Bot,
    url: Url,
    secret: Option<&str>,
) -> Result<(), teloxide::RequestError> {
    tracing::info!("Registering webhook {url}");
    let mut request = bot.set_webhook(url);
    if let Some(secret) = secret {
        request = request.secret_token(secret.to_string());
    }
    request.await?;
    bot.set_my_commands(UserCommand::bot_commands()).await?;
    Ok(())
}
