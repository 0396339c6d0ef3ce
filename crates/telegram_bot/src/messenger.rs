//! Outbound side of the bot.
//!
//! Every call reports a [`Delivery`] instead of failing: a message that could
//! not be sent never aborts the operation that produced it, but the caller
//! still sees what happened.

use api_types::payment::DeliveryStatus;
use async_trait::async_trait;
use reqwest::Url;
use teloxide::{
    RequestError,
    prelude::*,
    types::{CallbackQueryId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Transient failure (network, rate limit).
    Retryable(String),
    /// Rejected by Telegram; repeating the call will not help.
    Fatal(String),
}

impl Delivery {
    pub fn from_result<T>(result: Result<T, RequestError>) -> Self {
        match result {
            Ok(_) => Self::Delivered,
            Err(
                err @ (RequestError::RetryAfter(_)
                | RequestError::Network(_)
                | RequestError::Io(_)),
            ) => Self::Retryable(err.to_string()),
            Err(err) => Self::Fatal(err.to_string()),
        }
    }

    pub fn status(&self) -> DeliveryStatus {
        match self {
            Self::Delivered => DeliveryStatus::Delivered,
            Self::Retryable(_) => DeliveryStatus::Retryable,
            Self::Fatal(_) => DeliveryStatus::Fatal,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(
        &self,
        chat: ChatId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery;

    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery;

    async fn send_photo(&self, chat: ChatId, url: Url, caption: String) -> Delivery;

    async fn answer_callback(&self, callback_id: &str) -> Delivery;
}

/// [`Messenger`] backed by the Bot API. Texts are sent as HTML.
#[derive(Clone, Debug)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(
        &self,
        chat: ChatId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery {
        let request = self.bot.send_message(chat, text).parse_mode(ParseMode::Html);
        let result = match keyboard {
            Some(keyboard) => request.reply_markup(keyboard).await,
            None => request.await,
        };
        Delivery::from_result(result)
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery {
        let request = self
            .bot
            .edit_message_text(chat, message, text)
            .parse_mode(ParseMode::Html);
        let result = match keyboard {
            Some(keyboard) => request.reply_markup(keyboard).await,
            None => request.await,
        };
        Delivery::from_result(result)
    }

    async fn send_photo(&self, chat: ChatId, url: Url, caption: String) -> Delivery {
        let result = self
            .bot
            .send_photo(chat, InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await;
        Delivery::from_result(result)
    }

    async fn answer_callback(&self, callback_id: &str) -> Delivery {
        let result = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await;
        Delivery::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use teloxide::{ApiError, types::Seconds};

    use super::*;

    #[test]
    fn rate_limits_are_retryable() {
        let delivery = Delivery::from_result::<()>(Err(RequestError::RetryAfter(
            Seconds::from_seconds(3),
        )));
        assert_eq!(delivery.status(), DeliveryStatus::Retryable);
    }

    #[test]
    fn api_rejections_are_fatal() {
        let delivery = Delivery::from_result::<()>(Err(RequestError::Api(ApiError::BotBlocked)));
        assert_eq!(delivery.status(), DeliveryStatus::Fatal);
        assert!(!delivery.is_delivered());
    }

    #[test]
    fn success_is_delivered() {
        assert_eq!(Delivery::from_result::<u8>(Ok(1)), Delivery::Delivered);
    }
}
