use engine::Customer;
use teloxide::types::{ChatId, MessageId, Update, UpdateKind, User};

/// The two kinds of update the shop reacts to. Everything else is ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Message(IncomingMessage),
    Callback(IncomingCallback),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub customer: Customer,
    /// `None` for stickers, photos and other non-text messages.
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingCallback {
    pub id: String,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub customer: Customer,
    pub data: String,
}

impl Inbound {
    pub fn from_update(update: Update) -> Option<Self> {
        match update.kind {
            UpdateKind::Message(msg) => {
                let from = msg.from.as_ref()?;
                Some(Self::Message(IncomingMessage {
                    chat_id: msg.chat.id,
                    customer: customer(from, msg.chat.id),
                    text: msg.text().map(str::to_string),
                }))
            }
            UpdateKind::CallbackQuery(q) => {
                let message = q.message.as_ref()?;
                let chat_id = message.chat().id;
                Some(Self::Callback(IncomingCallback {
                    id: q.id.0.clone(),
                    chat_id,
                    message_id: message.id(),
                    customer: customer(&q.from, chat_id),
                    data: q.data.clone().unwrap_or_default(),
                }))
            }
            _ => None,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Message(m) => m.chat_id,
            Self::Callback(c) => c.chat_id,
        }
    }
}

fn customer(user: &User, chat_id: ChatId) -> Customer {
    Customer {
        user_id: user.id.0,
        chat_id: chat_id.0,
        username: user.username.clone(),
    }
}
