//! Records persisted in the document store.
//!
//! Every document is a flat JSON object. Keys are strings even when they
//! hold numeric ids, matching what the Gist files have always contained.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountType, Vnd};

/// Named JSON files inside the store container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Document {
    Users,
    Orders,
    PendingOrders,
    FreeAccounts,
    ShopAccounts,
    Sessions,
}

impl Document {
    pub const ALL: [Document; 6] = [
        Document::Users,
        Document::Orders,
        Document::PendingOrders,
        Document::FreeAccounts,
        Document::ShopAccounts,
        Document::Sessions,
    ];

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Users => "users.json",
            Self::Orders => "orders.json",
            Self::PendingOrders => "pending_orders.json",
            Self::FreeAccounts => "free_accounts.json",
            Self::ShopAccounts => "shop_accounts.json",
            Self::Sessions => "sessions.json",
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub joined: bool,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    WaitingPayment,
    UserConfirmed,
    Underpaid,
    NoPayment,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingPayment => "waiting_payment",
            Self::UserConfirmed => "user_confirmed",
            Self::Underpaid => "underpaid",
            Self::NoPayment => "no_payment",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub payment_code: String,
    pub user_id: u64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub package: String,
    pub account_type: AccountType,
    pub status: OrderStatus,
    #[serde(default)]
    pub info: String,
    pub created_at: DateTime<Utc>,
}

/// State of an entry in `orders.json`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletedStatus {
    #[default]
    Paid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedOrder {
    pub username: Option<String>,
    pub chat_id: i64,
    pub package: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub info: String,
    pub credential: Option<String>,
    pub payment_code: String,
    pub amount: Vnd,
    #[serde(default)]
    pub status: CompletedStatus,
    pub paid_at: DateTime<Utc>,
}

/// What the bot is waiting for from a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub package: String,
    pub account_type: AccountType,
    pub payment_code: String,
    pub started_at: DateTime<Utc>,
}

pub type Users = BTreeMap<String, UserRecord>;
pub type Orders = BTreeMap<String, CompletedOrder>;
pub type PendingOrders = BTreeMap<String, PendingOrder>;
pub type Sessions = BTreeMap<String, Session>;
/// Package name -> unissued credentials, first is issued next.
pub type Stock = BTreeMap<String, Vec<String>>;
