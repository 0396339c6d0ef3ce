use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod payment {
    use super::*;

    /// Body of `POST /payment`, sent by whatever watches the bank account.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PaymentNotification {
        /// Payment code typed in the transfer, e.g. `PLUS-shop-alice`.
        pub code: String,
        /// Whole VND. Absent amounts are rejected with `missing_amount`.
        #[serde(default)]
        pub amount: Option<u64>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentMatch {
        Exact,
        Over,
        Under,
    }

    /// Outcome of one outbound chat message.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DeliveryStatus {
        Delivered,
        /// Not delivered; the same call may succeed later.
        Retryable,
        /// Not delivered; repeating the call will not help.
        Fatal,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Notifications {
        pub customer: DeliveryStatus,
        pub admin: DeliveryStatus,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PaymentReport {
        pub code: String,
        #[serde(rename = "match")]
        pub matched: PaymentMatch,
        pub fulfilled: bool,
        pub expected: u64,
        pub amount: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub overage: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub shortfall: Option<u64>,
        /// A shop credential was handed out with this payment.
        pub credential_issued: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub paid_at: Option<DateTime<Utc>>,
        pub notifications: Notifications,
    }
}

pub mod health {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub webhook_path: String,
        pub webhook_url: Option<String>,
    }
}

pub mod error {
    use super::*;

    /// Error body returned by every failing endpoint.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ErrorBody {
        /// Stable machine code, e.g. `order_not_found`.
        pub error: String,
        pub message: String,
    }
}
