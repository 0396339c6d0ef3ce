//! The module contains the errors the engine can throw.
//!
//! Every variant carries a stable machine code (see [`EngineError::code`])
//! that the HTTP layer reports to callers of the payment endpoint.
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No pending order matches the payment code.
    #[error("\"{0}\" order not found!")]
    OrderNotFound(String),
    /// A payment notification arrived without an amount.
    #[error("payment amount is missing")]
    MissingAmount,
    /// The (package, account type) pair is not in the price table.
    #[error("unknown product: {0}")]
    UnknownProduct(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// The derived payment code belongs to another user's pending order.
    #[error("payment code \"{0}\" is already used by another customer")]
    PaymentCodeTaken(String),
    /// A compare-and-swap write lost against a concurrent writer.
    #[error("document {0} changed concurrently")]
    Conflict(String),
    /// The remote document store could not be reached or rejected a call.
    #[error("document store error: {0}")]
    Store(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Machine readable code of the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OrderNotFound(_) => "order_not_found",
            Self::MissingAmount => "missing_amount",
            Self::UnknownProduct(_) => "unknown_product",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::PaymentCodeTaken(_) => "payment_code_taken",
            Self::Conflict(_) => "conflict",
            Self::Store(_) => "store",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(value: reqwest::Error) -> Self {
        Self::Store(value.to_string())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::OrderNotFound(a), Self::OrderNotFound(b)) => a == b,
            (Self::MissingAmount, Self::MissingAmount) => true,
            (Self::UnknownProduct(a), Self::UnknownProduct(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::PaymentCodeTaken(a), Self::PaymentCodeTaken(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Store(a), Self::Store(b)) => a == b,
            (Self::Serialization(a), Self::Serialization(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
