//! Shop engine.
//!
//! Owns the business rules of the bot: what is on sale and at which price,
//! how a payment code and its VietQR image are derived, how a payment
//! notification is reconciled with a pending order and how credentials are
//! drawn from the inventories. Persistence goes through a
//! [`store::DocumentStore`]; the engine never talks to Telegram.

pub use catalog::{AccountType, Catalog, PriceEntry};
pub use documents::{
    CompletedOrder, CompletedStatus, Document, OrderStatus, Orders, PendingOrder, PendingOrders,
    Session, Stock, UserRecord,
};
pub use error::EngineError;
pub use inventory::Inventory;
pub use money::Vnd;
pub use ops::{Checkout, Fulfillment, Reconciliation, Shop, ShopBuilder, Underpayment};
pub use payment::{Customer, QrGenerator, Quote, payment_code};
pub use reconcile::{Classification, classify};

mod catalog;
mod documents;
mod error;
mod inventory;
mod money;
mod ops;
mod payment;
mod reconcile;
pub mod store;

type ResultEngine<T> = Result<T, EngineError>;
