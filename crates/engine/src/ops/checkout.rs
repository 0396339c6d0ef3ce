use chrono::Utc;

use super::Shop;
use crate::{
    AccountType, Customer, Document, EngineError, OrderStatus, PendingOrder, PendingOrders,
    Quote, ResultEngine, Session, documents::Sessions, store::Mutation,
};

/// A pending order ready to be paid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkout {
    pub quote: Quote,
    /// The customer already had a pending order under this payment code; it
    /// was overwritten.
    pub replaced: bool,
}

impl Shop {
    /// Creates (or overwrites) the pending order for a package selection and
    /// records the session waiting for the customer's account info.
    ///
    /// Repeating the same selection derives the same payment code and
    /// overwrites the customer's own pending order. A code held by another
    /// customer is refused with [`EngineError::PaymentCodeTaken`].
    pub async fn start_checkout(
        &self,
        customer: &Customer,
        package: &str,
        account_type: AccountType,
    ) -> ResultEngine<Checkout> {
        let quote = self
            .qr
            .quote(&self.catalog, package, account_type, customer)?;

        let _guard = self.write_lock.lock().await;

        let replaced = self
            .documents
            .update(Document::PendingOrders, |pending: &mut PendingOrders| {
                let replaced = match pending.get(&quote.payment_code) {
                    Some(existing) if existing.user_id != customer.user_id => {
                        return Err(EngineError::PaymentCodeTaken(quote.payment_code.clone()));
                    }
                    Some(_) => true,
                    None => false,
                };

                pending.insert(
                    quote.payment_code.clone(),
                    PendingOrder {
                        payment_code: quote.payment_code.clone(),
                        user_id: customer.user_id,
                        chat_id: customer.chat_id,
                        username: customer.username.clone(),
                        package: quote.package.clone(),
                        account_type,
                        status: OrderStatus::WaitingPayment,
                        info: String::new(),
                        created_at: Utc::now(),
                    },
                );
                Ok(Mutation::Write(replaced))
            })
            .await?;

        if replaced {
            tracing::info!(
                "pending order {} overwritten by a repeated selection",
                quote.payment_code
            );
        }

        let key = customer.user_id.to_string();
        self.documents
            .update(Document::Sessions, |sessions: &mut Sessions| {
                sessions.insert(
                    key.clone(),
                    Session {
                        package: quote.package.clone(),
                        account_type,
                        payment_code: quote.payment_code.clone(),
                        started_at: Utc::now(),
                    },
                );
                Ok(Mutation::Write(()))
            })
            .await?;

        Ok(Checkout { quote, replaced })
    }

    /// The selection the bot is waiting info for, if any.
    pub async fn session(&self, user_id: u64) -> ResultEngine<Option<Session>> {
        let sessions: Sessions = self.documents.load(Document::Sessions).await?;
        Ok(sessions.get(&user_id.to_string()).cloned())
    }

    /// Attaches the customer's free text (account e-mail, notes) to the
    /// pending order of their session and closes the session.
    ///
    /// Returns `None` when no session is open. A session whose pending order
    /// is gone is closed as well.
    pub async fn submit_info(&self, user_id: u64, info: &str) -> ResultEngine<Option<PendingOrder>> {
        let _guard = self.write_lock.lock().await;

        let key = user_id.to_string();
        let sessions: Sessions = self.documents.load(Document::Sessions).await?;
        let Some(session) = sessions.get(&key) else {
            return Ok(None);
        };

        let info = info.trim();
        let order = self
            .documents
            .update(Document::PendingOrders, |pending: &mut PendingOrders| {
                let Some(order) = pending.get_mut(&session.payment_code) else {
                    return Ok(Mutation::Keep(None));
                };
                order.info = info.to_string();
                if matches!(
                    order.status,
                    OrderStatus::WaitingPayment | OrderStatus::NoPayment
                ) {
                    order.status = OrderStatus::UserConfirmed;
                }
                Ok(Mutation::Write(Some(order.clone())))
            })
            .await?;

        if order.is_none() {
            tracing::warn!(
                "session of user {user_id} points to missing order {}",
                session.payment_code
            );
        }

        self.close_session(user_id, None).await?;
        Ok(order)
    }

    /// Removes the session of `user_id`. With `payment_code`, only a session
    /// for that code is removed.
    pub(super) async fn close_session(
        &self,
        user_id: u64,
        payment_code: Option<&str>,
    ) -> ResultEngine<()> {
        let key = user_id.to_string();
        self.documents
            .update(Document::Sessions, |sessions: &mut Sessions| {
                let matches = sessions
                    .get(&key)
                    .is_some_and(|s| payment_code.is_none_or(|code| s.payment_code == code));
                if !matches {
                    return Ok(Mutation::Keep(()));
                }
                sessions.remove(&key);
                Ok(Mutation::Write(()))
            })
            .await
    }

    pub async fn pending_order(&self, payment_code: &str) -> ResultEngine<Option<PendingOrder>> {
        let pending: PendingOrders = self.documents.load(Document::PendingOrders).await?;
        Ok(pending.get(payment_code.trim()).cloned())
    }

    /// Pending orders, oldest first.
    pub async fn pending_orders(&self) -> ResultEngine<Vec<PendingOrder>> {
        let pending: PendingOrders = self.documents.load(Document::PendingOrders).await?;
        let mut orders: Vec<PendingOrder> = pending.into_values().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }
}
