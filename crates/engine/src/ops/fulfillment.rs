//! Payment reconciliation and the operator's manual overrides.

use chrono::Utc;

use super::Shop;
use crate::{
    Classification, CompletedOrder, CompletedStatus, Document, EngineError, Inventory,
    OrderStatus, Orders, PendingOrder, PendingOrders, ResultEngine, Vnd, classify,
    store::Mutation,
};

/// A paid order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fulfillment {
    pub user_id: u64,
    pub order: CompletedOrder,
    pub expected: Vnd,
    /// `Exact` or `Over`; never `Under`.
    pub classification: Classification,
    /// A shop credential was due but the inventory was empty.
    pub stock_out: bool,
    /// An earlier completed order of the same user was overwritten.
    pub replaced_previous: bool,
}

impl Fulfillment {
    pub fn overage(&self) -> Option<Vnd> {
        match self.classification {
            Classification::Over(overage) => Some(overage),
            _ => None,
        }
    }
}

/// A payment below the expected price; the order stays pending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Underpayment {
    pub order: PendingOrder,
    pub expected: Vnd,
    pub amount: Vnd,
    pub shortfall: Vnd,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    Fulfilled(Fulfillment),
    Underpaid(Underpayment),
}

impl Reconciliation {
    pub fn classification(&self) -> Classification {
        match self {
            Self::Fulfilled(f) => f.classification,
            Self::Underpaid(u) => Classification::Under(u.shortfall),
        }
    }
}

impl Shop {
    /// Matches a payment notification to its pending order.
    ///
    /// - missing amount: [`EngineError::MissingAmount`]
    /// - unknown code: [`EngineError::OrderNotFound`], nothing is written
    /// - under the price: the order is marked `underpaid` and stays pending
    /// - exact or over: the order is fulfilled
    pub async fn reconcile(
        &self,
        payment_code: &str,
        amount: Option<Vnd>,
    ) -> ResultEngine<Reconciliation> {
        let amount = amount.ok_or(EngineError::MissingAmount)?;
        let _guard = self.write_lock.lock().await;

        let order = self.find_pending(payment_code).await?;
        let expected = self.catalog.price(&order.package, order.account_type)?;

        match classify(expected, amount) {
            Classification::Under(shortfall) => {
                let order = self
                    .set_status(&order.payment_code, OrderStatus::Underpaid)
                    .await?;
                tracing::info!(
                    "payment {} underpaid: got {amount}, expected {expected}",
                    order.payment_code
                );
                Ok(Reconciliation::Underpaid(Underpayment {
                    order,
                    expected,
                    amount,
                    shortfall,
                }))
            }
            classification => self
                .fulfill(order, expected, amount, classification)
                .await
                .map(Reconciliation::Fulfilled),
        }
    }

    /// `confirm <code>`: fulfils as if the exact price was paid.
    pub async fn confirm(&self, payment_code: &str) -> ResultEngine<Fulfillment> {
        let _guard = self.write_lock.lock().await;
        let order = self.find_pending(payment_code).await?;
        let expected = self.catalog.price(&order.package, order.account_type)?;
        self.fulfill(order, expected, expected, Classification::Exact)
            .await
    }

    /// `confirm_over <code> <amount>`: fulfils recording an overpayment.
    pub async fn confirm_over(&self, payment_code: &str, amount: Vnd) -> ResultEngine<Fulfillment> {
        let _guard = self.write_lock.lock().await;
        let order = self.find_pending(payment_code).await?;
        let expected = self.catalog.price(&order.package, order.account_type)?;

        let classification = classify(expected, amount);
        if !classification.fulfils() {
            return Err(EngineError::InvalidAmount(format!(
                "{amount} is below the price {expected}"
            )));
        }
        self.fulfill(order, expected, amount, classification).await
    }

    /// `confirm_under <code> <amount>`: records an underpayment, no
    /// fulfilment.
    pub async fn confirm_under(
        &self,
        payment_code: &str,
        amount: Vnd,
    ) -> ResultEngine<Underpayment> {
        let _guard = self.write_lock.lock().await;
        let order = self.find_pending(payment_code).await?;
        let expected = self.catalog.price(&order.package, order.account_type)?;

        let Classification::Under(shortfall) = classify(expected, amount) else {
            return Err(EngineError::InvalidAmount(format!(
                "{amount} is not below the price {expected}"
            )));
        };
        let order = self
            .set_status(&order.payment_code, OrderStatus::Underpaid)
            .await?;

        Ok(Underpayment {
            order,
            expected,
            amount,
            shortfall,
        })
    }

    /// `confirm_none <code>`: no transfer arrived; the order stays pending as
    /// `no_payment`.
    pub async fn confirm_none(&self, payment_code: &str) -> ResultEngine<PendingOrder> {
        let _guard = self.write_lock.lock().await;
        self.set_status(payment_code.trim(), OrderStatus::NoPayment)
            .await
    }

    async fn find_pending(&self, payment_code: &str) -> ResultEngine<PendingOrder> {
        let code = payment_code.trim();
        let pending: PendingOrders = self.documents.load(Document::PendingOrders).await?;
        pending
            .get(code)
            .cloned()
            .ok_or_else(|| EngineError::OrderNotFound(code.to_string()))
    }

    async fn set_status(&self, payment_code: &str, status: OrderStatus) -> ResultEngine<PendingOrder> {
        self.documents
            .update(Document::PendingOrders, |pending: &mut PendingOrders| {
                let order = pending
                    .get_mut(payment_code)
                    .ok_or_else(|| EngineError::OrderNotFound(payment_code.to_string()))?;
                if order.status == status {
                    return Ok(Mutation::Keep(order.clone()));
                }
                order.status = status;
                Ok(Mutation::Write(order.clone()))
            })
            .await
    }

    /// Pops the credential (shop type), records the completed order, deletes
    /// the pending order and closes the session, in this order.
    ///
    /// The steps touch separate documents; a store failure between two of
    /// them leaves the earlier ones applied.
    async fn fulfill(
        &self,
        order: PendingOrder,
        expected: Vnd,
        amount: Vnd,
        classification: Classification,
    ) -> ResultEngine<Fulfillment> {
        let credential = if order.account_type.is_inventory_backed() {
            self.allocate_locked(Inventory::Shop, &order.package).await
        } else {
            None
        };
        let stock_out = order.account_type.is_inventory_backed() && credential.is_none();
        if stock_out {
            tracing::warn!(
                "no {} credential left for order {}",
                order.package,
                order.payment_code
            );
        }

        let completed = CompletedOrder {
            username: order.username.clone(),
            chat_id: order.chat_id,
            package: order.package.clone(),
            account_type: order.account_type,
            info: order.info.clone(),
            credential,
            payment_code: order.payment_code.clone(),
            amount,
            status: CompletedStatus::Paid,
            paid_at: Utc::now(),
        };

        let key = order.user_id.to_string();
        let replaced_previous = self
            .documents
            .update(Document::Orders, |orders: &mut Orders| {
                let replaced = orders.insert(key.clone(), completed.clone()).is_some();
                Ok(Mutation::Write(replaced))
            })
            .await?;

        self.documents
            .update(Document::PendingOrders, |pending: &mut PendingOrders| {
                if pending.remove(&order.payment_code).is_some() {
                    Ok(Mutation::Write(()))
                } else {
                    Ok(Mutation::Keep(()))
                }
            })
            .await?;

        if let Err(err) = self
            .close_session(order.user_id, Some(&order.payment_code))
            .await
        {
            tracing::warn!("failed to close session of user {}: {err}", order.user_id);
        }

        tracing::info!(
            "order {} fulfilled for user {} ({amount})",
            order.payment_code,
            order.user_id
        );

        Ok(Fulfillment {
            user_id: order.user_id,
            order: completed,
            expected,
            classification,
            stock_out,
            replaced_previous,
        })
    }

    pub async fn completed_orders(&self) -> ResultEngine<Orders> {
        self.documents.load(Document::Orders).await
    }
}
