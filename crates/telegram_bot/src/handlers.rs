use api_types::payment::{Notifications, PaymentMatch, PaymentNotification, PaymentReport};
use engine::{
    AccountType, Classification, EngineError, Fulfillment, Inventory, Reconciliation,
    Underpayment, Vnd,
};
use reqwest::Url;
use teloxide::{
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup},
    utils::html::escape,
};

use crate::{
    Delivery, ShopBot,
    commands::UserCommand,
    inbound::{Inbound, IncomingCallback, IncomingMessage},
    parsing::{AdminCommand, CallbackAction},
    ui,
};

impl ShopBot {
    /// Reacts to one update. Failures are logged and, where it helps, told to
    /// the user; nothing is propagated to the webhook.
    pub async fn handle(&self, inbound: Inbound) {
        match inbound {
            Inbound::Message(msg) => self.handle_message(msg).await,
            Inbound::Callback(callback) => self.handle_callback(callback).await,
        }
    }

    /// Reconciles a bank notification and tells both parties.
    pub async fn handle_payment(
        &self,
        notification: PaymentNotification,
    ) -> Result<PaymentReport, EngineError> {
        let reconciliation = self
            .shop
            .reconcile(&notification.code, notification.amount.map(Vnd::new))
            .await?;

        let report = match reconciliation {
            Reconciliation::Fulfilled(fulfillment) => {
                let notifications = self.notify_fulfillment(&fulfillment).await;
                fulfillment_report(&fulfillment, notifications)
            }
            Reconciliation::Underpaid(underpayment) => {
                let notifications = self.notify_underpayment(&underpayment).await;
                underpayment_report(&underpayment, notifications)
            }
        };
        Ok(report)
    }

    async fn handle_message(&self, msg: IncomingMessage) {
        let chat_id = msg.chat_id;
        let Some(text) = msg.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            self.send(chat_id, ui::TEXT_ONLY_TEXT.to_string(), None)
                .await;
            return;
        };

        if let Some(cmd) = UserCommand::parse_text(text, &self.bot_username) {
            match cmd {
                UserCommand::Start => {
                    match self.shop.register_user(msg.customer.user_id).await {
                        Ok(true) => tracing::info!("new user {}", msg.customer.user_id),
                        Ok(false) => {}
                        Err(err) => tracing::error!(
                            "failed to register user {}: {err}",
                            msg.customer.user_id
                        ),
                    }
                    let (text, kb) = ui::render_main_menu();
                    self.send(chat_id, text, Some(kb)).await;
                }
                UserCommand::Help => {
                    self.send(chat_id, ui::help_text(self.is_admin(chat_id)), None)
                        .await;
                }
            }
            return;
        }

        if self.is_admin(chat_id)
            && let Some(parsed) = AdminCommand::parse(text)
        {
            let replies = match parsed {
                Ok(cmd) => self.run_admin(cmd).await,
                Err(err) => vec![format!("⚠️ {}", escape(&err.to_string()))],
            };
            for reply in replies {
                self.send(chat_id, reply, None).await;
            }
            return;
        }

        if text.starts_with('/') {
            self.send(chat_id, ui::help_text(self.is_admin(chat_id)), None)
                .await;
            return;
        }

        match self.shop.submit_info(msg.customer.user_id, text).await {
            Ok(Some(order)) => {
                self.send(self.admin_chat, ui::admin_new_order_text(&order), None)
                    .await;
                self.send(chat_id, ui::info_recorded_text().to_string(), None)
                    .await;
            }
            Ok(None) => {
                self.send(chat_id, ui::NO_SESSION_TEXT.to_string(), None)
                    .await;
            }
            Err(err) => {
                tracing::error!(
                    "failed to record info of user {}: {err}",
                    msg.customer.user_id
                );
                self.send(chat_id, ui::user_message_for_engine_error(&err), None)
                    .await;
            }
        }
    }

    async fn handle_callback(&self, callback: IncomingCallback) {
        let answered = self.messenger.answer_callback(&callback.id).await;
        log_delivery("callback answer", callback.chat_id, &answered);

        let action = match callback.data.parse::<CallbackAction>() {
            Ok(action) => action,
            Err(err) => {
                tracing::warn!("{err}");
                self.edit(&callback, ui::INVALID_OPTION_TEXT.to_string(), None)
                    .await;
                return;
            }
        };

        match action {
            CallbackAction::MainMenu => {
                let (text, kb) = ui::render_main_menu();
                self.edit(&callback, text, Some(kb)).await;
            }
            CallbackAction::BuyMenu => {
                let (text, kb) = ui::render_package_menu(self.shop.catalog());
                self.edit(&callback, text, Some(kb)).await;
            }
            CallbackAction::FreeMenu => {
                let (text, kb) = ui::render_free_menu(&self.free_packages);
                self.edit(&callback, text, Some(kb)).await;
            }
            CallbackAction::Package(package) => {
                let (text, kb) = match ui::render_account_type_menu(self.shop.catalog(), &package)
                {
                    Some((text, kb)) => (text, Some(kb)),
                    None => (ui::INVALID_OPTION_TEXT.to_string(), None),
                };
                self.edit(&callback, text, kb).await;
            }
            CallbackAction::Checkout {
                package,
                account_type,
            } => self.checkout(&callback, &package, account_type).await,
            CallbackAction::FreeItem(package) => self.claim_free(&callback, &package).await,
        }
    }

    async fn checkout(&self, callback: &IncomingCallback, package: &str, account_type: AccountType) {
        let checkout = match self
            .shop
            .start_checkout(&callback.customer, package, account_type)
            .await
        {
            Ok(checkout) => checkout,
            Err(err) => {
                tracing::warn!(
                    "checkout of {package}-{account_type} for user {} failed: {err}",
                    callback.customer.user_id
                );
                self.edit(callback, ui::user_message_for_engine_error(&err), None)
                    .await;
                return;
            }
        };

        let quote = &checkout.quote;
        tracing::info!(
            "pending order {} created ({})",
            quote.payment_code,
            quote.amount
        );
        self.edit(callback, ui::checkout_text(quote, checkout.replaced), None)
            .await;

        match Url::parse(&quote.qr_url) {
            Ok(url) => {
                let sent = self
                    .messenger
                    .send_photo(callback.chat_id, url, ui::qr_caption(quote))
                    .await;
                log_delivery("QR image", callback.chat_id, &sent);
            }
            Err(err) => tracing::error!("invalid QR url {}: {err}", quote.qr_url),
        }
    }

    async fn claim_free(&self, callback: &IncomingCallback, package: &str) {
        if !self.free_packages.iter().any(|p| p == package) {
            self.edit(callback, ui::INVALID_OPTION_TEXT.to_string(), None)
                .await;
            return;
        }

        let back = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "⬅️ Quay lại",
            CallbackAction::FreeMenu.to_string(),
        )]]);
        let text = match self.shop.claim_free(package).await {
            Some(credential) => {
                tracing::info!(
                    "free {package} issued to user {}",
                    callback.customer.user_id
                );
                ui::free_claimed_text(package, &credential)
            }
            None => ui::free_out_of_stock_text(package),
        };
        self.edit(callback, text, Some(back)).await;
    }

    /// Runs an operator command and returns the replies for the admin chat.
    async fn run_admin(&self, cmd: AdminCommand) -> Vec<String> {
        tracing::info!("admin command {cmd:?}");
        let reply = match cmd {
            AdminCommand::Confirm { code } => {
                let fulfilled = self.shop.confirm(&code).await;
                self.admin_fulfilled(fulfilled).await
            }
            AdminCommand::ConfirmOver { code, amount } => {
                let fulfilled = self.shop.confirm_over(&code, amount).await;
                self.admin_fulfilled(fulfilled).await
            }
            AdminCommand::ConfirmUnder { code, amount } => {
                match self.shop.confirm_under(&code, amount).await {
                    Ok(underpayment) => {
                        let delivery = self
                            .send(
                                ChatId(underpayment.order.chat_id),
                                ui::underpaid_customer_text(&underpayment),
                                None,
                            )
                            .await;
                        with_delivery_note(ui::underpaid_admin_text(&underpayment), &delivery)
                    }
                    Err(err) => ui::admin_message_for_engine_error(&err),
                }
            }
            AdminCommand::ConfirmNone { code } => match self.shop.confirm_none(&code).await {
                Ok(order) => {
                    let delivery = self
                        .send(
                            ChatId(order.chat_id),
                            ui::no_payment_customer_text(&order),
                            None,
                        )
                        .await;
                    with_delivery_note(ui::no_payment_admin_text(&order), &delivery)
                }
                Err(err) => ui::admin_message_for_engine_error(&err),
            },
            AdminCommand::Pending => match self.shop.pending_orders().await {
                Ok(orders) => return ui::render_pending(&orders),
                Err(err) => ui::admin_message_for_engine_error(&err),
            },
            AdminCommand::Stock => {
                let levels = tokio::try_join!(
                    self.shop.stock_levels(Inventory::Shop),
                    self.shop.stock_levels(Inventory::Free)
                );
                match levels {
                    Ok((shop, free)) => ui::render_stock(&shop, &free),
                    Err(err) => ui::admin_message_for_engine_error(&err),
                }
            }
        };
        vec![reply]
    }

    async fn admin_fulfilled(&self, fulfilled: Result<Fulfillment, EngineError>) -> String {
        match fulfilled {
            Ok(fulfillment) => {
                let delivery = self
                    .send(
                        ChatId(fulfillment.order.chat_id),
                        ui::fulfilled_customer_text(&fulfillment),
                        None,
                    )
                    .await;
                with_delivery_note(ui::fulfilled_admin_text(&fulfillment), &delivery)
            }
            Err(err) => ui::admin_message_for_engine_error(&err),
        }
    }

    async fn notify_fulfillment(&self, fulfillment: &Fulfillment) -> Notifications {
        let customer = self
            .send(
                ChatId(fulfillment.order.chat_id),
                ui::fulfilled_customer_text(fulfillment),
                None,
            )
            .await;
        let admin = self
            .send(self.admin_chat, ui::fulfilled_admin_text(fulfillment), None)
            .await;
        Notifications {
            customer: customer.status(),
            admin: admin.status(),
        }
    }

    async fn notify_underpayment(&self, underpayment: &Underpayment) -> Notifications {
        let customer = self
            .send(
                ChatId(underpayment.order.chat_id),
                ui::underpaid_customer_text(underpayment),
                None,
            )
            .await;
        let admin = self
            .send(self.admin_chat, ui::underpaid_admin_text(underpayment), None)
            .await;
        Notifications {
            customer: customer.status(),
            admin: admin.status(),
        }
    }

    fn is_admin(&self, chat_id: ChatId) -> bool {
        chat_id == self.admin_chat
    }

    async fn send(
        &self,
        chat_id: ChatId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery {
        let delivery = self.messenger.send_text(chat_id, text, keyboard).await;
        log_delivery("message", chat_id, &delivery);
        delivery
    }

    async fn edit(
        &self,
        callback: &IncomingCallback,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery {
        let delivery = self
            .messenger
            .edit_text(callback.chat_id, callback.message_id, text, keyboard)
            .await;
        log_delivery("edit", callback.chat_id, &delivery);
        delivery
    }
}

fn log_delivery(what: &str, chat_id: ChatId, delivery: &Delivery) {
    match delivery {
        Delivery::Delivered => {}
        Delivery::Retryable(reason) => {
            tracing::warn!("{what} to chat {chat_id} not delivered, retryable: {reason}")
        }
        Delivery::Fatal(reason) => {
            tracing::warn!("{what} to chat {chat_id} rejected: {reason}")
        }
    }
}

fn with_delivery_note(mut reply: String, customer: &Delivery) -> String {
    match customer {
        Delivery::Delivered => {}
        Delivery::Retryable(reason) | Delivery::Fatal(reason) => reply.push_str(&format!(
            "\n\n📭 Chưa gửi được tin cho khách: {}",
            escape(reason)
        )),
    }
    reply
}

fn fulfillment_report(fulfillment: &Fulfillment, notifications: Notifications) -> PaymentReport {
    PaymentReport {
        code: fulfillment.order.payment_code.clone(),
        matched: match fulfillment.classification {
            Classification::Over(_) => PaymentMatch::Over,
            _ => PaymentMatch::Exact,
        },
        fulfilled: true,
        expected: fulfillment.expected.get(),
        amount: fulfillment.order.amount.get(),
        overage: fulfillment.overage().map(Vnd::get),
        shortfall: None,
        credential_issued: fulfillment.order.credential.is_some(),
        paid_at: Some(fulfillment.order.paid_at),
        notifications,
    }
}

fn underpayment_report(underpayment: &Underpayment, notifications: Notifications) -> PaymentReport {
    PaymentReport {
        code: underpayment.order.payment_code.clone(),
        matched: PaymentMatch::Under,
        fulfilled: false,
        expected: underpayment.expected.get(),
        amount: underpayment.amount.get(),
        overage: None,
        shortfall: Some(underpayment.shortfall.get()),
        credential_issued: false,
        paid_at: None,
        notifications,
    }
}
