use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Ho_Chi_Minh;
use engine::{
    AccountType, Catalog, EngineError, Fulfillment, PendingOrder, Quote, Underpayment,
};
use teloxide::{
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
    utils::html::escape,
};

use crate::parsing::{AdminCommand, CallbackAction};

/// Telegram rejects messages longer than this many UTF-16 code units.
pub(crate) const MESSAGE_LIMIT: usize = 4096;
/// Characters of customer info quoted in an admin notice.
const INFO_PREVIEW: usize = 500;
/// Characters of customer info quoted per line of the pending list.
const PENDING_INFO_PREVIEW: usize = 120;

/// Length as Telegram counts it.
pub(crate) fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Escaped prefix of `info`, cut at `max_chars` characters.
fn info_preview(info: &str, max_chars: usize) -> String {
    match info.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", escape(&info[..cut])),
        None => escape(info),
    }
}

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.to_string())
}

fn back_row(to: CallbackAction) -> Vec<InlineKeyboardButton> {
    vec![button("⬅️ Quay lại", to)]
}

fn account_label(account_type: AccountType) -> &'static str {
    match account_type {
        AccountType::Own => "Tài khoản của bạn",
        AccountType::Shop => "Tài khoản shop cấp",
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Ho_Chi_Minh)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

fn customer_line(username: Option<&str>, user_id: u64) -> String {
    match username {
        Some(handle) => format!("👤 @{} (<code>{user_id}</code>)", escape(handle)),
        None => format!("👤 <code>{user_id}</code>"),
    }
}

pub(crate) fn render_main_menu() -> (String, InlineKeyboardMarkup) {
    let text = "👋 Chào mừng bạn đến với shop!\n\n👉 Chọn một tuỳ chọn bên dưới:".to_string();
    let kb = InlineKeyboardMarkup::new(vec![vec![
        button("📦 Mua gói", CallbackAction::BuyMenu),
        button("🎁 Miễn phí", CallbackAction::FreeMenu),
    ]]);
    (text, kb)
}

pub(crate) fn render_package_menu(catalog: &Catalog) -> (String, InlineKeyboardMarkup) {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = catalog
        .packages()
        .into_iter()
        .map(|package| {
            vec![button(
                format!("📦 {package}"),
                CallbackAction::Package(package.to_string()),
            )]
        })
        .collect();
    rows.push(back_row(CallbackAction::MainMenu));

    (
        "Bạn muốn mua gói nào?".to_string(),
        InlineKeyboardMarkup::new(rows),
    )
}

/// `None` when the package is not on sale.
pub(crate) fn render_account_type_menu(
    catalog: &Catalog,
    package: &str,
) -> Option<(String, InlineKeyboardMarkup)> {
    let offers = catalog.offers(package);
    if offers.is_empty() {
        return None;
    }

    let mut text = format!("<b>Gói {}</b>\n", escape(package));
    let mut rows = Vec::new();
    for (account_type, price) in offers {
        text.push_str(&format!("\n• {}: {price}", account_label(account_type)));
        rows.push(vec![button(
            format!("{} • {price}", account_label(account_type)),
            CallbackAction::Checkout {
                package: package.to_string(),
                account_type,
            },
        )]);
    }
    text.push_str("\n\nChọn loại tài khoản:");
    rows.push(back_row(CallbackAction::BuyMenu));

    Some((text, InlineKeyboardMarkup::new(rows)))
}

pub(crate) fn render_free_menu(packages: &[String]) -> (String, InlineKeyboardMarkup) {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = packages
        .iter()
        .map(|package| {
            vec![button(
                format!("🎁 {package}"),
                CallbackAction::FreeItem(package.clone()),
            )]
        })
        .collect();
    rows.push(back_row(CallbackAction::MainMenu));

    (
        "🎁 Chọn gói miễn phí bạn muốn nhận:".to_string(),
        InlineKeyboardMarkup::new(rows),
    )
}

pub(crate) fn checkout_text(quote: &Quote, replaced: bool) -> String {
    let mut text = format!(
        "🛒 <b>Gói {}</b> • {}\n\n\
         💳 Số tiền cần thanh toán: <b>{}</b>\n\
         📝 Nội dung chuyển khoản: <code>{}</code>\n\n\
         📌 Quét mã QR bên dưới để thanh toán, giữ nguyên nội dung chuyển khoản.\n\
         ✉️ Sau đó gửi email hoặc thông tin tài khoản của bạn vào đây.",
        escape(&quote.package),
        account_label(quote.account_type),
        quote.amount,
        escape(&quote.payment_code),
    );
    if replaced {
        text.push_str("\n\nℹ️ Đơn trước của bạn cho gói này đã được thay thế.");
    }
    text
}

pub(crate) fn qr_caption(quote: &Quote) -> String {
    format!(
        "{} • <code>{}</code>",
        quote.amount,
        escape(&quote.payment_code)
    )
}

pub(crate) fn free_claimed_text(package: &str, credential: &str) -> String {
    format!(
        "🎉 Bạn đã nhận gói <b>{}</b>!\n\n<code>{}</code>",
        escape(package),
        escape(credential)
    )
}

pub(crate) fn free_out_of_stock_text(package: &str) -> String {
    format!(
        "😔 Gói miễn phí <b>{}</b> đã hết. Vui lòng quay lại sau!",
        escape(package)
    )
}

pub(crate) const INVALID_OPTION_TEXT: &str = "Tuỳ chọn không hợp lệ.";
pub(crate) const TEXT_ONLY_TEXT: &str = "⚠ Vui lòng gửi thông tin dạng text.";
pub(crate) const NO_SESSION_TEXT: &str = "ℹ️ Bạn chưa chọn gói nào. Gõ /start để bắt đầu.";

pub(crate) fn info_recorded_text() -> &'static str {
    "✅ Thông tin đã được ghi nhận.\nAdmin sẽ hỗ trợ bạn sớm!"
}

pub(crate) fn admin_new_order_text(order: &PendingOrder) -> String {
    format!(
        "📥 <b>ĐƠN MỚI</b>\n\
         {}\n\
         📦 Gói: <b>{}</b> • {}\n\
         🔑 Mã: <code>{}</code>\n\
         ℹ️ Info: <code>{}</code>",
        customer_line(order.username.as_deref(), order.user_id),
        escape(&order.package),
        order.account_type,
        escape(&order.payment_code),
        info_preview(&order.info, INFO_PREVIEW),
    )
}

pub(crate) fn fulfilled_customer_text(fulfillment: &Fulfillment) -> String {
    let order = &fulfillment.order;
    let mut text = format!(
        "✅ <b>Thanh toán thành công!</b>\n\n\
         📦 Gói: <b>{}</b> • {}\n\
         💳 Đã nhận: {}\n\
         🕒 {}",
        escape(&order.package),
        account_label(order.account_type),
        order.amount,
        local_time(order.paid_at),
    );
    if let Some(overage) = fulfillment.overage() {
        text.push_str(&format!(
            "\n\n💰 Bạn đã chuyển dư {overage}. Admin sẽ liên hệ để hoàn lại."
        ));
    }
    match (&order.credential, fulfillment.stock_out) {
        (Some(credential), _) => text.push_str(&format!(
            "\n\n🔑 Tài khoản của bạn:\n<code>{}</code>",
            escape(credential)
        )),
        (None, true) => text.push_str(
            "\n\n⏳ Tài khoản tạm hết hàng, admin sẽ gửi cho bạn sớm nhất.",
        ),
        (None, false) => text.push_str("\n\n⏳ Admin sẽ nâng cấp tài khoản của bạn sớm."),
    }
    text
}

pub(crate) fn fulfilled_admin_text(fulfillment: &Fulfillment) -> String {
    let order = &fulfillment.order;
    let mut text = format!(
        "💵 <b>ĐÃ THANH TOÁN</b>\n\
         {}\n\
         📦 Gói: <b>{}</b> • {}\n\
         🔑 Mã: <code>{}</code>\n\
         💳 {} / {}\n\
         ℹ️ Info: <code>{}</code>",
        customer_line(order.username.as_deref(), fulfillment.user_id),
        escape(&order.package),
        order.account_type,
        escape(&order.payment_code),
        order.amount,
        fulfillment.expected,
        info_preview(&order.info, INFO_PREVIEW),
    );
    if let Some(overage) = fulfillment.overage() {
        text.push_str(&format!("\n💰 Dư: {overage}"));
    }
    if fulfillment.stock_out {
        text.push_str("\n⚠️ Hết tài khoản shop, cần cấp thủ công!");
    }
    if fulfillment.replaced_previous {
        text.push_str("\n♻️ Ghi đè đơn hoàn tất trước đó của khách.");
    }
    text
}

pub(crate) fn underpaid_customer_text(underpayment: &Underpayment) -> String {
    format!(
        "⚠️ <b>Thanh toán chưa đủ</b>\n\n\
         🔑 Mã: <code>{}</code>\n\
         💳 Đã nhận: {} / {}\n\
         ➕ Vui lòng chuyển thêm <b>{}</b> với cùng nội dung.",
        escape(&underpayment.order.payment_code),
        underpayment.amount,
        underpayment.expected,
        underpayment.shortfall,
    )
}

pub(crate) fn underpaid_admin_text(underpayment: &Underpayment) -> String {
    format!(
        "⚠️ <b>THIẾU TIỀN</b>\n\
         {}\n\
         🔑 Mã: <code>{}</code>\n\
         💳 {} / {} (thiếu {})",
        customer_line(
            underpayment.order.username.as_deref(),
            underpayment.order.user_id
        ),
        escape(&underpayment.order.payment_code),
        underpayment.amount,
        underpayment.expected,
        underpayment.shortfall,
    )
}

pub(crate) fn no_payment_customer_text(order: &PendingOrder) -> String {
    format!(
        "❌ Chưa nhận được thanh toán cho mã <code>{}</code>.\n\
         Vui lòng kiểm tra lại giao dịch và nội dung chuyển khoản.",
        escape(&order.payment_code)
    )
}

pub(crate) fn no_payment_admin_text(order: &PendingOrder) -> String {
    format!(
        "❌ Đã đánh dấu <code>{}</code> là chưa thanh toán.",
        escape(&order.payment_code)
    )
}

/// One or more messages, each within [`MESSAGE_LIMIT`].
pub(crate) fn render_pending(orders: &[PendingOrder]) -> Vec<String> {
    if orders.is_empty() {
        return vec!["Không có đơn đang chờ.".to_string()];
    }

    let mut pages = Vec::new();
    let mut page = format!("<b>Đơn đang chờ ({})</b>\n", orders.len());
    for order in orders {
        let mut line = format!(
            "\n• <code>{}</code> • {} • {}",
            escape(&order.payment_code),
            order.status.as_str(),
            local_time(order.created_at),
        );
        if !order.info.is_empty() {
            line.push_str(&format!(
                " • {}",
                info_preview(&order.info, PENDING_INFO_PREVIEW)
            ));
        }
        if telegram_len(&page) + telegram_len(&line) > MESSAGE_LIMIT {
            pages.push(std::mem::take(&mut page));
        }
        page.push_str(&line);
    }
    pages.push(page);
    pages
}

pub(crate) fn render_stock(
    shop: &BTreeMap<String, usize>,
    free: &BTreeMap<String, usize>,
) -> String {
    let mut text = String::from("<b>Kho tài khoản</b>\n");
    for (title, levels) in [("Shop", shop), ("Miễn phí", free)] {
        text.push_str(&format!("\n<i>{title}</i>"));
        if levels.is_empty() {
            text.push_str("\n• (trống)");
        }
        for (package, count) in levels {
            text.push_str(&format!("\n• {}: {count}", escape(package)));
        }
    }
    text
}

pub(crate) fn help_text(is_admin: bool) -> String {
    let mut text = String::from(
        "/start: mở menu mua gói hoặc nhận gói miễn phí.\n\
         /help: hiển thị hướng dẫn này.\n\n\
         Sau khi chọn gói, quét mã QR để thanh toán rồi gửi email tài khoản vào đây.",
    );
    if is_admin {
        text.push_str("\n\n<b>Lệnh admin</b>\n<code>");
        text.push_str(&escape(AdminCommand::USAGE));
        text.push_str("</code>");
    }
    text
}

pub(crate) fn user_message_for_engine_error(err: &EngineError) -> String {
    match err {
        EngineError::UnknownProduct(_) => "Gói này hiện không bán.".to_string(),
        EngineError::PaymentCodeTaken(code) => format!(
            "Mã thanh toán <code>{}</code> đang được dùng cho một đơn khác. Vui lòng liên hệ admin.",
            escape(code)
        ),
        EngineError::OrderNotFound(_) => "Không tìm thấy đơn hàng.".to_string(),
        _ => "Hệ thống đang bận, vui lòng thử lại sau!".to_string(),
    }
}

pub(crate) fn admin_message_for_engine_error(err: &EngineError) -> String {
    match err {
        EngineError::OrderNotFound(code) => {
            format!("❓ Không tìm thấy đơn <code>{}</code>.", escape(code))
        }
        other => format!("⚠️ {}", escape(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use engine::OrderStatus;

    use super::*;

    #[test]
    fn package_menu_lists_catalog_in_order() {
        let (_, kb) = render_package_menu(&Catalog::default());
        let labels: Vec<&str> = kb
            .inline_keyboard
            .iter()
            .map(|row| row[0].text.as_str())
            .collect();
        assert_eq!(labels, ["📦 GO", "📦 PLUS", "📦 TEAM", "⬅️ Quay lại"]);
    }

    #[test]
    fn account_type_menu_shows_prices() {
        let (text, kb) = render_account_type_menu(&Catalog::default(), "PLUS").unwrap();
        assert!(text.contains("100,000đ"));
        assert!(text.contains("150,000đ"));
        assert_eq!(kb.inline_keyboard.len(), 3);
        assert!(render_account_type_menu(&Catalog::default(), "ULTRA").is_none());
    }

    #[test]
    fn admin_help_includes_grammar() {
        assert!(!help_text(false).contains("confirm_under"));
        assert!(help_text(true).contains("confirm_under &lt;mã&gt;"));
    }

    #[test]
    fn user_text_is_escaped() {
        let text = free_claimed_text("GO", "a<b>@mail:pw&1");
        assert!(text.contains("a&lt;b&gt;@mail:pw&amp;1"));
    }

    fn pending_order(n: usize) -> PendingOrder {
        PendingOrder {
            payment_code: format!("PLUS-own-customer{n}"),
            user_id: n as u64,
            chat_id: n as i64,
            username: Some(format!("customer{n}")),
            package: "PLUS".to_string(),
            account_type: AccountType::Own,
            status: OrderStatus::UserConfirmed,
            info: format!("customer.number.{n}@example.com / mật khẩu tạm thời {n}"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn long_pending_list_is_split_into_pages() {
        let orders: Vec<PendingOrder> = (0..200).map(pending_order).collect();
        let pages = render_pending(&orders);

        assert!(pages.len() > 1);
        assert!(pages.iter().all(|page| telegram_len(page) <= MESSAGE_LIMIT));
        assert!(pages[0].starts_with("<b>Đơn đang chờ (200)</b>"));
        let listed: usize = pages.iter().map(|page| page.matches("<code>").count()).sum();
        assert_eq!(listed, 200);
    }

    #[test]
    fn short_pending_list_fits_one_message() {
        let orders: Vec<PendingOrder> = (0..3).map(pending_order).collect();
        assert_eq!(render_pending(&orders).len(), 1);
        assert_eq!(render_pending(&[]), ["Không có đơn đang chờ."]);
    }

    #[test]
    fn admin_notice_quotes_only_a_preview_of_long_info() {
        let mut order = pending_order(1);
        order.info = "<".repeat(4000);
        let text = admin_new_order_text(&order);

        assert!(telegram_len(&text) <= MESSAGE_LIMIT);
        assert!(text.contains("&lt;…</code>"));
    }
}
