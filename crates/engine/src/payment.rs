//! Payment codes and VietQR images.
//!
//! The payment code is the free text the customer types in the bank
//! transfer. It is derived, not random: `{package}-{account_type}-{slug}`
//! where the slug is the Telegram handle or `id{user_id}`.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{AccountType, Catalog, EngineError, ResultEngine, Vnd, catalog::normalize_package};

const VIETQR_BASE: &str = "https://img.vietqr.io/image/";
const DEFAULT_TEMPLATE: &str = "compact";

/// Who is buying.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub user_id: u64,
    pub chat_id: i64,
    pub username: Option<String>,
}

impl Customer {
    /// Handle used in payment codes: the username when present, `id{user_id}`
    /// otherwise.
    pub fn slug(&self) -> String {
        match self.username.as_deref().map(str::trim) {
            Some(handle) if !handle.is_empty() => handle.trim_start_matches('@').to_string(),
            _ => format!("id{}", self.user_id),
        }
    }
}

/// Builds the payment code for a selection.
pub fn payment_code(package: &str, account_type: AccountType, customer: &Customer) -> String {
    format!(
        "{}-{}-{}",
        normalize_package(package),
        account_type,
        customer.slug()
    )
}

/// Everything the customer needs to pay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub package: String,
    pub account_type: AccountType,
    pub payment_code: String,
    pub amount: Vnd,
    pub qr_url: String,
}

/// Receiving bank account rendered into the QR image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrGenerator {
    bank_id: String,
    account_number: String,
    account_name: Option<String>,
    template: String,
}

impl QrGenerator {
    pub fn new(bank_id: &str, account_number: &str) -> Self {
        Self {
            bank_id: bank_id.trim().to_string(),
            account_number: account_number.trim().to_string(),
            account_name: None,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn account_name(mut self, name: Option<&str>) -> Self {
        self.account_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        self
    }

    pub fn template(mut self, template: &str) -> Self {
        self.template = template.to_string();
        self
    }

    /// Image URL for a transfer of `amount` annotated with `payment_code`.
    pub fn image_url(&self, amount: Vnd, payment_code: &str) -> ResultEngine<String> {
        let path = format!(
            "{}-{}-{}.png",
            self.bank_id, self.account_number, self.template
        );
        let mut url = Url::parse(VIETQR_BASE)
            .and_then(|base| base.join(&path))
            .map_err(|err| EngineError::InvalidAmount(format!("invalid QR url: {err}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("amount", &amount.get().to_string());
            query.append_pair("addInfo", payment_code);
            if let Some(name) = &self.account_name {
                query.append_pair("accountName", name);
            }
        }

        Ok(url.into())
    }

    /// Resolves price, payment code and QR image for a selection.
    pub fn quote(
        &self,
        catalog: &Catalog,
        package: &str,
        account_type: AccountType,
        customer: &Customer,
    ) -> ResultEngine<Quote> {
        let amount = catalog.price(package, account_type)?;
        let payment_code = payment_code(package, account_type, customer);
        let qr_url = self.image_url(amount, &payment_code)?;

        Ok(Quote {
            package: normalize_package(package),
            account_type,
            payment_code,
            amount,
            qr_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(username: Option<&str>) -> Customer {
        Customer {
            user_id: 4242,
            chat_id: 4242,
            username: username.map(str::to_string),
        }
    }

    #[test]
    fn slug_falls_back_to_id() {
        assert_eq!(customer(Some("alice")).slug(), "alice");
        assert_eq!(customer(Some("")).slug(), "id4242");
        assert_eq!(customer(None).slug(), "id4242");
    }

    #[test]
    fn every_catalog_entry_quotes_its_price_and_code() {
        let catalog = Catalog::default();
        let qr = QrGenerator::new("970436", "0123456789");
        let buyer = customer(Some("alice"));

        for entry in catalog.entries() {
            let quote = qr
                .quote(&catalog, &entry.package, entry.account_type, &buyer)
                .unwrap();
            let expected_code = format!("{}-{}-alice", entry.package, entry.account_type);
            assert_eq!(quote.payment_code, expected_code);
            assert_eq!(quote.amount, entry.amount);

            let url = Url::parse(&quote.qr_url).unwrap();
            let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            assert!(pairs.contains(&("amount".to_string(), entry.amount.get().to_string())));
            assert!(pairs.contains(&("addInfo".to_string(), expected_code)));
        }
    }

    #[test]
    fn image_url_embeds_bank_account() {
        let url = QrGenerator::new("970436", "0123456789")
            .account_name(Some("NGUYEN VAN A"))
            .image_url(Vnd::new(50_000), "GO-own-id1")
            .unwrap();
        assert!(url.starts_with("https://img.vietqr.io/image/970436-0123456789-compact.png?"));
        assert!(url.contains("amount=50000"));
        assert!(url.contains("addInfo=GO-own-id1"));
        assert!(url.contains("accountName=NGUYEN+VAN+A"));
    }

    #[test]
    fn unknown_product_fails_quote() {
        let err = QrGenerator::new("970436", "1")
            .quote(&Catalog::default(), "EDU", AccountType::Own, &customer(None))
            .unwrap_err();
        assert_eq!(err.code(), "unknown_product");
    }
}
