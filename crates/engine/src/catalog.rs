//! Packages on sale and their prices.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, Vnd};

/// How the customer gets the upgraded account.
///
/// - `Own`: the customer's existing account, upgraded by the operator.
/// - `Shop`: a shop-issued credential popped from the shop inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Own,
    Shop,
}

impl AccountType {
    pub const ALL: [AccountType; 2] = [AccountType::Own, AccountType::Shop];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Shop => "shop",
        }
    }

    /// Whether fulfilment pops a credential from the shop inventory.
    pub const fn is_inventory_backed(self) -> bool {
        matches!(self, Self::Shop)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "own" => Ok(Self::Own),
            "shop" => Ok(Self::Shop),
            other => Err(EngineError::UnknownProduct(format!(
                "account type \"{other}\""
            ))),
        }
    }
}

/// Normalizes a package name the way it is stored (`plus` -> `PLUS`).
pub fn normalize_package(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// One row of the price table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub package: String,
    pub account_type: AccountType,
    pub amount: Vnd,
}

/// Static price table indexed by (package, account type).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    prices: BTreeMap<(String, AccountType), Vnd>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_entries([
            ("GO", AccountType::Own, 50_000),
            ("GO", AccountType::Shop, 70_000),
            ("PLUS", AccountType::Own, 100_000),
            ("PLUS", AccountType::Shop, 150_000),
            ("TEAM", AccountType::Own, 200_000),
            ("TEAM", AccountType::Shop, 250_000),
        ]
        .into_iter()
        .map(|(package, account_type, amount)| PriceEntry {
            package: package.to_string(),
            account_type,
            amount: Vnd::new(amount),
        }))
    }
}

impl Catalog {
    pub fn from_entries(entries: impl IntoIterator<Item = PriceEntry>) -> Self {
        let prices = entries
            .into_iter()
            .map(|e| ((normalize_package(&e.package), e.account_type), e.amount))
            .collect();
        Self { prices }
    }

    /// Expected price for a package and account type.
    pub fn price(&self, package: &str, account_type: AccountType) -> ResultEngine<Vnd> {
        self.prices
            .get(&(normalize_package(package), account_type))
            .copied()
            .ok_or_else(|| {
                EngineError::UnknownProduct(format!("{}-{account_type}", normalize_package(package)))
            })
    }

    /// Package names in table order, without duplicates.
    pub fn packages(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (package, _) in self.prices.keys() {
            if out.last() != Some(&package.as_str()) {
                out.push(package);
            }
        }
        out
    }

    /// Account types on sale for a package, with their price.
    pub fn offers(&self, package: &str) -> Vec<(AccountType, Vnd)> {
        let package = normalize_package(package);
        AccountType::ALL
            .into_iter()
            .filter_map(|t| self.prices.get(&(package.clone(), t)).map(|p| (t, *p)))
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = PriceEntry> + '_ {
        self.prices.iter().map(|((package, t), amount)| PriceEntry {
            package: package.clone(),
            account_type: *t,
            amount: *amount,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_on_package() {
        let catalog = Catalog::default();
        assert_eq!(
            catalog.price("plus", AccountType::Own).unwrap(),
            Vnd::new(100_000)
        );
    }

    #[test]
    fn unknown_package_is_a_lookup_failure() {
        let err = Catalog::default()
            .price("ULTRA", AccountType::Shop)
            .unwrap_err();
        assert_eq!(err.code(), "unknown_product");
    }

    #[test]
    fn packages_are_unique() {
        assert_eq!(Catalog::default().packages(), vec!["GO", "PLUS", "TEAM"]);
    }

    #[test]
    fn offers_list_only_priced_types() {
        let catalog = Catalog::from_entries([PriceEntry {
            package: "edu".to_string(),
            account_type: AccountType::Own,
            amount: Vnd::new(10_000),
        }]);
        assert_eq!(catalog.offers("EDU"), vec![(AccountType::Own, Vnd::new(10_000))]);
        assert!(catalog.offers("GO").is_empty());
    }

    #[test]
    fn account_type_parses_case_insensitive() {
        assert_eq!("SHOP".parse::<AccountType>().unwrap(), AccountType::Shop);
        assert!("gift".parse::<AccountType>().is_err());
    }
}
