use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Document, EngineError, Stock, catalog::normalize_package};

/// Which credential list a package is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inventory {
    /// Giveaways of the free menu.
    Free,
    /// Credentials sold with the `shop` account type.
    Shop,
}

impl Inventory {
    pub const fn document(self) -> Document {
        match self {
            Self::Free => Document::FreeAccounts,
            Self::Shop => Document::ShopAccounts,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Shop => "shop",
        }
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Inventory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "shop" => Ok(Self::Shop),
            other => Err(EngineError::UnknownProduct(format!("inventory \"{other}\""))),
        }
    }
}

/// Removes and returns the first credential listed for `package`.
///
/// The key stays in the document with an empty list once drained.
pub(crate) fn pop_first(stock: &mut Stock, package: &str) -> Option<String> {
    let list = stock.get_mut(&normalize_package(package))?;
    if list.is_empty() {
        return None;
    }
    Some(list.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(entries: &[(&str, &[&str])]) -> Stock {
        entries
            .iter()
            .map(|(p, creds)| (p.to_string(), creds.iter().map(|c| c.to_string()).collect()))
            .collect()
    }

    #[test]
    fn pops_in_list_order() {
        let mut s = stock(&[("GO", &["a:1", "b:2", "c:3"])]);
        assert_eq!(pop_first(&mut s, "GO").as_deref(), Some("a:1"));
        assert_eq!(pop_first(&mut s, "go").as_deref(), Some("b:2"));
        assert_eq!(s["GO"], vec!["c:3".to_string()]);
    }

    #[test]
    fn drained_list_keeps_its_key() {
        let mut s = stock(&[("GO", &["a:1"])]);
        pop_first(&mut s, "GO");
        assert_eq!(pop_first(&mut s, "GO"), None);
        assert!(s["GO"].is_empty());
    }

    #[test]
    fn absent_package_is_none() {
        let mut s = stock(&[("GO", &["a:1"])]);
        assert_eq!(pop_first(&mut s, "TEAM"), None);
        assert_eq!(s.len(), 1);
    }
}
