use std::{fmt, str::FromStr};

use engine::{AccountType, Vnd};

/// What an inline button asks for. Serialized into the button's
/// `callback_data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    BuyMenu,
    FreeMenu,
    /// Account-type choice for a package.
    Package(String),
    Checkout {
        package: String,
        account_type: AccountType,
    },
    FreeItem(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown callback data \"{0}\"")]
pub struct UnknownCallback(pub String);

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainMenu => f.write_str("back_main"),
            Self::BuyMenu => f.write_str("buy"),
            Self::FreeMenu => f.write_str("free"),
            Self::Package(package) => write!(f, "pkg:{package}"),
            Self::Checkout {
                package,
                account_type,
            } => write!(f, "checkout:{package}:{account_type}"),
            Self::FreeItem(package) => write!(f, "free:{package}"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCallback(s.to_string());
        let mut parts = s.trim().split(':');
        let head = parts.next().unwrap_or_default();

        let action = match (head, parts.next(), parts.next()) {
            ("back_main" | "start", None, None) => Self::MainMenu,
            ("buy", None, None) => Self::BuyMenu,
            ("free", None, None) => Self::FreeMenu,
            ("pkg", Some(package), None) if !package.is_empty() => {
                Self::Package(package.to_ascii_uppercase())
            }
            ("checkout", Some(package), Some(account_type)) if !package.is_empty() => {
                Self::Checkout {
                    package: package.to_ascii_uppercase(),
                    account_type: account_type.parse().map_err(|_| unknown())?,
                }
            }
            ("free", Some(package), None) if !package.is_empty() => {
                Self::FreeItem(package.to_ascii_uppercase())
            }
            _ => return Err(unknown()),
        };

        if parts.next().is_some() {
            return Err(unknown());
        }
        Ok(action)
    }
}

/// Operator commands. Accepted with or without a leading `/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    Confirm { code: String },
    ConfirmUnder { code: String, amount: Vnd },
    ConfirmOver { code: String, amount: Vnd },
    ConfirmNone { code: String },
    Pending,
    Stock,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdminParseError {
    #[error("cú pháp: {0}")]
    Usage(&'static str),
    #[error("số tiền không hợp lệ: {0}")]
    InvalidAmount(String),
}

impl AdminCommand {
    pub const USAGE: &'static str = "confirm <mã>\nconfirm_under <mã> <số tiền>\nconfirm_over <mã> <số tiền>\nconfirm_none <mã>\npending\nstock";

    /// `None` when the text is not an admin command at all.
    pub fn parse(text: &str) -> Option<Result<Self, AdminParseError>> {
        let mut words = text.split_whitespace();
        let verb = words.next()?.trim_start_matches('/').to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let parsed = match verb.as_str() {
            "confirm" => match args.as_slice() {
                [code] => Ok(Self::Confirm {
                    code: code.to_string(),
                }),
                _ => Err(AdminParseError::Usage("confirm <mã>")),
            },
            "confirm_under" => match args.as_slice() {
                [code, amount] => parse_amount(amount).map(|amount| Self::ConfirmUnder {
                    code: code.to_string(),
                    amount,
                }),
                _ => Err(AdminParseError::Usage("confirm_under <mã> <số tiền>")),
            },
            "confirm_over" => match args.as_slice() {
                [code, amount] => parse_amount(amount).map(|amount| Self::ConfirmOver {
                    code: code.to_string(),
                    amount,
                }),
                _ => Err(AdminParseError::Usage("confirm_over <mã> <số tiền>")),
            },
            "confirm_none" => match args.as_slice() {
                [code] => Ok(Self::ConfirmNone {
                    code: code.to_string(),
                }),
                _ => Err(AdminParseError::Usage("confirm_none <mã>")),
            },
            "pending" if args.is_empty() => Ok(Self::Pending),
            "stock" if args.is_empty() => Ok(Self::Stock),
            _ => return None,
        };

        Some(parsed)
    }
}

fn parse_amount(raw: &str) -> Result<Vnd, AdminParseError> {
    raw.parse::<Vnd>()
        .map_err(|_| AdminParseError::InvalidAmount(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_round_trips() {
        let action = CallbackAction::Checkout {
            package: "PLUS".to_string(),
            account_type: AccountType::Shop,
        };
        assert_eq!(action.to_string(), "checkout:PLUS:shop");
        assert_eq!("checkout:PLUS:shop".parse::<CallbackAction>().unwrap(), action);
    }

    #[test]
    fn legacy_menu_ids_are_understood() {
        assert_eq!("buy".parse(), Ok(CallbackAction::BuyMenu));
        assert_eq!("free".parse(), Ok(CallbackAction::FreeMenu));
        assert_eq!("back_main".parse(), Ok(CallbackAction::MainMenu));
        assert_eq!(
            "free:edu".parse(),
            Ok(CallbackAction::FreeItem("EDU".to_string()))
        );
    }

    #[test]
    fn malformed_callbacks_are_rejected() {
        for data in ["", "pkg:", "checkout:GO", "checkout:GO:gift", "buy:now", "free:GO:x"] {
            assert!(data.parse::<CallbackAction>().is_err(), "{data}");
        }
    }

    #[test]
    fn admin_confirm_family() {
        assert_eq!(
            AdminCommand::parse("confirm PLUS-own-alice"),
            Some(Ok(AdminCommand::Confirm {
                code: "PLUS-own-alice".to_string()
            }))
        );
        assert_eq!(
            AdminCommand::parse("/confirm_under PLUS-own-alice 70.000"),
            Some(Ok(AdminCommand::ConfirmUnder {
                code: "PLUS-own-alice".to_string(),
                amount: Vnd::new(70_000),
            }))
        );
        assert_eq!(
            AdminCommand::parse("CONFIRM_OVER x 150000"),
            Some(Ok(AdminCommand::ConfirmOver {
                code: "x".to_string(),
                amount: Vnd::new(150_000),
            }))
        );
        assert_eq!(
            AdminCommand::parse("confirm_none x"),
            Some(Ok(AdminCommand::ConfirmNone {
                code: "x".to_string()
            }))
        );
    }

    #[test]
    fn admin_usage_errors() {
        assert_eq!(
            AdminCommand::parse("confirm"),
            Some(Err(AdminParseError::Usage("confirm <mã>")))
        );
        assert_eq!(
            AdminCommand::parse("confirm_under x lots"),
            Some(Err(AdminParseError::InvalidAmount("lots".to_string())))
        );
        assert_eq!(
            AdminCommand::parse("confirm_over x 1.5"),
            Some(Err(AdminParseError::InvalidAmount("1.5".to_string())))
        );
    }

    #[test]
    fn ordinary_text_is_not_admin() {
        assert_eq!(AdminCommand::parse("my email is a@b.c"), None);
        assert_eq!(AdminCommand::parse("pending order please"), None);
        assert_eq!(AdminCommand::parse(""), None);
    }
}
