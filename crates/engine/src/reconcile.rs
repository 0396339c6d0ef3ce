use serde::{Deserialize, Serialize};

use crate::Vnd;

/// How a reported amount compares to the expected price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "difference", rename_all = "snake_case")]
pub enum Classification {
    Exact,
    /// Paid more than expected; carries the overage.
    Over(Vnd),
    /// Paid less than expected; carries the shortfall.
    Under(Vnd),
}

impl Classification {
    /// Whether the order is fulfilled for this payment.
    pub const fn fulfils(self) -> bool {
        !matches!(self, Self::Under(_))
    }
}

pub fn classify(expected: Vnd, amount: Vnd) -> Classification {
    if let Some(overage) = amount.checked_sub(expected) {
        if overage == Vnd::ZERO {
            Classification::Exact
        } else {
            Classification::Over(overage)
        }
    } else {
        Classification::Under(expected.checked_sub(amount).unwrap_or(expected))
    }
}
