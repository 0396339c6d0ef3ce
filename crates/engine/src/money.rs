use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Amount of Vietnamese đồng, in whole units.
///
/// VND has no minor unit in practice, so prices, payments and
/// over/underpayments are plain unsigned integers.
///
/// # Examples
///
/// ```rust
/// use engine::Vnd;
///
/// let price = Vnd::new(100_000);
/// assert_eq!(price.to_string(), "100,000đ");
/// assert_eq!("150.000".parse::<Vnd>().unwrap(), Vnd::new(150_000));
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Vnd(u64);

impl Vnd {
    pub const ZERO: Vnd = Vnd(0);

    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Difference `self - other`, or `None` when `other` is larger.
    #[must_use]
    pub const fn checked_sub(self, other: Vnd) -> Option<Vnd> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Vnd(v)),
            None => None,
        }
    }
}

impl fmt::Display for Vnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out.push('đ');
        f.write_str(&out)
    }
}

impl FromStr for Vnd {
    type Err = EngineError;

    /// Accepts `150000`, `150,000`, `150.000`, optionally followed by `đ`,
    /// `d` or `vnd`. A separator must split the number into groups of
    /// three digits and only one separator kind may appear.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || EngineError::InvalidAmount(format!("\"{trimmed}\""));
        let lowered = trimmed.to_lowercase();
        let number = lowered
            .strip_suffix("vnd")
            .or_else(|| lowered.strip_suffix('đ'))
            .or_else(|| lowered.strip_suffix('d'))
            .unwrap_or(&lowered)
            .trim();

        let mut others = number.chars().filter(|ch| !ch.is_ascii_digit());
        let digits = match others.next() {
            None => number.to_string(),
            Some(sep @ (',' | '.' | '_' | ' ')) => {
                if others.any(|ch| ch != sep) {
                    return Err(invalid());
                }
                let mut groups = number.split(sep);
                let head = groups.next().unwrap_or_default();
                if head.is_empty() || head.len() > 3 || groups.any(|g| g.len() != 3) {
                    return Err(invalid());
                }
                number.replace(sep, "")
            }
            Some(_) => return Err(invalid()),
        };

        if digits.is_empty() {
            return Err(invalid());
        }
        digits.parse::<u64>().map(Vnd).map_err(|_| invalid())
    }
}
