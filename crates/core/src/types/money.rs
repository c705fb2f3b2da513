//! Monetary amounts using decimal arithmetic.
//!
//! ShopSwift prices are USD. Amounts keep full decimal precision while they
//! are being computed and are only rounded to cents when rendered, so a
//! total derived from a cart never drifts across repeated calculations.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A USD amount.
///
/// `Display` renders the amount the way the storefront shows prices:
/// a dollar sign, thousands separators and exactly two fractional digits,
/// rounding half away from zero.
///
/// ```
/// use rust_decimal::Decimal;
/// use shopswift_core::Money;
///
/// let total = Money::new(Decimal::new(142_989, 3)); // 142.989
/// assert_eq!(total.to_string(), "$142.99");
/// assert_eq!(Money::new(Decimal::new(1_234_567, 1)).to_string(), "$123,456.70");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The unrounded amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount rounded to cents, half away from zero.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.rounded();
        let digits = format!("{:.2}", rounded.abs());
        let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        if rounded.is_sign_negative() && !rounded.is_zero() {
            f.write_str("-")?;
        }
        f.write_str("$")?;
        f.write_str(&group_thousands(whole))?;
        write!(f, ".{cents}")
    }
}

/// Insert a comma between every group of three integer digits.
fn group_thousands(whole: &str) -> String {
    let len = whole.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
