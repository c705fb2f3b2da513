//! Order total calculation.
//!
//! A pure mapping from cart line items and a [`PricingConfig`] to an
//! [`OrderTotals`] breakdown. The cart and checkout views use the same
//! calculator with different configurations: the cart leaves shipping out,
//! checkout adds it.
//!
//! All arithmetic is done on [`Decimal`] at full precision. Nothing is
//! rounded here; [`Money`]'s `Display` rounds to cents when a total is shown.
//!
//! ```
//! use rust_decimal::Decimal;
//! use shopswift_core::pricing::{LineItem, PricingConfig, calculate_totals};
//!
//! let items = [
//!     LineItem::new(Decimal::new(4999, 2), 2),
//!     LineItem::new(Decimal::new(3001, 2), 1),
//! ];
//! let totals = calculate_totals(&items, &PricingConfig::checkout()).unwrap();
//!
//! assert_eq!(totals.subtotal.amount(), Decimal::new(12999, 2));
//! assert!(totals.shipping.is_zero());
//! assert_eq!(totals.total.amount(), Decimal::new(142_989, 3));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Money;

/// Default sales tax rate (10%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Default subtotal above which shipping is free ($50.00).
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Default flat shipping fee ($10.00).
pub const DEFAULT_FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Errors returned by [`calculate_totals`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// A line item violates its preconditions.
    #[error("invalid line item at index {index}: {problem}")]
    InvalidLineItem {
        /// Position of the offending item in the input.
        index: usize,
        /// What is wrong with it.
        problem: LineItemProblem,
    },

    /// A configuration value is negative.
    #[error("invalid pricing configuration: {field} must not be negative (got {value})")]
    InvalidConfig {
        /// Name of the configuration field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// An intermediate amount does not fit in a `Decimal`.
    #[error("order total overflowed")]
    Overflow,
}

/// Why a line item was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LineItemProblem {
    #[error("unit price {0} is negative")]
    NegativePrice(Decimal),
    #[error("quantity {0} must be at least 1")]
    NonPositiveQuantity(i64),
}

/// One product entry in a cart: a unit price and a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub unit_price: Decimal,
    pub quantity: i64,
}

impl LineItem {
    /// Create a line item. Validation happens in [`calculate_totals`].
    #[must_use]
    pub const fn new(unit_price: Decimal, quantity: i64) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    /// `unit_price × quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    fn validate(&self) -> Result<(), LineItemProblem> {
        if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            return Err(LineItemProblem::NegativePrice(self.unit_price));
        }
        if self.quantity < 1 {
            return Err(LineItemProblem::NonPositiveQuantity(self.quantity));
        }
        Ok(())
    }
}

/// How a subtotal equal to the free-shipping threshold is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingThreshold {
    /// Shipping is free only when `subtotal > threshold`.
    #[default]
    StrictlyAbove,
    /// Shipping is free when `subtotal >= threshold`.
    AtOrAbove,
}

impl ShippingThreshold {
    fn qualifies(self, subtotal: Decimal, threshold: Decimal) -> bool {
        match self {
            Self::StrictlyAbove => subtotal > threshold,
            Self::AtOrAbove => subtotal >= threshold,
        }
    }
}

/// Tax and shipping rules applied by [`calculate_totals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Fraction of the subtotal charged as tax (`0.10` is 10%).
    pub tax_rate: Decimal,
    /// Subtotal above which shipping is waived.
    pub free_shipping_threshold: Decimal,
    /// Shipping fee charged when the threshold is not met.
    pub flat_shipping_fee: Decimal,
    /// Whether shipping is part of the total at all.
    pub include_shipping: bool,
    /// Boundary behavior at `subtotal == free_shipping_threshold`.
    #[serde(default)]
    pub threshold_policy: ShippingThreshold,
}

impl PricingConfig {
    /// Totals as shown in the cart: tax, no shipping.
    #[must_use]
    pub const fn cart() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD,
            flat_shipping_fee: DEFAULT_FLAT_SHIPPING_FEE,
            include_shipping: false,
            threshold_policy: ShippingThreshold::StrictlyAbove,
        }
    }

    /// Totals as shown at checkout: tax and threshold-based shipping.
    #[must_use]
    pub const fn checkout() -> Self {
        Self {
            include_shipping: true,
            ..Self::cart()
        }
    }

    /// Replace the tax rate.
    #[must_use]
    pub const fn with_tax_rate(mut self, tax_rate: Decimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Replace the shipping threshold and flat fee.
    #[must_use]
    pub const fn with_shipping(mut self, threshold: Decimal, flat_fee: Decimal) -> Self {
        self.free_shipping_threshold = threshold;
        self.flat_shipping_fee = flat_fee;
        self
    }

    /// Turn shipping on or off.
    #[must_use]
    pub const fn with_include_shipping(mut self, include_shipping: bool) -> Self {
        self.include_shipping = include_shipping;
        self
    }

    /// Replace the boundary policy.
    #[must_use]
    pub const fn with_threshold_policy(mut self, policy: ShippingThreshold) -> Self {
        self.threshold_policy = policy;
        self
    }

    fn validate(&self) -> Result<(), PricingError> {
        for (field, value) in [
            ("tax_rate", self.tax_rate),
            ("free_shipping_threshold", self.free_shipping_threshold),
            ("flat_shipping_fee", self.flat_shipping_fee),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(PricingError::InvalidConfig { field, value });
            }
        }
        Ok(())
    }

    /// Shipping charged for a given subtotal under this configuration.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if !self.include_shipping
            || self
                .threshold_policy
                .qualifies(subtotal, self.free_shipping_threshold)
        {
            Decimal::ZERO
        } else {
            self.flat_shipping_fee
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self::checkout()
    }
}

/// Breakdown of an order's cost.
///
/// Invariant: `total == subtotal + tax + shipping` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    /// Whether shipping was part of the calculation (false for cart totals).
    pub shipping_included: bool,
}

impl OrderTotals {
    /// Render the breakdown as `(label, amount)` rows for display.
    ///
    /// Amounts are rounded to cents here and nowhere else. A shipping row is
    /// present only when shipping was included, reading "Free" when waived.
    #[must_use]
    pub fn display(&self, tax_rate: Decimal) -> Vec<(String, String)> {
        let tax_label = tax_rate.checked_mul(Decimal::ONE_HUNDRED).map_or_else(
            || format!("Tax (rate {})", tax_rate.normalize()),
            |percent| format!("Tax ({}%)", percent.normalize()),
        );
        let mut rows = vec![
            ("Subtotal".to_owned(), self.subtotal.to_string()),
            (tax_label, self.tax.to_string()),
        ];
        if self.shipping_included {
            let shipping = if self.shipping.is_zero() {
                "Free".to_owned()
            } else {
                self.shipping.to_string()
            };
            rows.push(("Shipping".to_owned(), shipping));
        }
        rows.push(("Total".to_owned(), self.total.to_string()));
        rows
    }
}

/// Compute subtotal, tax, shipping and total for a list of line items.
///
/// The result depends only on the arguments: the same input always yields
/// the same output, and item order does not matter.
///
/// # Errors
///
/// - [`PricingError::InvalidConfig`] if a configuration value is negative.
/// - [`PricingError::InvalidLineItem`] for the first item with a negative
///   price or a quantity below 1.
/// - [`PricingError::Overflow`] if an amount exceeds `Decimal`'s range.
pub fn calculate_totals(
    items: &[LineItem],
    config: &PricingConfig,
) -> Result<OrderTotals, PricingError> {
    config.validate()?;

    let mut subtotal = Decimal::ZERO;
    for (index, item) in items.iter().enumerate() {
        item.validate()
            .map_err(|problem| PricingError::InvalidLineItem { index, problem })?;
        let line_total = item.line_total().ok_or(PricingError::Overflow)?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or(PricingError::Overflow)?;
    }

    let tax = subtotal
        .checked_mul(config.tax_rate)
        .ok_or(PricingError::Overflow)?;
    let shipping = config.shipping_for(subtotal);
    let total = subtotal
        .checked_add(tax)
        .and_then(|sum| sum.checked_add(shipping))
        .ok_or(PricingError::Overflow)?;

    Ok(OrderTotals {
        subtotal: Money::new(subtotal),
        tax: Money::new(tax),
        shipping: Money::new(shipping),
        total: Money::new(total),
        shipping_included: config.include_shipping,
    })
}
