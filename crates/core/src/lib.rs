//! ShopSwift Core - Shared types and pricing.
//!
//! This crate provides the types used across all ShopSwift client components:
//! - `client` - REST API client, token storage and the session manager
//! - `cli` - Command-line front end for browsing, cart, checkout and admin
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persisted state. This keeps it lightweight and allows it to be
//! used anywhere, including from tests without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, users and statuses
//! - [`pricing`] - Order total calculator (subtotal, tax, shipping, total)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{
    LineItem, OrderTotals, PricingConfig, PricingError, ShippingThreshold, calculate_totals,
};
pub use types::*;
