//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `SHOPSWIFT_API_URL` - REST API base URL (default: `http://localhost:8000/api`)
//! - `SHOPSWIFT_ASSET_URL` - Origin that serves uploaded images (default: `http://127.0.0.1:8000`)
//! - `SHOPSWIFT_TOKEN_FILE` - File holding the persisted session token (default: `.shopswift/session.json`)
//! - `SHOPSWIFT_TIMEOUT_SECS` - HTTP request timeout in seconds (default: 10)
//! - `SHOPSWIFT_TAX_RATE` - Sales tax rate as a fraction (default: 0.10)
//! - `SHOPSWIFT_FREE_SHIPPING_THRESHOLD` - Subtotal above which shipping is free (default: 50.00)
//! - `SHOPSWIFT_FLAT_SHIPPING_FEE` - Shipping fee below the threshold (default: 10.00)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use shopswift_core::PricingConfig;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_ASSET_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TOKEN_FILE: &str = ".shopswift/session.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// ShopSwift client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash
    pub api_url: Url,
    /// Origin prepended to relative image paths
    pub asset_url: Url,
    /// Where the session token is persisted between runs
    pub token_file: PathBuf,
    /// Per-request timeout
    pub timeout: Duration,
    /// Tax and shipping rules for checkout totals
    pub pricing: PricingConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but cannot
    /// be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let api_url = parse_base_url("SHOPSWIFT_API_URL", &get("SHOPSWIFT_API_URL", DEFAULT_API_URL))?;
        let asset_url = parse_base_url(
            "SHOPSWIFT_ASSET_URL",
            &get("SHOPSWIFT_ASSET_URL", DEFAULT_ASSET_URL),
        )?;
        let token_file = PathBuf::from(get("SHOPSWIFT_TOKEN_FILE", DEFAULT_TOKEN_FILE));
        let timeout_secs: u64 = parse_var(
            "SHOPSWIFT_TIMEOUT_SECS",
            &get("SHOPSWIFT_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string()),
        )?;

        let defaults = PricingConfig::checkout();
        let tax_rate = parse_amount(&lookup, "SHOPSWIFT_TAX_RATE", defaults.tax_rate)?;
        let threshold = parse_amount(
            &lookup,
            "SHOPSWIFT_FREE_SHIPPING_THRESHOLD",
            defaults.free_shipping_threshold,
        )?;
        let flat_fee = parse_amount(
            &lookup,
            "SHOPSWIFT_FLAT_SHIPPING_FEE",
            defaults.flat_shipping_fee,
        )?;

        Ok(Self {
            api_url,
            asset_url,
            token_file,
            timeout: Duration::from_secs(timeout_secs),
            pricing: defaults
                .with_tax_rate(tax_rate)
                .with_shipping(threshold, flat_fee),
        })
    }

    /// Pricing rules for the cart view (same tax, no shipping).
    #[must_use]
    pub const fn cart_pricing(&self) -> PricingConfig {
        self.pricing.with_include_shipping(false)
    }

    /// Pricing rules for the checkout view.
    #[must_use]
    pub const fn checkout_pricing(&self) -> PricingConfig {
        self.pricing.with_include_shipping(true)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a URL and strip any trailing slash so paths can be appended.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim_end_matches('/'))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_owned(),
            "must be an absolute http(s) URL".to_owned(),
        ));
    }
    Ok(url)
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
}

/// Parse an optional non-negative decimal.
fn parse_amount(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value: Decimal = parse_var(key, &raw)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_owned(),
            "must not be negative".to_owned(),
        ));
    }
    Ok(value)
}
