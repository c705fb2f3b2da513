//! ShopSwift REST API client.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies everywhere except the OAuth2-style
//!   token endpoint, which takes a form
//! - The server is the source of truth; nothing is stored locally except the
//!   session token (see [`crate::storage`])
//! - Catalog reads are cached in memory via `moka` (5 minute TTL); admin
//!   mutations invalidate the cache
//!
//! # Endpoints
//!
//! - [`auth`] - token, registration, current user
//! - [`catalog`] - products, categories, reviews
//! - [`cart`] - the signed-in user's cart
//! - [`orders`] - order history and order placement
//! - [`admin`] - product, category and order management
//!
//! Endpoints that need a signed-in user live on [`Authorized`], obtained
//! from [`ApiClient::authorized`] with the session's bearer token.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopswift_client::api::{ApiClient, ProductQuery};
//!
//! let client = ApiClient::new(&config)?;
//! let page = client.products(&ProductQuery::default().search("lamp")).await?;
//!
//! let token = session.bearer_token().ok_or(SessionError::NotAuthenticated)?;
//! let cart = client.authorized(&token).add_to_cart(page.data[0].id, 1).await?;
//! ```

pub mod admin;
pub mod auth;
mod cache;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod types;

pub use auth::AuthGrant;
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use cache::{CacheKey, CacheValue};

/// Errors that can occur when talking to the ShopSwift API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 401 - missing, invalid or expired credentials.
    #[error("unauthorized{}", fmt_detail(.0.as_deref()))]
    Unauthorized(Option<String>),

    /// 403 - signed in but not allowed (e.g. admin endpoints).
    #[error("forbidden{}", fmt_detail(.0.as_deref()))]
    Forbidden(Option<String>),

    /// 404 - the resource does not exist.
    #[error("not found{}", fmt_detail(.0.as_deref()))]
    NotFound(Option<String>),

    /// Any other non-success status.
    #[error("API error: HTTP {status}{}", fmt_detail(.detail.as_deref()))]
    Status { status: u16, detail: Option<String> },

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Input rejected before it was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

fn fmt_detail(detail: Option<&str>) -> String {
    detail.map(|d| format!(": {d}")).unwrap_or_default()
}

impl ApiError {
    /// Build an error from a non-success response.
    fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body);
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(detail),
            StatusCode::FORBIDDEN => Self::Forbidden(detail),
            StatusCode::NOT_FOUND => Self::NotFound(detail),
            _ => Self::Status {
                status: status.as_u16(),
                detail,
            },
        }
    }

    /// The server-provided `detail` message, if the server sent one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(detail) | Self::Forbidden(detail) | Self::NotFound(detail) => {
                detail.as_deref()
            }
            Self::Status { detail, .. } => detail.as_deref(),
            Self::InvalidInput(message) => Some(message),
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => None,
        }
    }

    /// Whether the server could not be reached or did not answer.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// HTTP status of the response, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::InvalidUrl(_) | Self::InvalidInput(_) => None,
        }
    }
}

/// Pull the `detail` message out of a FastAPI-style error body.
///
/// `detail` is either a string or, for request validation failures, a list
/// of `{loc, msg, type}` objects whose messages are joined.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(message) => Some(message.clone()),
        serde_json::Value::Array(errors) => {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the ShopSwift REST API.
///
/// Cheap to clone; clones share the connection pool and the catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    asset_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("shopswift-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_owned(),
                asset_url: config.asset_url.as_str().trim_end_matches('/').to_owned(),
                cache,
            }),
        })
    }

    /// Scope the client to a signed-in user.
    #[must_use]
    pub const fn authorized<'a>(&'a self, token: &'a SecretString) -> Authorized<'a> {
        Authorized {
            client: self,
            token,
        }
    }

    /// Resolve a product image path to an absolute URL.
    ///
    /// Absolute `http(s)` URLs are returned unchanged, relative paths are
    /// served from the asset origin, and empty paths have no image.
    #[must_use]
    pub fn image_url(&self, path: Option<&str>) -> Option<String> {
        let path = path.map(str::trim).filter(|p| !p.is_empty())?;
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_owned());
        }
        let separator = if path.starts_with('/') { "" } else { "/" };
        Some(format!("{}{separator}{path}", self.inner.asset_url))
    }

    /// Build an endpoint URL from a path relative to the API base.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{path}", self.inner.base_url))?)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.inner.client.request(method, url)
    }

    /// Send a request and decode a JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_owned();

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                path = %url,
                body = %body.chars().take(500).collect::<String>(),
                "ShopSwift API returned non-success status"
            );
            return Err(ApiError::from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %url,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse ShopSwift API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        tracing::debug!("Catalog cache invalidated");
    }
}

/// Endpoints that require a bearer token.
///
/// Borrowed from [`ApiClient::authorized`]; holds no state of its own.
#[derive(Clone, Copy)]
pub struct Authorized<'a> {
    client: &'a ApiClient,
    token: &'a SecretString,
}

impl Authorized<'_> {
    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> Result<T, ApiError> {
        self.client.send(self.request(method, url)).await
    }

    async fn send_json<T, B>(&self, method: reqwest::Method, url: Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.client
            .send(self.request(method, url).json(body))
            .await
    }
}
