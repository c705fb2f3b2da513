//! Authentication endpoints: token, registration and current user.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use shopswift_core::{Email, User};
use tracing::instrument;

use super::{ApiClient, ApiError};
use crate::session::AuthApi;

/// A bearer token together with the account it belongs to.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub token: SecretString,
    pub user: User,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: User,
}

impl From<TokenResponse> for AuthGrant {
    fn from(response: TokenResponse) -> Self {
        Self {
            token: SecretString::from(response.access_token),
            user: response.user,
        }
    }
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

impl ApiClient {
    /// Exchange credentials for a bearer token.
    ///
    /// The token endpoint takes an OAuth2 password form; `username` is the
    /// account email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, or a transport
    /// error.
    #[instrument(skip(self, password))]
    pub async fn request_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AuthGrant, ApiError> {
        let url = self.url("/auth/token")?;
        let form = [
            ("username", username),
            ("password", password.expose_secret()),
        ];
        let response: TokenResponse = self
            .send(self.request(Method::POST, url).form(&form))
            .await?;
        Ok(response.into())
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the server's reason (e.g. the email is
    /// already registered), or a transport error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register_account(
        &self,
        email: &Email,
        password: &SecretString,
        full_name: Option<&str>,
    ) -> Result<AuthGrant, ApiError> {
        let url = self.url("/auth/register")?;
        let body = RegisterBody {
            email: email.as_str(),
            password: password.expose_secret(),
            full_name: full_name.map(str::trim).filter(|n| !n.is_empty()),
        };
        let response: TokenResponse = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(response.into())
    }

    /// Fetch the account a token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` when the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn fetch_current_user(&self, token: &SecretString) -> Result<User, ApiError> {
        let url = self.url("/auth/me")?;
        self.authorized(token)
            .send(Method::GET, url)
            .await
    }
}

impl AuthApi for ApiClient {
    async fn login(&self, username: &str, password: &SecretString) -> Result<AuthGrant, ApiError> {
        self.request_token(username, password).await
    }

    async fn register(
        &self,
        email: &Email,
        password: &SecretString,
        full_name: Option<&str>,
    ) -> Result<AuthGrant, ApiError> {
        self.register_account(email, password, full_name).await
    }

    async fn current_user(&self, token: &SecretString) -> Result<User, ApiError> {
        self.fetch_current_user(token).await
    }
}
