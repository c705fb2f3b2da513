//! Command implementations.
//!
//! Each command prints human-readable output to stdout through the
//! renderers in [`output`]; logs and prompts go to stderr.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod output;

use std::io::Write;

use secrecy::SecretString;
use shopswift_client::api::ApiClient;
use shopswift_client::{
    ApiError, ClientConfig, ClientSession, ConfigError, FileStore, Notice, SessionError,
    SessionManager,
};
use shopswift_core::{PricingError, User};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not signed in. Run `swift login` first.")]
    NotSignedIn,
}

/// Everything a command needs: configuration, the API client and the
/// session manager over the token file.
pub struct Context {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub session: ClientSession,
}

impl Context {
    /// Build the context from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration or if the HTTP client
    /// cannot be built.
    pub fn from_env() -> Result<Self, CommandError> {
        let config = ClientConfig::from_env()?;
        let api = ApiClient::new(&config)?;
        let store = FileStore::new(&config.token_file);
        let session = SessionManager::create(api.clone(), store);
        tracing::debug!(api_url = %config.api_url, token_file = %config.token_file.display(), "Loaded configuration");
        Ok(Self {
            config,
            api,
            session,
        })
    }

    /// Validate the persisted session and return its token.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::NotSignedIn` if there is no valid session.
    pub async fn signed_in(&self) -> Result<SecretString, CommandError> {
        if !self.session.check_auth().await {
            return Err(CommandError::NotSignedIn);
        }
        self.session.bearer_token().ok_or(CommandError::NotSignedIn)
    }

    /// Validate the persisted session and require an admin account.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::NotSignedIn` without a valid session and
    /// `SessionError::Forbidden` for a regular account.
    pub async fn admin(&self) -> Result<(SecretString, User), CommandError> {
        let token = self.signed_in().await?;
        let user = self.session.require_admin()?;
        Ok((token, user))
    }
}

/// Print every notice received so far.
pub fn flush_notices(
    notices: &mut broadcast::Receiver<Notice>,
    out: &mut impl Write,
) -> std::io::Result<()> {
    while let Ok(notice) = notices.try_recv() {
        output::notice(out, &notice)?;
    }
    Ok(())
}
