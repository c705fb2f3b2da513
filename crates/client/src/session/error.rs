use shopswift_core::EmailError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by [`SessionManager`](super::SessionManager) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server rejected the credentials or the registration.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The server could not be reached or answered with garbage.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Another login, registration or validation call is in flight.
    #[error("another authentication request is in progress")]
    Busy,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("admin access required")]
    Forbidden,
}
