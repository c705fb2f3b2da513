//! Authenticated user record.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The user record returned by the authentication endpoints.
///
/// `email` is kept as the server sent it. Accounts created by admin tooling
/// may not pass the stricter client-side [`Email`](super::Email) check, and
/// re-validating them here would lock those users out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl User {
    /// Name to greet the user with: full name when set, otherwise the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}
