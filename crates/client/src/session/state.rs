//! Observable session state.

use secrecy::SecretString;
use shopswift_core::User;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No token, no user.
    #[default]
    Anonymous,
    /// A token is present but not yet validated, or a credential call is in
    /// flight.
    Authenticating,
    /// Token and user, validated against the server.
    Authenticated,
    /// The token failed validation. Published once, then cleared to
    /// `Anonymous`.
    Invalid,
}

/// A snapshot of the session.
///
/// `user` is only ever present together with a token; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<SecretString>,
    user: Option<User>,
    state: SessionState,
    is_loading: bool,
    epoch: u64,
}

impl Session {
    /// A token read back from storage, pending validation.
    pub(crate) fn restored(token: SecretString) -> Self {
        Self {
            token: Some(token),
            user: None,
            state: SessionState::Authenticating,
            is_loading: false,
            epoch: 0,
        }
    }

    pub(crate) const fn authenticated(token: SecretString, user: User, epoch: u64) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            state: SessionState::Authenticated,
            is_loading: false,
            epoch,
        }
    }

    pub(crate) const fn anonymous(epoch: u64, is_loading: bool) -> Self {
        Self {
            token: None,
            user: None,
            state: SessionState::Anonymous,
            is_loading,
            epoch,
        }
    }

    pub(crate) const fn next_epoch(&self) -> u64 {
        self.epoch.wrapping_add(1)
    }

    pub(crate) const fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    pub(crate) const fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// True while a login, registration or validation call is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether a token is held, validated or not.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Token and user present and the last validation succeeded.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
            && self.user.is_some()
            && matches!(self.state, SessionState::Authenticated)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    /// The token to send with authenticated requests.
    #[must_use]
    pub fn bearer_token(&self) -> Option<SecretString> {
        if self.is_authenticated() {
            self.token.clone()
        } else {
            None
        }
    }

    /// Counter bumped every time the session is replaced (login, logout,
    /// validation outcome). Used to spot results that arrive too late.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use shopswift_core::UserId;

    use super::*;

    fn user(is_admin: bool) -> User {
        User {
            id: UserId::new(1),
            email: "ada@example.com".to_owned(),
            full_name: None,
            is_admin,
            is_active: true,
        }
    }

    #[test]
    fn test_default_is_anonymous() {
        let session = Session::default();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.is_authenticated());
        assert!(!session.has_token());
        assert!(session.bearer_token().is_none());
    }

    #[test]
    fn test_restored_token_is_not_authenticated() {
        let session = Session::restored(SecretString::from("abc"));
        assert_eq!(session.state(), SessionState::Authenticating);
        assert!(session.has_token());
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
        assert!(session.bearer_token().is_none());
    }

    #[test]
    fn test_authenticated() {
        let session = Session::authenticated(SecretString::from("abc"), user(true), 3);
        assert!(session.is_authenticated());
        assert!(session.is_admin());
        assert!(session.bearer_token().is_some());
        assert_eq!(session.next_epoch(), 4);
    }

    #[test]
    fn test_invalid_state_is_not_authenticated() {
        let mut session = Session::authenticated(SecretString::from("abc"), user(false), 0);
        session.set_state(SessionState::Invalid);
        assert!(!session.is_authenticated());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::restored(SecretString::from("super-secret-token"));
        assert!(!format!("{session:?}").contains("super-secret-token"));
    }
}
