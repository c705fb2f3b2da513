//! Session management: who is signed in.
//!
//! [`SessionManager`] is the single authority over the session. It owns the
//! durable token store, talks to the authentication endpoints through the
//! [`AuthApi`] port, and publishes every state change on a
//! `tokio::sync::watch` channel. User-facing messages go out separately on a
//! `tokio::sync::broadcast` channel of [`Notice`]s.
//!
//! # States
//!
//! ```text
//!                 login / register ok
//!   Anonymous ──────────────────────────► Authenticated
//!      ▲  │                                   │   ▲
//!      │  └──── token on disk ──► Authenticating ─┘ check_auth ok
//!      │                               │
//!      └────── Invalid ◄── check_auth failed
//! ```
//!
//! `logout` goes to `Anonymous` from anywhere. A failed login or
//! registration leaves the previous state in place.
//!
//! # Concurrency
//!
//! One credential or validation call runs at a time; a second one while
//! `is_loading` is set fails with [`SessionError::Busy`]. Each state change
//! bumps the session epoch, and a validation result whose epoch no longer
//! matches is dropped.

mod error;
mod notice;
mod state;

pub use error::SessionError;
pub use notice::{Notice, NoticeLevel};
pub use state::{Session, SessionState};

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use shopswift_core::{Email, User};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{ApiError, AuthGrant};
use crate::storage::{KeyValueStore, TOKEN_KEY};

const NOTICE_CAPACITY: usize = 32;

const LOGIN_FALLBACK: &str = "Invalid email or password";
const REGISTER_FALLBACK: &str = "Registration failed";

/// The authentication endpoints the session manager depends on.
///
/// Implemented by [`ApiClient`](crate::api::ApiClient); tests substitute
/// in-memory fakes.
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token.
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send;

    /// Create an account and sign it in.
    fn register(
        &self,
        email: &Email,
        password: &SecretString,
        full_name: Option<&str>,
    ) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send;

    /// Look up the account a token belongs to.
    fn current_user(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;
}

impl<T: AuthApi + ?Sized> AuthApi for Arc<T> {
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send {
        (**self).login(username, password)
    }

    fn register(
        &self,
        email: &Email,
        password: &SecretString,
        full_name: Option<&str>,
    ) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send {
        (**self).register(email, password, full_name)
    }

    fn current_user(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<User, ApiError>> + Send {
        (**self).current_user(token)
    }
}

/// Handle to the session. Cheap to clone; clones share one session.
pub struct SessionManager<A, S> {
    inner: Arc<Inner<A, S>>,
}

struct Inner<A, S> {
    api: A,
    store: S,
    state: watch::Sender<Session>,
    notices: broadcast::Sender<Notice>,
}

impl<A, S> Clone for SessionManager<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AuthApi, S: KeyValueStore> SessionManager<A, S> {
    /// Build a manager over `store`, restoring any persisted token.
    ///
    /// A restored token starts in `Authenticating`; call
    /// [`check_auth`](Self::check_auth) to validate it.
    pub fn create(api: A, store: S) -> Self {
        let session = match store.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                debug!("Restored persisted session token");
                Session::restored(SecretString::from(token))
            }
            Ok(_) => Session::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session token");
                Session::default()
            }
        };

        let (state, _) = watch::channel(session);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                api,
                store,
                state,
                notices,
            }),
        }
    }

    /// Drop this handle and, if it was the last one, the in-memory session.
    ///
    /// Closes the state and notice channels and hands back the store, whose
    /// persisted token is left as it is. Returns `None` while other clones
    /// are still alive.
    #[must_use]
    pub fn teardown(self) -> Option<S> {
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => {
                debug!("Session manager torn down");
                Some(inner.store)
            }
            Err(_) => None,
        }
    }

    /// The current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Follow session changes, including `is_loading` flips.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Follow user-facing notices. Only notices sent after this call are
    /// received.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    /// Token for authenticated API calls, when signed in.
    #[must_use]
    pub fn bearer_token(&self) -> Option<SecretString> {
        self.inner.state.borrow().bearer_token()
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAuthenticated` when nobody is signed in.
    pub fn require_user(&self) -> Result<User, SessionError> {
        let session = self.inner.state.borrow();
        if !session.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        session.user().cloned().ok_or(SessionError::NotAuthenticated)
    }

    /// The signed-in user, who must be an admin.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAuthenticated` when nobody is signed in and
    /// `SessionError::Forbidden` for a regular account.
    pub fn require_admin(&self) -> Result<User, SessionError> {
        let user = self.require_user()?;
        if !user.is_admin {
            return Err(SessionError::Forbidden);
        }
        Ok(user)
    }

    /// Sign in with an email and password.
    ///
    /// # Errors
    ///
    /// - `SessionError::Busy` if another authentication call is in flight
    /// - `SessionError::InvalidCredentials` with the server's reason
    /// - `SessionError::NetworkFailure` if the server could not be reached
    /// - `SessionError::Storage` if the token could not be persisted
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<User, SessionError> {
        let _in_flight = self.begin()?;

        match self.inner.api.login(username.trim(), password).await {
            Ok(grant) => {
                let message = if grant.user.is_admin {
                    "Welcome back, Admin!"
                } else {
                    "Login successful!"
                };
                self.establish(grant, message)
            }
            Err(e) => Err(self.reject(&e, LOGIN_FALLBACK)),
        }
    }

    /// Create an account and sign it in.
    ///
    /// The email is checked locally first; a malformed address fails
    /// without a request.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login), plus `SessionError::InvalidEmail`.
    #[instrument(skip(self, password, full_name))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
        full_name: Option<&str>,
    ) -> Result<User, SessionError> {
        let email = Email::parse(email).inspect_err(|e| {
            self.notify(Notice::error(e.to_string()));
        })?;

        let _in_flight = self.begin()?;

        match self.inner.api.register(&email, password, full_name).await {
            Ok(grant) => self.establish(grant, "Registration successful!"),
            Err(e) => Err(self.reject(&e, REGISTER_FALLBACK)),
        }
    }

    /// Sign out. Clears the persisted token; never fails and makes no
    /// request.
    pub fn logout(&self) {
        self.inner.state.send_modify(|session| {
            if let Err(e) = self.inner.store.remove(TOKEN_KEY) {
                warn!(error = %e, "Failed to clear persisted session token");
            }
            *session = Session::anonymous(session.next_epoch(), session.is_loading());
        });
        info!("Signed out");
        self.notify(Notice::info("Logged out successfully"));
    }

    /// Validate the persisted token against the server.
    ///
    /// Without a token the session becomes `Anonymous`. A rejected token, or
    /// one that cannot be checked because the server is unreachable, is
    /// cleared. Returns whether the session is authenticated afterwards.
    /// While another authentication call is in flight this returns the
    /// current answer without a request.
    #[instrument(skip(self))]
    pub async fn check_auth(&self) -> bool {
        let Ok(in_flight) = self.begin() else {
            debug!("Authentication call in flight, skipping validation");
            return self.snapshot().is_authenticated();
        };
        let epoch = in_flight.epoch;

        let token = match self.inner.store.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => SecretString::from(token),
            Ok(_) => {
                self.clear(epoch);
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session token");
                self.invalidate(epoch);
                return false;
            }
        };

        match self.inner.api.current_user(&token).await {
            Ok(user) => {
                let applied = self.inner.state.send_if_modified(|session| {
                    if session.epoch() != epoch {
                        return false;
                    }
                    *session = Session::authenticated(token, user, session.next_epoch());
                    true
                });
                if !applied {
                    debug!("Session changed during validation, discarding result");
                }
            }
            Err(e) => {
                if e.is_network() {
                    warn!(error = %e, "Could not validate session token, signing out");
                } else {
                    info!(error = %e, "Session token rejected, signing out");
                }
                self.invalidate(epoch);
            }
        }

        self.snapshot().is_authenticated()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Mark a call in flight, or fail with `Busy`.
    fn begin(&self) -> Result<InFlight<'_>, SessionError> {
        let mut started = None;
        self.inner.state.send_if_modified(|session| {
            if session.is_loading() {
                return false;
            }
            started = Some((session.state(), session.epoch()));
            session.set_loading(true);
            if session.state() == SessionState::Anonymous {
                session.set_state(SessionState::Authenticating);
            }
            true
        });

        let (previous, epoch) = started.ok_or(SessionError::Busy)?;
        Ok(InFlight {
            state: &self.inner.state,
            previous,
            epoch,
        })
    }

    /// Persist a granted token and publish the authenticated session.
    fn establish(&self, grant: AuthGrant, message: &str) -> Result<User, SessionError> {
        let AuthGrant { token, user } = grant;

        let mut stored = Ok(());
        self.inner.state.send_if_modified(|session| {
            stored = self.inner.store.set(TOKEN_KEY, token.expose_secret());
            if stored.is_err() {
                return false;
            }
            *session = Session::authenticated(token, user.clone(), session.next_epoch());
            true
        });

        if let Err(e) = stored {
            error!(error = %e, "Failed to persist session token");
            self.notify(Notice::error("Could not save your session"));
            return Err(e.into());
        }

        info!(user_id = %user.id, is_admin = user.is_admin, "Signed in");
        self.notify(Notice::success(message));
        Ok(user)
    }

    /// Turn a failed credential call into a session error and tell the user.
    fn reject(&self, error: &ApiError, fallback: &str) -> SessionError {
        let message = error.detail().unwrap_or(fallback).to_owned();
        self.notify(Notice::error(message.clone()));

        let unreachable = matches!(
            error,
            ApiError::Http(_) | ApiError::Parse(_) | ApiError::InvalidUrl(_)
        ) || error.status().is_some_and(|status| status >= 500);

        if unreachable {
            warn!(error = %error, "Authentication request failed");
            SessionError::NetworkFailure(error.to_string())
        } else {
            info!(error = %error, "Credentials rejected");
            SessionError::InvalidCredentials(message)
        }
    }

    /// No persisted token: settle on `Anonymous`.
    fn clear(&self, epoch: u64) {
        self.inner.state.send_if_modified(|session| {
            if session.epoch() != epoch {
                return false;
            }
            *session = Session::anonymous(session.next_epoch(), session.is_loading());
            true
        });
    }

    /// Publish `Invalid`, then drop the token from memory and storage.
    fn invalidate(&self, epoch: u64) {
        let flagged = self.inner.state.send_if_modified(|session| {
            if session.epoch() != epoch {
                return false;
            }
            session.set_state(SessionState::Invalid);
            true
        });
        if !flagged {
            debug!("Session changed during validation, keeping it");
            return;
        }

        self.inner.state.send_if_modified(|session| {
            if session.epoch() != epoch {
                return false;
            }
            if let Err(e) = self.inner.store.remove(TOKEN_KEY) {
                warn!(error = %e, "Failed to clear persisted session token");
            }
            *session = Session::anonymous(session.next_epoch(), session.is_loading());
            true
        });
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine
        let _ = self.inner.notices.send(notice);
    }
}

/// Marks a call in flight. Dropping it clears `is_loading` and, if nothing
/// replaced the session meanwhile, restores the state from before the call.
struct InFlight<'a> {
    state: &'a watch::Sender<Session>,
    previous: SessionState,
    epoch: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|session| {
            if !session.is_loading() {
                return false;
            }
            session.set_loading(false);
            if session.epoch() == self.epoch {
                session.set_state(self.previous);
            }
            true
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use shopswift_core::UserId;
    use tokio::sync::Notify;

    use super::*;
    use crate::storage::{FileStore, MemoryStore};

    const PASSWORD: &str = "correct horse";
    const VALID_TOKEN: &str = "token-ada";

    fn ada(is_admin: bool) -> User {
        User {
            id: UserId::new(1),
            email: "ada@example.com".to_owned(),
            full_name: Some("Ada".to_owned()),
            is_admin,
            is_active: true,
        }
    }

    #[derive(Default)]
    struct FakeApi {
        is_admin: bool,
        offline: AtomicBool,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl FakeApi {
        fn gated(gate: &Arc<Notify>) -> Self {
            Self {
                gate: Some(Arc::clone(gate)),
                ..Self::default()
            }
        }

        async fn enter(&self) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.offline.load(Ordering::SeqCst) {
                return Err(ApiError::InvalidUrl(url::ParseError::EmptyHost));
            }
            Ok(())
        }

        fn grant(&self) -> AuthGrant {
            AuthGrant {
                token: SecretString::from(VALID_TOKEN),
                user: ada(self.is_admin),
            }
        }
    }

    impl AuthApi for FakeApi {
        async fn login(
            &self,
            username: &str,
            password: &SecretString,
        ) -> Result<AuthGrant, ApiError> {
            self.enter().await?;
            if username == "ada@example.com" && password.expose_secret() == PASSWORD {
                Ok(self.grant())
            } else {
                Err(ApiError::Unauthorized(Some(
                    "Incorrect email or password".to_owned(),
                )))
            }
        }

        async fn register(
            &self,
            email: &Email,
            _password: &SecretString,
            _full_name: Option<&str>,
        ) -> Result<AuthGrant, ApiError> {
            self.enter().await?;
            if email.as_str() == "ada@example.com" {
                Err(ApiError::Status {
                    status: 400,
                    detail: Some("Email already registered".to_owned()),
                })
            } else {
                Ok(self.grant())
            }
        }

        async fn current_user(&self, token: &SecretString) -> Result<User, ApiError> {
            self.enter().await?;
            if token.expose_secret() == VALID_TOKEN {
                Ok(ada(self.is_admin))
            } else {
                Err(ApiError::Unauthorized(Some(
                    "Could not validate credentials".to_owned(),
                )))
            }
        }
    }

    type Manager = SessionManager<Arc<FakeApi>, Arc<MemoryStore>>;

    fn manager(api: FakeApi, store: MemoryStore) -> (Manager, Arc<FakeApi>, Arc<MemoryStore>) {
        let api = Arc::new(api);
        let store = Arc::new(store);
        let manager = SessionManager::create(Arc::clone(&api), Arc::clone(&store));
        (manager, api, store)
    }

    fn password(value: &str) -> SecretString {
        SecretString::from(value)
    }

    fn stored_token(store: &MemoryStore) -> Option<String> {
        store.get(TOKEN_KEY).unwrap()
    }

    #[tokio::test]
    async fn test_login_success() {
        let (manager, _, store) = manager(FakeApi::default(), MemoryStore::new());
        let mut notices = manager.notices();

        let user = manager
            .login(" ada@example.com ", &password(PASSWORD))
            .await
            .unwrap();

        assert_eq!(user.id, UserId::new(1));
        let session = manager.snapshot();
        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(stored_token(&store).as_deref(), Some(VALID_TOKEN));
        assert_eq!(
            manager.bearer_token().unwrap().expose_secret(),
            VALID_TOKEN
        );

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice, Notice::success("Login successful!"));
    }

    #[tokio::test]
    async fn test_admin_login_greeting() {
        let api = FakeApi {
            is_admin: true,
            ..FakeApi::default()
        };
        let (manager, _, _) = manager(api, MemoryStore::new());
        let mut notices = manager.notices();

        manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap();

        assert_eq!(notices.recv().await.unwrap().message, "Welcome back, Admin!");
        assert!(manager.require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_login_rejected_leaves_state_unchanged() {
        let (manager, _, store) = manager(FakeApi::default(), MemoryStore::new());
        let mut notices = manager.notices();

        let err = manager
            .login("ada@example.com", &password("wrong"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, SessionError::InvalidCredentials(ref m) if m == "Incorrect email or password")
        );
        let session = manager.snapshot();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
        assert_eq!(stored_token(&store), None);

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Incorrect email or password");
    }

    #[tokio::test]
    async fn test_failed_relogin_keeps_existing_session() {
        let (manager, _, store) = manager(FakeApi::default(), MemoryStore::new());
        manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap();

        assert!(
            manager
                .login("ada@example.com", &password("wrong"))
                .await
                .is_err()
        );

        assert!(manager.snapshot().is_authenticated());
        assert_eq!(stored_token(&store).as_deref(), Some(VALID_TOKEN));
    }

    #[tokio::test]
    async fn test_login_offline_is_network_failure() {
        let api = FakeApi::default();
        api.offline.store(true, Ordering::SeqCst);
        let (manager, _, _) = manager(api, MemoryStore::new());
        let mut notices = manager.notices();

        let err = manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::NetworkFailure(_)));
        assert_eq!(notices.recv().await.unwrap().message, LOGIN_FALLBACK);
        assert_eq!(manager.snapshot().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_register_success() {
        let (manager, _, store) = manager(FakeApi::default(), MemoryStore::new());
        let mut notices = manager.notices();

        manager
            .register("grace@example.com", &password(PASSWORD), Some("Grace"))
            .await
            .unwrap();

        assert!(manager.snapshot().is_authenticated());
        assert!(stored_token(&store).is_some());
        assert_eq!(
            notices.recv().await.unwrap(),
            Notice::success("Registration successful!")
        );
    }

    #[tokio::test]
    async fn test_register_rejected_uses_server_detail() {
        let (manager, _, _) = manager(FakeApi::default(), MemoryStore::new());

        let err = manager
            .register("ada@example.com", &password(PASSWORD), None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Email already registered");
        assert!(!manager.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn test_register_invalid_email_makes_no_request() {
        let (manager, api, _) = manager(FakeApi::default(), MemoryStore::new());
        let mut notices = manager.notices();

        let err = manager
            .register("not-an-email", &password(PASSWORD), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::InvalidEmail(_)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(notices.recv().await.unwrap().level, NoticeLevel::Error);
        assert!(!manager.snapshot().is_loading());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (manager, api, store) = manager(FakeApi::default(), MemoryStore::new());
        manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap();
        let calls = api.calls.load(Ordering::SeqCst);
        let mut notices = manager.notices();

        manager.logout();
        let first = manager.snapshot();
        manager.logout();
        let second = manager.snapshot();

        for session in [&first, &second] {
            assert_eq!(session.state(), SessionState::Anonymous);
            assert!(session.user().is_none());
            assert!(!session.has_token());
            assert!(!session.is_loading());
        }
        assert_eq!(stored_token(&store), None);
        assert_eq!(api.calls.load(Ordering::SeqCst), calls);
        assert_eq!(
            notices.recv().await.unwrap(),
            Notice::info("Logged out successfully")
        );
        assert!(matches!(
            manager.require_user(),
            Err(SessionError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_persisted_token_starts_authenticating() {
        let store = MemoryStore::with_entries([(TOKEN_KEY, VALID_TOKEN)]);
        let (manager, api, _) = manager(FakeApi::default(), store);

        let session = manager.snapshot();
        assert_eq!(session.state(), SessionState::Authenticating);
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());

        assert!(manager.check_auth().await);
        assert_eq!(manager.snapshot().state(), SessionState::Authenticated);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_auth_without_token() {
        let (manager, api, _) = manager(FakeApi::default(), MemoryStore::new());

        assert!(!manager.check_auth().await);

        let session = manager.snapshot();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.is_loading());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_auth_clears_stale_token() {
        let store = MemoryStore::with_entries([(TOKEN_KEY, "expired")]);
        let (manager, _, store) = manager(FakeApi::default(), store);
        let mut notices = manager.notices();
        let states = manager.subscribe();

        assert!(!manager.check_auth().await);

        let session = manager.snapshot();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.has_token());
        assert_eq!(stored_token(&store), None);
        assert!(states.has_changed().unwrap());
        // Silent: no error notice
        assert!(matches!(
            notices.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_check_auth_offline_signs_out() {
        let store = MemoryStore::with_entries([(TOKEN_KEY, VALID_TOKEN)]);
        let api = FakeApi::default();
        api.offline.store(true, Ordering::SeqCst);
        let (manager, _, store) = manager(api, store);

        assert!(!manager.check_auth().await);
        assert_eq!(manager.snapshot().state(), SessionState::Anonymous);
        assert_eq!(stored_token(&store), None);
    }

    #[tokio::test]
    async fn test_token_survives_restart() {
        let (manager, _, _) = manager(FakeApi::default(), MemoryStore::new());
        manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap();

        let store = manager.teardown().unwrap();
        let restarted = SessionManager::create(Arc::new(FakeApi::default()), store);

        assert_eq!(restarted.snapshot().state(), SessionState::Authenticating);
        assert!(restarted.check_auth().await);
        assert_eq!(restarted.require_user().unwrap().email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_teardown_with_live_clone() {
        let (manager, _, _) = manager(FakeApi::default(), MemoryStore::new());
        let clone = manager.clone();
        assert!(manager.teardown().is_none());
        assert!(clone.teardown().is_some());
    }

    #[tokio::test]
    async fn test_teardown_closes_channels() {
        let (manager, _, _) = manager(FakeApi::default(), MemoryStore::new());
        let mut states = manager.subscribe();
        let mut notices = manager.notices();

        drop(manager.teardown());

        assert!(states.changed().await.is_err());
        assert!(matches!(
            notices.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_login_is_busy() {
        let gate = Arc::new(Notify::new());
        let (manager, api, _) = manager(FakeApi::gated(&gate), MemoryStore::new());
        let first_password = password(PASSWORD);
        let second_password = password(PASSWORD);

        let (first, second) = tokio::join!(
            manager.login("ada@example.com", &first_password),
            async {
                let session = manager.snapshot();
                assert!(session.is_loading());
                assert_eq!(session.state(), SessionState::Authenticating);

                let result = manager.login("ada@example.com", &second_password).await;
                gate.notify_one();
                result
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(SessionError::Busy)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(!manager.snapshot().is_loading());
    }

    #[tokio::test]
    async fn test_check_auth_while_busy_returns_current_answer() {
        let gate = Arc::new(Notify::new());
        let store = MemoryStore::with_entries([(TOKEN_KEY, VALID_TOKEN)]);
        let (manager, api, _) = manager(FakeApi::gated(&gate), store);

        let (first, second) = tokio::join!(manager.check_auth(), async {
            let answer = manager.check_auth().await;
            gate.notify_one();
            answer
        });

        assert!(first);
        assert!(!second);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_result_after_logout_is_discarded() {
        let gate = Arc::new(Notify::new());
        let store = MemoryStore::with_entries([(TOKEN_KEY, VALID_TOKEN)]);
        let (manager, _, store) = manager(FakeApi::gated(&gate), store);

        let (authenticated, ()) = tokio::join!(manager.check_auth(), async {
            manager.logout();
            gate.notify_one();
        });

        assert!(!authenticated);
        let session = manager.snapshot();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.is_loading());
        assert_eq!(stored_token(&store), None);
    }

    #[tokio::test]
    async fn test_subscribers_see_loading_flip() {
        let (manager, _, _) = manager(FakeApi::default(), MemoryStore::new());
        let mut states = manager.subscribe();
        states.mark_unchanged();

        manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap();

        assert!(states.has_changed().unwrap());
        let session = states.borrow_and_update().clone();
        assert!(session.is_authenticated());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_require_admin_for_regular_user() {
        let (manager, _, _) = manager(FakeApi::default(), MemoryStore::new());
        manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap();
        assert!(matches!(
            manager.require_admin(),
            Err(SessionError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_token_file_does_not_block_login() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let manager = SessionManager::create(Arc::new(FakeApi::default()), FileStore::new(&path));
        assert_eq!(manager.snapshot().state(), SessionState::Anonymous);

        manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .unwrap();

        assert!(manager.snapshot().is_authenticated());
        let store = manager.teardown().unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some(VALID_TOKEN));
    }

    #[tokio::test]
    async fn test_check_auth_repairs_corrupt_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let manager = SessionManager::create(Arc::new(FakeApi::default()), FileStore::new(&path));

        assert!(!manager.check_auth().await);
        assert_eq!(manager.snapshot().state(), SessionState::Anonymous);
        assert_eq!(FileStore::new(&path).get(TOKEN_KEY).unwrap(), None);

        manager.logout();
        assert!(manager
            .login("ada@example.com", &password(PASSWORD))
            .await
            .is_ok());
    }
}
