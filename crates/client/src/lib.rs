//! ShopSwift client library.
//!
//! Talks to the ShopSwift REST API and keeps track of who is signed in.
//!
//! - [`config`] - Environment-driven configuration
//! - [`api`] - Typed REST client with a catalog cache
//! - [`storage`] - Durable key-value store for the session token
//! - [`session`] - Session manager, state and notices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, ConfigError};
pub use session::{
    AuthApi, Notice, NoticeLevel, Session, SessionError, SessionManager, SessionState,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

/// Session manager wired to the REST API and a token file, as used by the
/// command-line front end.
pub type ClientSession = SessionManager<ApiClient, FileStore>;
