//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: the session state machine (startup validation, login, logout)
//! - `TokenStore`: persistence for the bearer token, with file, keychain
//!   and in-memory backends
//!
//! The token is the only state that survives a restart. Everything else is
//! rebuilt from it by validating against the backend on startup.

pub mod session;
pub mod token_store;

pub use session::{Session, SessionStatus, SessionStore};
pub use token_store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
