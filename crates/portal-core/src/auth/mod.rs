//! Authentication module for the portal session.
//!
//! This module provides:
//! - `SessionStore`: bearer token + identity with login/fetch/logout
//! - `CredentialExchange`: the remote login and "who am I" calls
//! - `TokenStore`: durable slot for the token (file, keyring, memory)
//!
//! The token is restored once at startup and survives restarts until logout.

pub mod error;
pub mod exchange;
pub mod session;
pub mod storage;

pub use error::AuthError;
pub use exchange::CredentialExchange;
pub use session::{SessionSnapshot, SessionStore, LOGIN_FAILED_MESSAGE};
pub use storage::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
