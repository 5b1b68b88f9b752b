//! Authentication module for the client-side session lifecycle.
//!
//! This module provides:
//! - `Session`: the process-wide credential pair and decoded `Principal`
//! - `TokenStore`: durable storage for the pair (file, keychain or memory)
//! - `RefreshCoordinator`: single-flight access token refresh
//!
//! The access token is a JWT whose payload carries `username`, `is_vendor`
//! and `exp`; it is decoded locally and never verified client-side.

pub mod credentials;
pub mod error;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;

pub use credentials::KeyringTokenStore;
pub use error::AuthError;
pub use refresh::{RefreshCoordinator, TokenRefresher, DEFAULT_REFRESH_TIMEOUT};
pub use session::{Session, SessionData, SessionReceiver};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_ENTRY};
pub use token::{CredentialPair, Principal};

#[cfg(test)]
pub(crate) use token::test_tokens;
