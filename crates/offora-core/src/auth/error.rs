use thiserror::Error;

/// Failures of the session lifecycle itself.
///
/// `Clone` so that one refresh outcome can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The access token could not be decoded at login time.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The refresh attempt failed and the session was logged out.
    #[error("Session expired: {0}")]
    SessionExpired(String),
}
