use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{AuthError, CredentialPair, Principal, TokenStore};

/// One consistent view of the session: the pair and the principal decoded
/// from its access token, published together.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub credentials: CredentialPair,
    pub principal: Principal,
}

/// Observers receive `None` when logged out.
pub type SessionReceiver = watch::Receiver<Option<Arc<SessionData>>>;

/// Process-wide authentication state.
///
/// `login` and `logout` are the only writers, plus their refresh-driven
/// variants `rotate` and `expire`. All of them hold a writer lock across the
/// token store write and the publish, so a user login and a refresh-triggered
/// re-login cannot interleave.
pub struct Session {
    store: Arc<dyn TokenStore>,
    state: watch::Sender<Option<Arc<SessionData>>>,
    writer: Mutex<()>,
}

impl Session {
    /// Open a session backed by `store`, restoring any saved pair.
    pub fn open(store: Arc<dyn TokenStore>) -> Self {
        let restored = store.load().and_then(|credentials| {
            match Principal::decode(&credentials.access) {
                Ok(principal) => {
                    debug!(username = %principal.username, "Restored session from storage");
                    Some(Arc::new(SessionData {
                        credentials,
                        principal,
                    }))
                }
                Err(e) => {
                    warn!(error = %e, "Stored access token is undecodable, purging");
                    if let Err(e) = store.clear() {
                        warn!(error = %e, "Failed to purge token store");
                    }
                    None
                }
            }
        });

        let (state, _) = watch::channel(restored);
        Self {
            store,
            state,
            writer: Mutex::new(()),
        }
    }

    /// Current principal, if logged in. Never touches storage.
    pub fn current(&self) -> Option<Principal> {
        self.state.borrow().as_ref().map(|d| d.principal.clone())
    }

    pub fn credentials(&self) -> Option<CredentialPair> {
        self.state.borrow().as_ref().map(|d| d.credentials.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|d| d.credentials.access.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Watch login/logout transitions.
    pub fn subscribe(&self) -> SessionReceiver {
        self.state.subscribe()
    }

    /// Install a new credential pair.
    ///
    /// Fails with [`AuthError::InvalidCredential`] when the access token
    /// cannot be decoded; the session is left untouched in that case.
    pub fn login(&self, credentials: CredentialPair) -> Result<Principal, AuthError> {
        let principal = Self::decode_pair(&credentials)?;

        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        self.install(credentials, principal.clone());
        Ok(principal)
    }

    /// Drop the credential pair from memory and storage. Always succeeds.
    pub fn logout(&self) {
        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        self.clear();
    }

    /// Install a refreshed pair while the session still holds
    /// `captured_refresh`. Returns `Ok(None)` when the user logged out or
    /// logged in as someone else while the refresh was running.
    pub(crate) fn rotate(
        &self,
        captured_refresh: &str,
        credentials: CredentialPair,
    ) -> Result<Option<Principal>, AuthError> {
        let principal = Self::decode_pair(&credentials)?;

        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        if !self.holds_refresh(captured_refresh) {
            debug!("Session changed during refresh, discarding refreshed pair");
            return Ok(None);
        }
        self.install(credentials, principal.clone());
        Ok(Some(principal))
    }

    /// Log out after a failed refresh, unless the session has already moved
    /// on from `captured_refresh`.
    pub(crate) fn expire(&self, captured_refresh: &str) {
        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        if self.holds_refresh(captured_refresh) {
            self.clear();
        }
    }

    fn decode_pair(credentials: &CredentialPair) -> Result<Principal, AuthError> {
        if !credentials.is_complete() {
            return Err(AuthError::InvalidCredential(
                "credential pair is missing a token".to_string(),
            ));
        }
        Principal::decode(&credentials.access)
    }

    fn holds_refresh(&self, refresh: &str) -> bool {
        self.state
            .borrow()
            .as_ref()
            .is_some_and(|d| d.credentials.refresh == refresh)
    }

    // Callers hold the writer lock.
    fn install(&self, credentials: CredentialPair, principal: Principal) {
        if let Err(e) = self.store.save(&credentials) {
            warn!(error = %e, "Failed to persist credential pair");
        }
        info!(
            username = %principal.username,
            is_vendor = principal.is_vendor,
            "Session logged in"
        );
        self.state
            .send_replace(Some(Arc::new(SessionData { credentials, principal })));
    }

    // Callers hold the writer lock.
    fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear token store");
        }
        let previous = self.state.send_replace(None);
        if let Some(previous) = previous {
            info!(username = %previous.principal.username, "Session logged out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_tokens::{far_future, jwt};
    use crate::auth::MemoryTokenStore;

    fn session_with(store: Arc<MemoryTokenStore>) -> Session {
        Session::open(store)
    }

    #[test]
    fn test_login_is_visible_immediately() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = session_with(store.clone());
        assert_eq!(session.current(), None);

        let access = jwt("asha", false, far_future());
        let principal = session
            .login(CredentialPair::new(access.clone(), "R1"))
            .expect("login");

        assert_eq!(session.current(), Some(principal.clone()));
        assert_eq!(principal.username, "asha");
        assert_eq!(session.access_token().as_deref(), Some(access.as_str()));
        assert_eq!(store.load(), Some(CredentialPair::new(access, "R1")));
    }

    #[test]
    fn test_invalid_login_leaves_session_unchanged() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = session_with(store.clone());
        let good = CredentialPair::new(jwt("asha", false, far_future()), "R1");
        session.login(good.clone()).expect("login");

        let err = session
            .login(CredentialPair::new("garbage", "R2"))
            .expect_err("undecodable token");
        assert!(matches!(err, AuthError::InvalidCredential(_)));

        let err = session
            .login(CredentialPair::new(jwt("asha", false, far_future()), ""))
            .expect_err("lone access token");
        assert!(matches!(err, AuthError::InvalidCredential(_)));

        assert_eq!(session.credentials(), Some(good.clone()));
        assert_eq!(store.load(), Some(good));
    }

    #[test]
    fn test_logout_twice() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = session_with(store.clone());
        session
            .login(CredentialPair::new(jwt("asha", false, far_future()), "R1"))
            .expect("login");

        session.logout();
        session.logout();

        assert_eq!(session.current(), None);
        assert_eq!(session.credentials(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_restore_from_storage() {
        let store = Arc::new(MemoryTokenStore::new());
        let pair = CredentialPair::new(jwt("meera", true, far_future()), "R1");
        store.save(&pair).expect("seed");

        let session = session_with(store);
        let principal = session.current().expect("restored");
        assert_eq!(principal.username, "meera");
        assert!(principal.is_vendor);
    }

    #[test]
    fn test_restore_purges_undecodable_pair() {
        let store = Arc::new(MemoryTokenStore::with_raw(
            r#"{"access":"not-a-jwt","refresh":"R1"}"#,
        ));
        let session = session_with(store.clone());

        assert_eq!(session.current(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_rotate_only_replaces_the_captured_pair() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = session_with(store.clone());
        session
            .login(CredentialPair::new(jwt("asha", false, far_future()), "R1"))
            .expect("login");

        let rotated = CredentialPair::new(jwt("asha", false, far_future() + 60), "R2");
        assert!(session.rotate("R1", rotated.clone()).expect("rotate").is_some());
        assert_eq!(store.load(), Some(rotated.clone()));

        // R1 is no longer held, so a late rotation is discarded
        let late = CredentialPair::new(jwt("asha", false, far_future() + 120), "R3");
        assert_eq!(session.rotate("R1", late).expect("rotate"), None);
        assert_eq!(session.credentials(), Some(rotated.clone()));

        session.expire("R1");
        assert_eq!(session.credentials(), Some(rotated));
        session.expire("R2");
        assert_eq!(session.current(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_rotate_after_logout_stays_logged_out() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = session_with(store.clone());
        session
            .login(CredentialPair::new(jwt("asha", false, far_future()), "R1"))
            .expect("login");
        session.logout();

        let refreshed = CredentialPair::new(jwt("asha", false, far_future() + 60), "R2");
        assert_eq!(session.rotate("R1", refreshed).expect("rotate"), None);
        assert_eq!(session.current(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_observers_see_transitions() {
        let session = session_with(Arc::new(MemoryTokenStore::new()));
        let mut rx = session.subscribe();
        assert!(rx.borrow_and_update().is_none());

        session
            .login(CredentialPair::new(jwt("ravi", false, far_future()), "R1"))
            .expect("login");
        assert!(rx.has_changed().expect("sender alive"));
        let seen = rx
            .borrow_and_update()
            .as_ref()
            .map(|d| d.principal.username.clone());
        assert_eq!(seen.as_deref(), Some("ravi"));

        session.logout();
        assert!(rx.has_changed().expect("sender alive"));
        assert!(rx.borrow_and_update().is_none());
    }
}
