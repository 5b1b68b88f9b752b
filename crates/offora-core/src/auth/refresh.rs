//! Single-flight access token refresh.
//!
//! However many requests hit a `401` at the same time, at most one refresh
//! call is outstanding. Later callers attach to the in-flight attempt and
//! receive the same outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AuthError, CredentialPair, Session};

/// Default upper bound on one refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Exchanges a refresh token for a new credential pair.
pub trait TokenRefresher: Send + Sync {
    fn refresh(&self, refresh_token: String) -> BoxFuture<'static, anyhow::Result<CredentialPair>>;
}

type RefreshOutcome = Result<String, AuthError>;
type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

pub struct RefreshCoordinator {
    session: Arc<Session>,
    refresher: Arc<dyn TokenRefresher>,
    timeout: Duration,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    network_calls: Arc<AtomicUsize>,
}

impl RefreshCoordinator {
    pub fn new(session: Arc<Session>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            session,
            refresher,
            timeout: DEFAULT_REFRESH_TIMEOUT,
            in_flight: Arc::new(Mutex::new(None)),
            network_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of refresh calls issued so far.
    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    /// Obtain a fresh access token.
    ///
    /// `rejected_access` is the token the failed request carried. If the
    /// session already holds a different one, a refresh finished in the
    /// meantime and that token is returned without another network call.
    ///
    /// Waiters joined to one attempt are woken in the order they joined.
    /// On a current-thread runtime they also resume in that order; the
    /// multi-thread scheduler may run them in a different order.
    pub async fn refresh(&self, rejected_access: Option<&str>) -> Result<String, AuthError> {
        let flight = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(flight) => {
                    debug!("Joining in-flight token refresh");
                    flight.clone()
                }
                None => {
                    let credentials = self.session.credentials().ok_or_else(|| {
                        AuthError::SessionExpired("no credential to refresh".to_string())
                    })?;

                    if let Some(rejected) = rejected_access {
                        if credentials.access != rejected {
                            debug!("Access token already rotated, reusing it");
                            return Ok(credentials.access);
                        }
                    }

                    let flight = self.start(credentials.refresh);
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Spawn the refresh so it runs to completion even if every waiter
    /// goes away. The task clears the marker after updating the session.
    fn start(&self, refresh_token: String) -> InFlight {
        let calls = self.network_calls.fetch_add(1, Ordering::SeqCst) + 1;
        info!(refresh_calls = calls, "Refreshing access token");

        let session = Arc::clone(&self.session);
        let refresher = Arc::clone(&self.refresher);
        let slot = Arc::clone(&self.in_flight);
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let captured = refresh_token.clone();
            let outcome =
                match tokio::time::timeout(timeout, refresher.refresh(refresh_token)).await {
                    Ok(Ok(pair)) => match session.rotate(&captured, pair) {
                        Ok(_) => session.access_token().ok_or_else(|| {
                            AuthError::SessionExpired("logged out during refresh".to_string())
                        }),
                        Err(e) => {
                            warn!(error = %e, "Refresh returned an unusable token");
                            Err(AuthError::SessionExpired(e.to_string()))
                        }
                    },
                    Ok(Err(e)) => {
                        warn!(error = %format!("{e:#}"), "Token refresh rejected");
                        Err(AuthError::SessionExpired(format!("{e:#}")))
                    }
                    Err(_) => {
                        warn!(timeout_secs = timeout.as_secs_f64(), "Token refresh timed out");
                        Err(AuthError::SessionExpired("refresh timed out".to_string()))
                    }
                };

            if outcome.is_err() {
                session.expire(&captured);
            }
            slot.lock().await.take();
            outcome
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(AuthError::SessionExpired(format!("refresh task failed: {e}")))
            })
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_tokens::{far_future, jwt};
    use crate::auth::{MemoryTokenStore, TokenStore};

    /// Hands out `{A<n+1>, R<n+1>}` after a short delay, or fails.
    struct FakeRefresher {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl FakeRefresher {
        fn new(delay: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail,
                seen: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    impl TokenRefresher for FakeRefresher {
        fn refresh(
            &self,
            refresh_token: String,
        ) -> BoxFuture<'static, anyhow::Result<CredentialPair>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(refresh_token);
            let delay = self.delay;
            let fail = self.fail;
            async move {
                tokio::time::sleep(delay).await;
                if fail {
                    anyhow::bail!("refresh token revoked");
                }
                Ok(CredentialPair::new(a2(), "R2"))
            }
            .boxed()
        }
    }

    fn a1() -> String {
        jwt("asha", false, far_future())
    }

    fn a2() -> String {
        jwt("asha", false, far_future() + 600)
    }

    fn logged_in() -> (Arc<Session>, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Arc::new(Session::open(store.clone()));
        session
            .login(CredentialPair::new(a1(), "R1"))
            .expect("login");
        (session, store)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let (session, store) = logged_in();
        let refresher = FakeRefresher::new(Duration::from_millis(50), false);
        let coordinator = RefreshCoordinator::new(session.clone(), refresher.clone());

        let stale = a1();
        let results = futures::future::join_all(
            (0..5).map(|_| coordinator.refresh(Some(stale.as_str()))),
        )
        .await;

        for result in results {
            assert_eq!(result, Ok(a2()));
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.network_calls(), 1);
        assert_eq!(*refresher.seen.lock().unwrap(), vec!["R1".to_string()]);
        assert_eq!(store.load(), Some(CredentialPair::new(a2(), "R2")));
    }

    #[tokio::test]
    async fn test_failed_refresh_logs_out_every_waiter() {
        let (session, store) = logged_in();
        let refresher = FakeRefresher::new(Duration::from_millis(20), true);
        let coordinator = RefreshCoordinator::new(session.clone(), refresher.clone());

        let (first, second) = tokio::join!(coordinator.refresh(None), coordinator.refresh(None));

        assert!(matches!(first, Err(AuthError::SessionExpired(_))));
        assert_eq!(first, second);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.current(), None);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let (session, _store) = logged_in();
        let refresher = FakeRefresher::new(Duration::from_secs(5), false);
        let coordinator = RefreshCoordinator::new(session.clone(), refresher)
            .with_timeout(Duration::from_millis(20));

        let result = coordinator.refresh(None).await;

        assert_eq!(
            result,
            Err(AuthError::SessionExpired("refresh timed out".to_string()))
        );
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_rotated_token_is_reused_without_network() {
        let (session, _store) = logged_in();
        session
            .login(CredentialPair::new(a2(), "R2"))
            .expect("rotate");
        let refresher = FakeRefresher::new(Duration::ZERO, false);
        let coordinator = RefreshCoordinator::new(session, refresher.clone());

        let stale = a1();
        assert_eq!(coordinator.refresh(Some(stale.as_str())).await, Ok(a2()));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_session_expires() {
        let session = Arc::new(Session::open(Arc::new(MemoryTokenStore::new())));
        let refresher = FakeRefresher::new(Duration::ZERO, false);
        let coordinator = RefreshCoordinator::new(session, refresher.clone());

        assert!(matches!(
            coordinator.refresh(None).await,
            Err(AuthError::SessionExpired(_))
        ));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_is_not_undone() {
        let (session, store) = logged_in();
        let refresher = FakeRefresher::new(Duration::from_millis(50), false);
        let coordinator = RefreshCoordinator::new(session.clone(), refresher.clone());

        let (result, _) = tokio::join!(coordinator.refresh(None), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.logout();
        });

        assert!(matches!(result, Err(AuthError::SessionExpired(_))));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.current(), None);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_a_newer_login() {
        let (session, store) = logged_in();
        let refresher = FakeRefresher::new(Duration::from_millis(50), true);
        let coordinator = RefreshCoordinator::new(session.clone(), refresher);
        let ravi = CredentialPair::new(jwt("ravi", false, far_future()), "R9");

        let (result, _) = tokio::join!(coordinator.refresh(None), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.login(ravi.clone()).expect("login");
        });

        assert!(matches!(result, Err(AuthError::SessionExpired(_))));
        assert_eq!(session.current().map(|p| p.username).as_deref(), Some("ravi"));
        assert_eq!(store.load(), Some(ravi));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_waiters_resume_in_arrival_order() {
        let (session, _store) = logged_in();
        let refresher = FakeRefresher::new(Duration::from_millis(20), false);
        let coordinator = Arc::new(RefreshCoordinator::new(session, refresher.clone()));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let waiters: Vec<_> = (0..4)
            .map(|i| {
                let coordinator = Arc::clone(&coordinator);
                let order = Arc::clone(&order);
                tokio::spawn(async move {
                    let token = coordinator.refresh(None).await;
                    order.lock().unwrap().push(i);
                    token
                })
            })
            .collect();

        for waiter in waiters {
            assert_eq!(waiter.await.expect("waiter task"), Ok(a2()));
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_coordinator_returns_to_idle() {
        let (session, _store) = logged_in();
        let refresher = FakeRefresher::new(Duration::ZERO, false);
        let coordinator = RefreshCoordinator::new(session.clone(), refresher.clone());

        coordinator.refresh(None).await.expect("first refresh");
        coordinator.refresh(None).await.expect("second refresh");

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
        assert!(coordinator.in_flight.lock().await.is_none());
    }
}
