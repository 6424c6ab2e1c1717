use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{AuthError, SessionStore};

use super::routes::Route;
use super::{LANDING_PATH, LOGIN_PATH};

/// Identity fetches tried per check while the session keeps changing
const MAX_IDENTITY_ATTEMPTS: usize = 3;

/// Result of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect(String),
}

/// Access check run before every route transition.
pub struct NavigationGuard {
    session: Arc<SessionStore>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decide whether the transition `from -> to` may proceed.
    ///
    /// Each call ends in exactly one outcome. The only suspension point is
    /// the identity fetch when a token exists without a loaded user; if the
    /// session changes under that fetch it is retried for the new token.
    pub async fn check(&self, from: &str, to: &Route) -> GuardOutcome {
        if to.meta.requires_auth && !self.session.is_authenticated() {
            debug!(from, to = %to.pattern, "No session, redirecting to login");
            return GuardOutcome::Redirect(LOGIN_PATH.to_string());
        }

        let mut attempts = 0;
        while self.session.is_authenticated() && !self.session.has_identity() {
            attempts += 1;
            match self.session.fetch_identity().await {
                Ok(user) => debug!(username = %user.username, "Identity loaded by guard"),
                Err(AuthError::Superseded) if attempts < MAX_IDENTITY_ATTEMPTS => {
                    // Session changed while we waited; retry against the new token
                    debug!(attempts, "Identity fetch superseded during navigation");
                }
                Err(AuthError::Superseded) => {
                    warn!(attempts, to = %to.pattern, "Session kept changing, deciding without identity");
                    break;
                }
                Err(e) => {
                    info!(error = %e, to = %to.pattern, "Identity fetch failed, ending session");
                    self.session.logout();
                    return GuardOutcome::Redirect(LOGIN_PATH.to_string());
                }
            }
        }

        if to.meta.requires_auth && !self.session.is_authenticated() {
            debug!(to = %to.pattern, "Session ended during navigation, redirecting to login");
            return GuardOutcome::Redirect(LOGIN_PATH.to_string());
        }

        if to.meta.admin_only && !self.session.is_admin() {
            debug!(to = %to.pattern, "Admin-only route, redirecting to landing");
            return GuardOutcome::Redirect(LANDING_PATH.to_string());
        }

        GuardOutcome::Allow
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::router::{RouteMeta, RouteTable};
    use crate::testing::{admin_user, staff_user, FakeExchange};

    fn setup(user: crate::models::User, token: &str) -> (Arc<FakeExchange>, Arc<SessionStore>, NavigationGuard) {
        let exchange = Arc::new(FakeExchange::new(user));
        let session = Arc::new(SessionStore::new(
            exchange.clone(),
            Arc::new(MemoryTokenStore::with_token(token)),
        ));
        let guard = NavigationGuard::new(session.clone());
        (exchange, session, guard)
    }

    fn route(path: &str) -> Route {
        RouteTable::portal().resolve(path).expect("known route").clone()
    }

    #[tokio::test]
    async fn test_requires_auth_without_token_redirects_to_login() {
        let (exchange, _session, guard) = setup(staff_user(), "");

        let outcome = guard.check("/", &route("/tasks")).await;

        assert_eq!(outcome, GuardOutcome::Redirect(LOGIN_PATH.to_string()));
        assert_eq!(exchange.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_protected_route_redirects_without_token() {
        let (_exchange, _session, guard) = setup(admin_user(), "");

        for r in RouteTable::portal().iter().filter(|r| r.meta.requires_auth) {
            let outcome = guard.check("/login", r).await;
            assert_eq!(outcome, GuardOutcome::Redirect(LOGIN_PATH.to_string()), "{}", r.pattern);
        }
    }

    #[tokio::test]
    async fn test_public_route_without_token_is_allowed() {
        let (exchange, _session, guard) = setup(staff_user(), "");

        assert_eq!(guard.check("/tasks", &route("/login")).await, GuardOutcome::Allow);
        assert_eq!(exchange.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lazy_identity_non_admin_redirected_to_landing() {
        let (exchange, session, guard) = setup(staff_user(), "abc");

        let outcome = guard.check("/", &route("/finance")).await;

        assert_eq!(outcome, GuardOutcome::Redirect(LANDING_PATH.to_string()));
        assert_eq!(exchange.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.user(), Some(staff_user()));
    }

    #[tokio::test]
    async fn test_admin_allowed_on_admin_route() {
        let (exchange, session, guard) = setup(admin_user(), "abc");
        session.fetch_identity().await.expect("identity");

        let outcome = guard.check("/", &route("/finance")).await;

        assert_eq!(outcome, GuardOutcome::Allow);
        // Identity already loaded, no second fetch
        assert_eq!(exchange.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_admin_never_allowed_on_admin_routes() {
        let (_exchange, session, guard) = setup(staff_user(), "abc");
        session.fetch_identity().await.expect("identity");

        for r in RouteTable::portal().iter().filter(|r| r.meta.admin_only) {
            let outcome = guard.check("/", r).await;
            assert_eq!(outcome, GuardOutcome::Redirect(LANDING_PATH.to_string()), "{}", r.pattern);
        }
    }

    #[tokio::test]
    async fn test_failed_identity_fetch_logs_out() {
        let (exchange, session, guard) = setup(staff_user(), "stale");
        exchange.fail_identity(true);

        let outcome = guard.check("/", &route("/tasks")).await;

        assert_eq!(outcome, GuardOutcome::Redirect(LOGIN_PATH.to_string()));
        assert!(session.token().is_none());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_failed_identity_on_public_route_still_redirects() {
        let (exchange, session, guard) = setup(staff_user(), "stale");
        exchange.fail_identity(true);

        let outcome = guard.check("/", &route("/login")).await;

        assert_eq!(outcome, GuardOutcome::Redirect(LOGIN_PATH.to_string()));
        assert!(!session.is_authenticated());

        // Second pass after the logout: nothing left to fetch
        assert_eq!(guard.check("/", &route("/login")).await, GuardOutcome::Allow);
        assert_eq!(exchange.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_admin_only_without_auth_requirement() {
        let custom = Route::new(
            "/reports",
            "Reports",
            RouteMeta {
                requires_auth: false,
                admin_only: true,
            },
        );
        let (_exchange, _session, guard) = setup(admin_user(), "");

        assert_eq!(
            guard.check("/", &custom).await,
            GuardOutcome::Redirect(LANDING_PATH.to_string())
        );
    }

    #[tokio::test]
    async fn test_stale_identity_failure_keeps_newer_session() {
        let (exchange, session, guard) = setup(staff_user(), "expired");
        let gate = exchange.hold_identity();

        let target = route("/tasks");
        let check = guard.check("/", &target);
        let login_then_release = async {
            tokio::task::yield_now().await;
            session.login("vanna", FakeExchange::PASSWORD).await.expect("login");
            // The suspended fetch for the old token now comes back 401
            exchange.fail_identity(true);
            gate.notify_one();
        };
        let (outcome, ()) = futures::join!(check, login_then_release);

        assert_eq!(outcome, GuardOutcome::Allow);
        assert_eq!(session.token().as_deref(), Some(FakeExchange::TOKEN));
        assert_eq!(session.user(), Some(staff_user()));
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_retried_for_new_token() {
        let (exchange, session, guard) = setup(staff_user(), "abc");
        let gate = exchange.hold_identity();

        let target = route("/tasks");
        let check = guard.check("/", &target);
        let relogin_then_release = async {
            tokio::task::yield_now().await;
            // New token written, but its own identity fetch fails
            exchange.fail_identity(true);
            assert!(session.login("vanna", FakeExchange::PASSWORD).await.is_err());
            exchange.fail_identity(false);
            gate.notify_one();
        };
        let (outcome, ()) = futures::join!(check, relogin_then_release);

        assert_eq!(outcome, GuardOutcome::Allow);
        assert_eq!(session.token().as_deref(), Some(FakeExchange::TOKEN));
        assert_eq!(session.user(), Some(staff_user()));
        assert_eq!(exchange.fetch_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_logout_during_fetch_redirects_to_login() {
        let (exchange, session, guard) = setup(staff_user(), "abc");
        let gate = exchange.hold_identity();

        let target = route("/tasks");
        let check = guard.check("/", &target);
        let logout_then_release = async {
            tokio::task::yield_now().await;
            session.logout();
            gate.notify_one();
        };
        let (outcome, ()) = futures::join!(check, logout_then_release);

        assert_eq!(outcome, GuardOutcome::Redirect(LOGIN_PATH.to_string()));
        assert_eq!(exchange.fetch_calls.load(Ordering::SeqCst), 1);
    }
}
