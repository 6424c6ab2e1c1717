use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::models::User;

use super::{AuthError, CredentialExchange, TokenStore};

/// Message shown to the user when a login attempt fails
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// A consistent, point-in-time copy of the session for readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub token: String,
    pub user: Option<User>,
    pub loading: bool,
    pub error: String,
}

#[derive(Debug, Default)]
struct SessionState {
    token: String,
    user: Option<User>,
    loading: bool,
    error: String,
    /// Bumped whenever the token changes (a login writing one, or a logout).
    /// Async work captures it when it starts and only writes back if it is
    /// unchanged.
    generation: u64,
    /// Bumped by every login; the latest attempt owns `loading`/`error`.
    login_seq: u64,
}

/// Holds the bearer token and the identity behind it.
///
/// Shared by `Arc` between the API pipeline and the navigation guard.
/// State is behind a mutex that is never held across an await, so every
/// mutation is observed whole.
pub struct SessionStore {
    state: Mutex<SessionState>,
    exchange: Arc<dyn CredentialExchange>,
    storage: Arc<dyn TokenStore>,
}

impl SessionStore {
    /// Create the store, restoring any token persisted by a previous run.
    pub fn new(exchange: Arc<dyn CredentialExchange>, storage: Arc<dyn TokenStore>) -> Self {
        let token = match storage.load() {
            Ok(Some(token)) => {
                debug!("Restored persisted token");
                token
            }
            Ok(None) => {
                debug!("No persisted token found");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token, starting logged out");
                String::new()
            }
        };

        Self {
            state: Mutex::new(SessionState {
                token,
                ..Default::default()
            }),
            exchange,
            storage,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// The bearer token, if a session exists
    pub fn token(&self) -> Option<String> {
        let state = self.state();
        (!state.token.is_empty()).then(|| state.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.state().token.is_empty()
    }

    pub fn has_identity(&self) -> bool {
        self.state().user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.state().user.as_ref().is_some_and(User::is_admin)
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Last login failure message, empty if none
    pub fn error(&self) -> String {
        self.state().error.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            token: state.token.clone(),
            user: state.user.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Exchange credentials for a token, persist it, then load the identity.
    ///
    /// On failure `error` is set to [`LOGIN_FAILED_MESSAGE`] and the
    /// underlying error is returned. Nothing is retried.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (generation, login_seq) = {
            let mut state = self.state();
            state.loading = true;
            state.error.clear();
            state.login_seq += 1;
            (state.generation, state.login_seq)
        };
        info!(username, "Logging in");

        let result = self.run_login(generation, login_seq, username, password).await;

        let mut state = self.state();
        if state.login_seq == login_seq {
            state.loading = false;
            match &result {
                Ok(_) | Err(AuthError::Superseded) => {}
                Err(_) => state.error = LOGIN_FAILED_MESSAGE.to_string(),
            }
        }
        drop(state);

        match &result {
            Ok(user) => info!(username = %user.username, "Login successful"),
            Err(AuthError::Superseded) => debug!(username, "Login superseded"),
            Err(e) => error!(error = %e, username, "Login failed"),
        }
        result
    }

    async fn run_login(
        &self,
        generation: u64,
        login_seq: u64,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let token = self
            .exchange
            .exchange_credentials(username, password)
            .await
            .map_err(AuthError::from_exchange)?;

        {
            let mut state = self.state();
            if state.generation != generation || state.login_seq != login_seq {
                return Err(AuthError::Superseded);
            }
            state.generation += 1;
            state.token = token.clone();
            state.user = None;
        }

        if let Err(e) = self.storage.save(&token) {
            warn!(error = %e, "Failed to persist token, session will not survive a restart");
        }

        self.fetch_identity().await
    }

    /// Load the identity behind the current token.
    ///
    /// Token and user are left untouched on failure; the caller decides
    /// whether to log out. A result, success or failure, that arrives after
    /// the token changed is reported as [`AuthError::Superseded`].
    pub async fn fetch_identity(&self) -> Result<User, AuthError> {
        let generation = self.state().generation;
        debug!(generation, "Fetching identity");

        let result = self.exchange.fetch_current_user().await;

        let mut state = self.state();
        if state.generation != generation {
            debug!(generation, current = state.generation, "Discarding stale identity result");
            return Err(AuthError::Superseded);
        }
        let user = result?;
        if state.token.is_empty() {
            debug!("No token, discarding identity");
            return Err(AuthError::Superseded);
        }
        state.user = Some(user.clone());
        Ok(user)
    }

    /// Drop the session in memory and in storage. Never fails.
    pub fn logout(&self) {
        {
            let mut state = self.state();
            state.user = None;
            state.token.clear();
            state.generation += 1;
        }
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to remove persisted token");
        }
        info!("Logged out");
    }
}
