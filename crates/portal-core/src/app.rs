//! Wiring of the session subsystem.
//!
//! Build order matters: the auth interceptor exists before the session store
//! (the API client the store logs in with already needs it), and is bound to
//! the store and the router once both are built.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::api::{ApiClient, AuthInterceptor, Pipeline};
use crate::auth::{AuthError, SessionStore, TokenStore};
use crate::config::Config;
use crate::models::User;
use crate::router::{NavigationResult, RouteTable, Router};

pub struct Portal {
    pub api: ApiClient,
    pub session: Arc<SessionStore>,
    pub router: Router,
}

impl Portal {
    /// Build from configuration, restoring any persisted session.
    pub fn new(config: &Config) -> Result<Self> {
        let storage = config.token_store()?;
        Self::with_store(&config.api_base_url, config.request_timeout(), storage)
    }

    pub fn with_store(base_url: &str, timeout: Duration, storage: Arc<dyn TokenStore>) -> Result<Self> {
        let auth = Arc::new(AuthInterceptor::new());
        let pipeline = Pipeline::new().with(auth.clone());
        let api = ApiClient::new(base_url, timeout, pipeline)?;
        debug!(base_url = api.base_url(), "API client ready");

        let session = Arc::new(SessionStore::new(Arc::new(api.clone()), storage));
        auth.bind_session(&session);

        let router = Router::new(RouteTable::portal(), session.clone());
        auth.bind_navigator(Arc::new(router.handle()));

        debug!(authenticated = session.is_authenticated(), "Session restored");
        Ok(Self { api, session, router })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        self.session.login(username, password).await
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// Navigate, then apply any redirects the pipeline queued meanwhile.
    pub async fn open(&self, path: &str) -> NavigationResult {
        let result = self.router.navigate(path).await;
        match self.router.process_pending().await.pop() {
            Some(redirect) => redirect,
            None => result,
        }
    }
}
