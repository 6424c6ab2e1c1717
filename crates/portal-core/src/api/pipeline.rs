//! Request/response interceptors applied to every API call.
//!
//! `ApiClient` hands each outbound request's headers to the pipeline before
//! sending, and each failed response to the pipeline before returning the
//! error to its caller. Interceptors never fail a request: their errors are
//! logged and the request continues.

use std::fmt::Display;
use std::sync::{Arc, OnceLock, Weak};

use anyhow::{anyhow, Context, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::router::{Navigator, LOGIN_PATH};

use super::ApiError;

/// What a request is for, as far as interceptors care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Ordinary API call; a 401 means the session is no longer valid.
    Standard,
    /// The login exchange; a 401 means the credentials were rejected.
    CredentialExchange,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub kind: RequestKind,
}

pub trait Interceptor: Send + Sync {
    /// Adjust headers of an outbound request.
    fn on_request(&self, _ctx: &RequestContext, _headers: &mut HeaderMap) -> Result<()> {
        Ok(())
    }

    /// Observe a failed response before the error reaches the caller.
    fn on_error(&self, _ctx: &RequestContext, _error: &ApiError) {}
}

/// Run a fire-and-forget side effect, logging instead of propagating failure.
pub fn best_effort<T, E: Display>(context: &str, result: std::result::Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "{} failed, continuing", context);
            None
        }
    }
}

/// Ordered list of interceptors.
#[derive(Default, Clone)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn outbound(&self, ctx: &RequestContext, headers: &mut HeaderMap) {
        for interceptor in &self.interceptors {
            best_effort("Outbound interceptor", interceptor.on_request(ctx, headers));
        }
    }

    pub fn inbound_error(&self, ctx: &RequestContext, error: &ApiError) {
        for interceptor in &self.interceptors {
            interceptor.on_error(ctx, error);
        }
    }
}

/// Attaches the session's bearer token and ends the session on a 401.
///
/// Created before the session store exists; [`bind_session`] and
/// [`bind_navigator`] connect it once the rest of the app is built. Until
/// then requests go out unauthenticated.
///
/// [`bind_session`]: AuthInterceptor::bind_session
/// [`bind_navigator`]: AuthInterceptor::bind_navigator
#[derive(Default)]
pub struct AuthInterceptor {
    session: OnceLock<Weak<SessionStore>>,
    navigator: OnceLock<Arc<dyn Navigator>>,
}

impl AuthInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_session(&self, session: &Arc<SessionStore>) {
        if self.session.set(Arc::downgrade(session)).is_err() {
            warn!("Session store already bound to auth interceptor");
        }
    }

    pub fn bind_navigator(&self, navigator: Arc<dyn Navigator>) {
        if self.navigator.set(navigator).is_err() {
            warn!("Navigator already bound to auth interceptor");
        }
    }

    fn session(&self) -> Result<Arc<SessionStore>> {
        self.session
            .get()
            .ok_or_else(|| anyhow!("session store not bound"))?
            .upgrade()
            .ok_or_else(|| anyhow!("session store dropped"))
    }

    fn navigator(&self) -> Result<&Arc<dyn Navigator>> {
        self.navigator
            .get()
            .ok_or_else(|| anyhow!("navigator not bound"))
    }

    fn redirect_to_login(&self) -> Result<()> {
        let navigator = self.navigator()?;
        if navigator.current_path() == LOGIN_PATH {
            debug!("Already on login view, not redirecting");
            return Ok(());
        }
        navigator.redirect(LOGIN_PATH)
    }
}

impl Interceptor for AuthInterceptor {
    fn on_request(&self, _ctx: &RequestContext, headers: &mut HeaderMap) -> Result<()> {
        let Some(token) = self.session()?.token() else {
            return Ok(());
        };
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Token is not a valid header value")?;
        headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }

    fn on_error(&self, ctx: &RequestContext, error: &ApiError) {
        if !error.is_unauthorized() || ctx.kind == RequestKind::CredentialExchange {
            return;
        }
        info!(method = %ctx.method, path = %ctx.path, "Request unauthorized, ending session");
        best_effort("Logout after 401", self.session().map(|session| session.logout()));
        best_effort("Redirect to login after 401", self.redirect_to_login());
    }
}
