use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::SessionStore;

use super::guard::{GuardOutcome, NavigationGuard};
use super::routes::{normalize_path, RouteTable};
use super::LOGIN_PATH;

/// Capacity of the programmatic redirect queue; redirects beyond it are dropped
const REDIRECT_BUFFER_SIZE: usize = 16;

/// Guard redirects followed within a single navigation
const MAX_REDIRECTS: usize = 5;

/// Lets components outside the router ask for a navigation.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    /// Queue a navigation to `path`; the router applies it on its next
    /// [`Router::process_pending`].
    fn redirect(&self, path: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// Landed on `location` (the requested path unless the guard redirected)
    Arrived { location: String, redirected: bool },
    /// No route matches the path
    NotFound(String),
    /// A newer navigation started while this one waited on the guard
    Superseded,
    /// The guard kept redirecting
    RedirectLoop(String),
}

impl NavigationResult {
    pub fn location(&self) -> Option<&str> {
        match self {
            NavigationResult::Arrived { location, .. } => Some(location.as_str()),
            _ => None,
        }
    }
}

/// Cloneable handle the API pipeline uses to redirect.
#[derive(Clone)]
pub struct RouterHandle {
    current: Arc<Mutex<String>>,
    redirect_tx: mpsc::Sender<String>,
}

impl Navigator for RouterHandle {
    fn current_path(&self) -> String {
        self.current
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn redirect(&self, path: &str) -> Result<()> {
        self.redirect_tx
            .try_send(path.to_string())
            .map_err(|e| anyhow!("Failed to queue redirect to {}: {}", path, e))?;
        debug!(path, "Redirect queued");
        Ok(())
    }
}

/// Owns the current location and runs the guard for every transition.
pub struct Router {
    routes: RouteTable,
    guard: NavigationGuard,
    current: Arc<Mutex<String>>,
    seq: AtomicU64,
    redirect_tx: mpsc::Sender<String>,
    redirect_rx: Mutex<mpsc::Receiver<String>>,
}

impl Router {
    pub fn new(routes: RouteTable, session: Arc<SessionStore>) -> Self {
        let (tx, rx) = mpsc::channel(REDIRECT_BUFFER_SIZE);
        Self {
            routes,
            guard: NavigationGuard::new(session),
            // Nothing rendered yet; the first navigation decides the view
            current: Arc::new(Mutex::new(String::new())),
            seq: AtomicU64::new(0),
            redirect_tx: tx,
            redirect_rx: Mutex::new(rx),
        }
    }

    pub fn handle(&self) -> RouterHandle {
        RouterHandle {
            current: self.current.clone(),
            redirect_tx: self.redirect_tx.clone(),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn current(&self) -> MutexGuard<'_, String> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current_path(&self) -> String {
        self.current().clone()
    }

    /// Navigate to `path`, following guard redirects.
    pub async fn navigate(&self, path: &str) -> NavigationResult {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let from = self.current_path();
        let mut target = normalize_path(path);
        let mut redirected = false;

        for _ in 0..=MAX_REDIRECTS {
            let Some(route) = self.routes.resolve(&target) else {
                debug!(path = %target, "No route matches");
                return NavigationResult::NotFound(target);
            };

            let outcome = self.guard.check(&from, route).await;

            if self.seq.load(Ordering::SeqCst) != seq {
                debug!(path = %target, "Navigation superseded");
                return NavigationResult::Superseded;
            }

            match outcome {
                GuardOutcome::Allow => {
                    *self.current() = target.clone();
                    info!(from = %from, to = %target, "Navigated");
                    return NavigationResult::Arrived {
                        location: target,
                        redirected,
                    };
                }
                GuardOutcome::Redirect(next) => {
                    debug!(from = %target, to = %next, "Guard redirected");
                    target = next;
                    redirected = true;
                }
            }
        }

        warn!(path, "Too many redirects");
        NavigationResult::RedirectLoop(path.to_string())
    }

    /// Apply redirects queued through [`RouterHandle`].
    pub async fn process_pending(&self) -> Vec<NavigationResult> {
        let pending: Vec<String> = {
            let mut rx = self
                .redirect_rx
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::iter::from_fn(|| rx.try_recv().ok()).collect()
        };

        let mut results = Vec::with_capacity(pending.len());
        for path in pending {
            if path == LOGIN_PATH && self.current_path() == LOGIN_PATH {
                debug!("Already on login view, dropping queued redirect");
                continue;
            }
            results.push(self.navigate(&path).await);
        }
        results
    }
}
