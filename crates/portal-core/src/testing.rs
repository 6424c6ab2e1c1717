//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::ApiError;
use crate::auth::{CredentialExchange, TokenStore};
use crate::models::User;

pub fn staff_user() -> User {
    User {
        id: 7,
        username: "vanna".to_string(),
        email: "vanna@futura-dnc.com".to_string(),
        full_name: Some("Chea Vanna".to_string()),
        role_id: Some(3),
        manager_id: Some(2),
        is_active: true,
        profile_complete: true,
    }
}

pub fn admin_user() -> User {
    User {
        id: 1,
        username: "admin".to_string(),
        email: "admin@futura-dnc.com".to_string(),
        full_name: None,
        role_id: Some(1),
        manager_id: None,
        is_active: true,
        profile_complete: true,
    }
}

/// In-process stand-in for the authentication API.
///
/// Accepts [`FakeExchange::PASSWORD`] for any username and answers
/// "who am I" with the configured user.
pub struct FakeExchange {
    user: User,
    identity_fails: AtomicBool,
    exchange_gate: Mutex<Option<Arc<Notify>>>,
    identity_gate: Mutex<Option<Arc<Notify>>>,
    pub exchange_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeExchange {
    pub const PASSWORD: &'static str = "secret";
    pub const TOKEN: &'static str = "token-123";

    pub fn new(user: User) -> Self {
        Self {
            user,
            identity_fails: AtomicBool::new(false),
            exchange_gate: Mutex::new(None),
            identity_gate: Mutex::new(None),
            exchange_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Make "who am I" answer 401.
    pub fn fail_identity(&self, fail: bool) {
        self.identity_fails.store(fail, Ordering::SeqCst);
    }

    /// Suspend the next credential exchange until the returned handle is notified.
    pub fn hold_exchange(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.exchange_gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }

    /// Suspend the next identity fetch until the returned handle is notified.
    pub fn hold_identity(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.identity_gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl CredentialExchange for FakeExchange {
    async fn exchange_credentials(&self, _username: &str, password: &str) -> Result<String, ApiError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.exchange_gate.lock().expect("gate lock").take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if password == Self::PASSWORD {
            Ok(Self::TOKEN.to_string())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    async fn fetch_current_user(&self) -> Result<User, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.identity_gate.lock().expect("gate lock").take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.identity_fails.load(Ordering::SeqCst) {
            Err(ApiError::Unauthorized)
        } else {
            Ok(self.user.clone())
        }
    }
}

/// Token slot whose every operation fails, like an unreadable cache dir.
pub struct FailingTokenStore;

impl TokenStore for FailingTokenStore {
    fn load(&self) -> anyhow::Result<Option<String>> {
        bail!("token slot unreadable")
    }

    fn save(&self, _token: &str) -> anyhow::Result<()> {
        bail!("token slot read-only")
    }

    fn clear(&self) -> anyhow::Result<()> {
        bail!("token slot read-only")
    }
}
