use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::User;

/// Remote authentication API used by the session store.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Trade a username/password pair for a bearer token.
    async fn exchange_credentials(&self, username: &str, password: &str) -> Result<String, ApiError>;

    /// Resolve the identity behind the current bearer token.
    async fn fetch_current_user(&self) -> Result<User, ApiError>;
}
