use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Superseded by a newer login or logout")]
    Superseded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Classify a failed credential exchange. A 401 from the login endpoint
    /// is a credential rejection, not an expired session.
    pub fn from_exchange(err: ApiError) -> Self {
        if err.is_unauthorized() {
            AuthError::InvalidCredentials
        } else {
            AuthError::Api(err)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::Api(e) if e.is_unauthorized())
    }
}
