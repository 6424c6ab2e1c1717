//! API client for the intranet portal backend.
//!
//! Every request goes through the interceptor [`Pipeline`], which attaches
//! the session's bearer token and reacts to authorization failures.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::CredentialExchange;
use crate::models::{LoginRequest, TokenResponse, User};

use super::pipeline::{Pipeline, RequestContext, RequestKind};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default backend when none is configured
pub const DEFAULT_BASE_URL: &str = "https://intranet-dev-01.futura-dnc.com/";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Credential exchange endpoint
const AUTH_LOGIN_PATH: &str = "/api/auth/login";

/// Identity endpoint for the bearer of the current token
const USERS_ME_PATH: &str = "/api/users/me";

/// API client for the portal backend.
/// Clone is cheap - reqwest::Client and the pipeline are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    pipeline: Arc<Pipeline>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, timeout: Duration, pipeline: Pipeline) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            pipeline: Arc::new(pipeline),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T, ApiError> {
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// Send a request through the pipeline.
    ///
    /// Interceptors see every failure before it is returned, so a 401 has
    /// already ended the session by the time the caller observes it.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        kind: RequestKind,
    ) -> Result<reqwest::Response, ApiError> {
        let ctx = RequestContext {
            method: method.clone(),
            path: path.to_string(),
            kind,
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        self.pipeline.outbound(&ctx, &mut headers);

        let url = self.url(path);
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.client.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = match request.send().await {
            Ok(response) => Self::check_response(response).await,
            Err(e) => Err(ApiError::NetworkError(e)),
        };

        if let Err(ref e) = result {
            debug!(error = %e, path = %ctx.path, "Request failed");
            self.pipeline.inbound_error(&ctx, e);
        }
        result
    }

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, body, RequestKind::Standard).await?;
        Self::parse(response, path).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::DELETE, path, None).await
    }
}

#[async_trait]
impl CredentialExchange for ApiClient {
    async fn exchange_credentials(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let body = LoginRequest { username, password };
        let response = self
            .send(Method::POST, AUTH_LOGIN_PATH, Some(&body), RequestKind::CredentialExchange)
            .await?;
        let token: TokenResponse = Self::parse(response, AUTH_LOGIN_PATH).await?;

        if token.access_token.is_empty() {
            return Err(ApiError::InvalidResponse("Login response carried an empty access token".to_string()));
        }
        Ok(token.access_token)
    }

    async fn fetch_current_user(&self) -> Result<User, ApiError> {
        self.get(USERS_ME_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(REQUEST_TIMEOUT_SECS), Pipeline::new())
            .expect("Failed to build client")
    }

    #[test]
    fn test_url_joining() {
        let api = client(DEFAULT_BASE_URL);
        assert_eq!(api.base_url(), "https://intranet-dev-01.futura-dnc.com");
        assert_eq!(api.url("/api/users/me"), "https://intranet-dev-01.futura-dnc.com/api/users/me");
        assert_eq!(api.url("api/tasks"), "https://intranet-dev-01.futura-dnc.com/api/tasks");
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let api = client("http://localhost:8000");
        assert_eq!(api.url(AUTH_LOGIN_PATH), "http://localhost:8000/api/auth/login");
    }
}
