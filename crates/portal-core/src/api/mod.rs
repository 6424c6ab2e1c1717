//! REST API client module for the intranet portal backend.
//!
//! This module provides the `ApiClient` for communicating with the portal
//! API, and the interceptor `Pipeline` every request passes through.
//!
//! The API uses bearer token authentication obtained from
//! `POST /api/auth/login`.

pub mod client;
pub mod error;
pub mod pipeline;

pub use client::{ApiClient, DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
pub use error::ApiError;
pub use pipeline::{best_effort, AuthInterceptor, Interceptor, Pipeline, RequestContext, RequestKind};
