//! Session and access-control core for the intranet portal client.
//!
//! - `auth`: session store, credential exchange, token persistence
//! - `api`: HTTP client and the interceptor pipeline every call passes through
//! - `router`: route table, navigation guard, and redirect handling
//! - `app`: wires the three together with a single shared session

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod router;

#[cfg(test)]
mod testing;

pub use app::Portal;
pub use config::Config;
