//! Data models for portal entities.
//!
//! Only the identity record is modeled here; page-level records (tasks,
//! leave requests, tickets, ...) are plain JSON handled by the pages that
//! request them through `ApiClient`.

pub mod user;

pub use user::{LoginRequest, TokenResponse, User, ADMIN_ROLE_ID};
