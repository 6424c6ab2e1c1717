//! Client-side routing with access control.
//!
//! Every transition, including redirects requested by the API pipeline,
//! passes through the `NavigationGuard` before the location changes.

pub mod guard;
pub mod navigator;
pub mod routes;

pub use guard::{GuardOutcome, NavigationGuard};
pub use navigator::{NavigationResult, Navigator, Router, RouterHandle};
pub use routes::{normalize_path, Route, RouteMeta, RouteTable};

/// Login view; target of every authentication redirect
pub const LOGIN_PATH: &str = "/login";

/// Default view for authenticated users
pub const LANDING_PATH: &str = "/";
