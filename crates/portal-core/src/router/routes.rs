//! Route table and per-route access policy.

use serde::{Deserialize, Serialize};

/// Access policy declared on a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub admin_only: bool,
}

impl RouteMeta {
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        admin_only: false,
    };

    pub const AUTH: Self = Self {
        requires_auth: true,
        admin_only: false,
    };

    pub const ADMIN: Self = Self {
        requires_auth: true,
        admin_only: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Path pattern; `:name` segments match any single segment
    pub pattern: String,
    /// View rendered at this route
    pub view: String,
    pub meta: RouteMeta,
}

impl Route {
    pub fn new(pattern: &str, view: &str, meta: RouteMeta) -> Self {
        Self {
            pattern: pattern.to_string(),
            view: view.to_string(),
            meta,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let pattern: Vec<&str> = segments(&self.pattern).collect();
        let path: Vec<&str> = segments(path).collect();
        pattern.len() == path.len()
            && pattern
                .iter()
                .zip(&path)
                .all(|(p, s)| p.starts_with(':') || p == s)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strip query string and fragment, collapse trailing slashes.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The portal's views and their access policy.
    pub fn portal() -> Self {
        use RouteMeta as M;
        Self::new(vec![
            Route::new("/login", "Login", M::PUBLIC),
            Route::new("/", "Dashboard", M::AUTH),
            Route::new("/tasks", "TaskCard", M::AUTH),
            Route::new("/projects/:id", "Project", M::AUTH),
            Route::new("/helpdesk", "Helpdesk", M::AUTH),
            Route::new("/library", "Library", M::AUTH),
            Route::new("/finance", "Finance", M::ADMIN),
            Route::new("/qa", "QA", M::ADMIN),
            Route::new("/safety", "Safety", M::ADMIN),
            Route::new("/profile", "ProfileEdit", M::AUTH),
            Route::new("/leave", "Leave", M::AUTH),
            Route::new("/timesheet", "Timesheet", M::AUTH),
            Route::new("/timesheet-review", "TimesheetReview", M::AUTH),
            Route::new("/mission", "Mission", M::AUTH),
            Route::new("/requests", "Requests", M::AUTH),
            Route::new("/recruitment", "Recruitment", M::AUTH),
            Route::new("/user-profile", "UserProfile", M::AUTH),
            Route::new("/leave-record", "LeaveRecord", M::AUTH),
            Route::new("/recruitment-record", "RecruitmentRecord", M::AUTH),
            Route::new("/request-record", "RequestRecord", M::AUTH),
            Route::new("/admin", "Admin", M::AUTH),
        ])
    }

    /// First route whose pattern matches `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let path = normalize_path(path);
        self.routes.iter().find(|r| r.matches(&path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}
