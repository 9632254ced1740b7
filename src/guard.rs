// src/guard.rs
use std::sync::Arc;

use crate::session::SessionStore;

/// Views a client can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    CreateShort,
    MyVideos,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::CreateShort => "/create-short",
            Route::MyVideos => "/my-videos",
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard | Route::CreateShort | Route::MyVideos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// Gates protected views on the presence of a session. Nothing is cached:
/// every check reads the store, so a `clear()` revokes access immediately.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    session: Arc<SessionStore>,
}

impl AccessGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    pub fn can_enter(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn navigate(&self, route: Route) -> Navigation {
        if route.is_protected() && !self.can_enter() {
            tracing::debug!("Redirecting {} to login: no session", route.path());
            Navigation::Redirect(Route::Login)
        } else {
            Navigation::Render(route)
        }
    }
}
