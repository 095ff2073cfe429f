//! Route guard for protected screens.
//!
//! The guard is a pure function of the session: it never mutates anything
//! and is re-evaluated every time the UI draws.

use crate::auth::{Session, SessionStatus};

/// What the UI should do with a protected screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session is still being validated; show a placeholder
    Loading,
    /// Show the login view instead of the protected content
    RedirectToLogin,
    /// Show the protected content
    Render,
}

pub struct RouteGuard;

impl RouteGuard {
    pub fn evaluate(session: &Session) -> RouteDecision {
        Self::for_status(&session.status)
    }

    pub fn for_status(status: &SessionStatus) -> RouteDecision {
        match status {
            SessionStatus::Initializing => RouteDecision::Loading,
            SessionStatus::Authenticated => RouteDecision::Render,
            // The login view stays up while a login is in flight
            SessionStatus::Authenticating
            | SessionStatus::Unauthenticated
            | SessionStatus::Error(_) => RouteDecision::RedirectToLogin,
        }
    }
}
