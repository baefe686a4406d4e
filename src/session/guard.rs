use serde::{Deserialize, Serialize};

use crate::session::state::{Session, SessionStatus};
use crate::session::store::SessionStore;

/// Where to send a caller that was not granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Redirect {
    /// No valid session: back to the login view.
    Login,
    /// Valid session, insufficient role: the baseline authenticated view.
    Dashboard,
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    NotAuthenticated,
    InsufficientRole,
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteAccess {
    /// Render the protected view.
    Granted,
    /// The session is still being resolved; render a neutral loading
    /// state instead of redirecting.
    Pending,
    /// Do not render; navigate to `redirect`.
    Denied {
        reason: DenyReason,
        redirect: Redirect,
    },
}

/// Decide access for a session against an optional role requirement.
///
/// Pure function of the session: no I/O, safe to call on every render.
/// An insufficient role is a soft deny — the session itself is valid,
/// so the caller is sent to the baseline view rather than to login.
pub fn evaluate(session: &Session, required_role: Option<&str>) -> RouteAccess {
    match session.status {
        SessionStatus::Authenticating => RouteAccess::Pending,
        SessionStatus::Anonymous | SessionStatus::Expired => RouteAccess::Denied {
            reason: DenyReason::NotAuthenticated,
            redirect: Redirect::Login,
        },
        SessionStatus::Authenticated => match required_role {
            Some(role) if !session.has_role(role) => RouteAccess::Denied {
                reason: DenyReason::InsufficientRole,
                redirect: Redirect::Dashboard,
            },
            _ => RouteAccess::Granted,
        },
    }
}

/// Gate consulted before rendering any protected view.
#[derive(Clone)]
pub struct RouteGuard {
    store: SessionStore,
}

impl RouteGuard {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Check access against the current session.
    pub fn check(&self, required_role: Option<&str>) -> RouteAccess {
        evaluate(&self.store.snapshot().session, required_role)
    }
}
