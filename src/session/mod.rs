pub mod guard;
pub mod refresh;
pub mod state;
pub mod store;

pub use guard::{DenyReason, Redirect, RouteAccess, RouteGuard};
pub use refresh::RefreshScheduler;
pub use state::{
    BearerToken, Identity, Session, SessionSnapshot, SessionStatus, DEFAULT_ROLE, ROLE_ADMIN,
};
pub use store::SessionStore;
