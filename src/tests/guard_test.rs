//! Unit tests for the route guard decision matrix.

use crate::events::EventStream;
use crate::session::guard::{evaluate, DenyReason, Redirect, RouteAccess, RouteGuard};
use crate::session::{BearerToken, Session, SessionStore, DEFAULT_ROLE, ROLE_ADMIN};
use crate::tests::support::identity;

fn authenticated(role: &str) -> Session {
    Session::authenticated(identity(), BearerToken::new("tok", None), role.to_string())
}

#[test]
fn anonymous_and_expired_deny_to_login() {
    for session in [Session::anonymous(), Session::expired(Some(identity()))] {
        assert_eq!(
            evaluate(&session, None),
            RouteAccess::Denied {
                reason: DenyReason::NotAuthenticated,
                redirect: Redirect::Login,
            }
        );
    }
}

#[test]
fn authenticating_is_pending_not_denied() {
    assert_eq!(
        evaluate(&Session::authenticating(), Some(ROLE_ADMIN)),
        RouteAccess::Pending
    );
}

#[test]
fn insufficient_role_soft_denies_to_dashboard() {
    let session = authenticated(DEFAULT_ROLE);
    assert_eq!(
        evaluate(&session, Some(ROLE_ADMIN)),
        RouteAccess::Denied {
            reason: DenyReason::InsufficientRole,
            redirect: Redirect::Dashboard,
        }
    );
}

#[test]
fn any_authenticated_role_passes_unrestricted_views() {
    let session = authenticated(DEFAULT_ROLE);
    assert_eq!(evaluate(&session, None), RouteAccess::Granted);
}

#[test]
fn matching_role_is_granted() {
    let session = authenticated(ROLE_ADMIN);
    assert_eq!(evaluate(&session, Some(ROLE_ADMIN)), RouteAccess::Granted);
}

#[tokio::test]
async fn guard_reads_live_store_state() {
    let store = SessionStore::new(EventStream::new(16));
    let guard = RouteGuard::new(store.clone());

    assert!(matches!(guard.check(None), RouteAccess::Denied { .. }));

    store.begin_authenticating();
    assert_eq!(guard.check(None), RouteAccess::Pending);

    store.complete_login(
        identity(),
        BearerToken::new("tok", None),
        DEFAULT_ROLE.to_string(),
    );
    assert_eq!(guard.check(None), RouteAccess::Granted);
    assert_eq!(
        guard.check(Some(ROLE_ADMIN)),
        RouteAccess::Denied {
            reason: DenyReason::InsufficientRole,
            redirect: Redirect::Dashboard,
        }
    );
}
