use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::events::{EventStream, SessionEvent, Subscriber};
use crate::session::state::{BearerToken, Identity, Session, SessionSnapshot, SessionStatus};

struct Generational {
    generation: u64,
    session: Session,
}

/// Single source of truth for the current session.
///
/// Reads are synchronous so route guards can evaluate without awaiting.
/// Writes are restricted to the crate: the auth manager (login, logout,
/// restore), the refresh scheduler (token replacement) and the portal
/// client (expiry on credential rejection) are the only writers.
///
/// Every committed write bumps the generation and publishes a
/// [`SessionEvent::StateChanged`] while the write lock is held, so
/// subscribers observe snapshots in strictly increasing generation
/// order and a stale refresh completion can be detected and dropped.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Generational>>,
    events: EventStream<SessionEvent>,
}

impl SessionStore {
    /// Create a store starting out anonymous at generation zero.
    pub fn new(events: EventStream<SessionEvent>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Generational {
                generation: 0,
                session: Session::anonymous(),
            })),
            events,
        }
    }

    /// The current session and its generation.
    pub fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.read();
        SessionSnapshot {
            generation: guard.generation,
            session: guard.session.clone(),
        }
    }

    /// The bearer token of an authenticated session, if any.
    pub fn bearer_token(&self) -> Option<String> {
        let guard = self.inner.read();
        guard.session.token.as_ref().map(|t| t.value.clone())
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> Subscriber<SessionEvent> {
        self.events.subscribe()
    }

    /// Mark the session as authenticating (login submitted, or a
    /// persisted session awaiting confirmation at startup).
    pub(crate) fn begin_authenticating(&self) {
        let mut guard = self.inner.write();
        self.commit(&mut guard, Session::authenticating());
    }

    /// Establish an authenticated session.
    pub(crate) fn complete_login(&self, identity: Identity, token: BearerToken, role: String) {
        let mut guard = self.inner.write();
        self.commit(&mut guard, Session::authenticated(identity, token, role));
    }

    /// Replace token and role after a background refresh.
    ///
    /// The write only lands if the store is still authenticated and no
    /// other write committed since the refresh started; a superseded
    /// completion is dropped and `false` is returned. Status and
    /// identity are untouched, so a successful refresh is invisible to
    /// consumers beyond the new snapshot.
    pub(crate) fn apply_refresh(
        &self,
        started_generation: u64,
        token: BearerToken,
        role: String,
    ) -> bool {
        let mut guard = self.inner.write();
        if guard.generation != started_generation {
            debug!(
                started_generation,
                current_generation = guard.generation,
                "dropping superseded refresh result"
            );
            return false;
        }
        if guard.session.status != SessionStatus::Authenticated {
            return false;
        }
        let identity = match guard.session.identity.clone() {
            Some(identity) => identity,
            None => return false,
        };
        self.commit(&mut guard, Session::authenticated(identity, token, role));
        true
    }

    /// Transition to expired after the backend rejected the token.
    ///
    /// Idempotent: only the first caller performs the transition and
    /// gets `true`; concurrent losers see `false` and must not repeat
    /// the cascade side effects.
    pub(crate) fn expire(&self) -> bool {
        let mut guard = self.inner.write();
        if guard.session.status != SessionStatus::Authenticated {
            return false;
        }
        let identity = guard.session.identity.clone();
        self.commit(&mut guard, Session::expired(identity));
        true
    }

    /// Drop back to anonymous (logout, or cleanup after expiry).
    pub(crate) fn reset_anonymous(&self) {
        let mut guard = self.inner.write();
        if guard.session.status == SessionStatus::Anonymous {
            return;
        }
        self.commit(&mut guard, Session::anonymous());
    }

    fn commit(&self, guard: &mut Generational, session: Session) {
        guard.generation += 1;
        guard.session = session;
        // Published under the write lock: subscribers see transitions
        // in generation order.
        self.events.publish(SessionEvent::StateChanged(SessionSnapshot {
            generation: guard.generation,
            session: guard.session.clone(),
        }));
    }
}
