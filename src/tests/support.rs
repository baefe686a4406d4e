//! Shared fixtures: a scriptable identity provider and small helpers.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::auth::provider::{IdentityProvider, IdentitySession, TokenClaims, TokenGrant};
use crate::auth::SessionMirror;
use crate::error::AuthError;
use crate::events::{EventStream, Subscriber};
use crate::session::{BearerToken, Identity, SessionStatus, SessionStore, DEFAULT_ROLE};

/// Install the test log subscriber once; `RUST_LOG` controls output.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a grant with the given token value and role claim.
pub fn grant(token: &str, role: &str) -> TokenGrant {
    TokenGrant {
        token: BearerToken::new(token, Some(Utc::now() + chrono::Duration::hours(1))),
        claims: TokenClaims {
            user_id: Some("uid-1".to_string()),
            role: Some(role.to_string()),
            expires_at: None,
        },
    }
}

pub fn identity() -> Identity {
    Identity::new("uid-1", Some("proveedor@example.com".to_string()))
}

pub fn identity_session(token: &str, role: &str) -> IdentitySession {
    IdentitySession {
        identity: identity(),
        grant: grant(token, role),
    }
}

/// A mirror file under the system temp directory, unique per test.
pub fn temp_mirror() -> SessionMirror {
    let path: PathBuf = std::env::temp_dir().join(format!(
        "factoria-session-test-{}.json",
        uuid::Uuid::new_v4()
    ));
    SessionMirror::new(path)
}

/// Poll the store until it reaches `status` or the timeout elapses.
pub async fn wait_for_status(store: &SessionStore, status: SessionStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store.snapshot().session.status == status {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!(
                "store never reached {:?}, currently {:?}",
                status,
                store.snapshot().session.status
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Scriptable identity provider.
///
/// `fetch_token` pops queued outcomes (falling back to a counted
/// default grant) and can be slowed down to widen race windows.
/// Identity events are only published when a test asks for them, so
/// startup scenarios can hold the "subscription has not fired yet"
/// state open.
pub struct StubIdentityProvider {
    sign_in_outcome: Mutex<Option<Result<IdentitySession, AuthError>>>,
    sign_up_outcome: Mutex<Option<Result<IdentitySession, AuthError>>>,
    fetch_outcomes: Mutex<VecDeque<Result<TokenGrant, AuthError>>>,
    fetch_calls: AtomicUsize,
    fetch_delay: Mutex<Option<Duration>>,
    revoke_error: Mutex<Option<AuthError>>,
    identity_events: EventStream<Option<Identity>>,
}

impl StubIdentityProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sign_in_outcome: Mutex::new(None),
            sign_up_outcome: Mutex::new(None),
            fetch_outcomes: Mutex::new(VecDeque::new()),
            fetch_calls: AtomicUsize::new(0),
            fetch_delay: Mutex::new(None),
            revoke_error: Mutex::new(None),
            identity_events: EventStream::new(16),
        })
    }

    pub fn set_sign_in(&self, outcome: Result<IdentitySession, AuthError>) {
        *self.sign_in_outcome.lock() = Some(outcome);
    }

    pub fn set_sign_up(&self, outcome: Result<IdentitySession, AuthError>) {
        *self.sign_up_outcome.lock() = Some(outcome);
    }

    pub fn queue_fetch(&self, outcome: Result<TokenGrant, AuthError>) {
        self.fetch_outcomes.lock().push_back(outcome);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    pub fn fail_revoke(&self) {
        *self.revoke_error.lock() = Some(AuthError::network("connection refused"));
    }

    pub fn publish_identity(&self, identity: Option<Identity>) {
        self.identity_events.publish(identity);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<IdentitySession, AuthError> {
        self.sign_in_outcome
            .lock()
            .take()
            .unwrap_or_else(|| Ok(identity_session("stub-token", DEFAULT_ROLE)))
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<IdentitySession, AuthError> {
        self.sign_up_outcome
            .lock()
            .take()
            .unwrap_or_else(|| Ok(identity_session("stub-token", DEFAULT_ROLE)))
    }

    async fn revoke(&self) -> Result<(), AuthError> {
        match self.revoke_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_token(&self, _force_refresh: bool) -> Result<TokenGrant, AuthError> {
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.fetch_outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(grant(&format!("stub-token-{call}"), DEFAULT_ROLE)))
    }

    fn identity_events(&self) -> Subscriber<Option<Identity>> {
        self.identity_events.subscribe()
    }
}
