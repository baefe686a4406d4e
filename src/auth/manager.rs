use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::mirror::SessionMirror;
use crate::auth::provider::{IdentityProvider, IdentitySession};
use crate::error::AuthError;
use crate::events::{EventStream, SessionEvent, SignOutReason};
use crate::session::refresh::RefreshScheduler;
use crate::session::state::{Identity, SessionSnapshot, SessionStatus};
use crate::session::store::SessionStore;

/// Owns the session lifecycle: login, registration, logout, restoring
/// a persisted session at startup, and reacting to identity changes
/// reported by the provider.
///
/// Together with the refresh scheduler and the portal client this is
/// one of the three authorized writers of the session store.
pub struct AuthManager {
    provider: Arc<dyn IdentityProvider>,
    store: SessionStore,
    mirror: SessionMirror,
    events: EventStream<SessionEvent>,
    scheduler: Arc<RefreshScheduler>,
    watcher: RwLock<Option<JoinHandle<()>>>,
    watcher_shutdown: RwLock<Option<mpsc::Sender<()>>>,
}

impl AuthManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: SessionStore,
        mirror: SessionMirror,
        events: EventStream<SessionEvent>,
        scheduler: Arc<RefreshScheduler>,
    ) -> Self {
        Self {
            provider,
            store,
            mirror,
            events,
            scheduler,
            watcher: RwLock::new(None),
            watcher_shutdown: RwLock::new(None),
        }
    }

    /// Exchange credentials for an authenticated session.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionSnapshot, AuthError> {
        self.store.begin_authenticating();
        match self.provider.sign_in(email, password).await {
            Ok(issued) => self.establish(issued).await,
            Err(e) => {
                self.store.reset_anonymous();
                Err(e)
            }
        }
    }

    /// Create an account and sign it in.
    pub async fn register(&self, email: &str, password: &str) -> Result<SessionSnapshot, AuthError> {
        self.store.begin_authenticating();
        match self.provider.sign_up(email, password).await {
            Ok(issued) => self.establish(issued).await,
            Err(e) => {
                self.store.reset_anonymous();
                Err(e)
            }
        }
    }

    /// End the session. Local state is cleared even when the provider
    /// cannot be reached; the revocation is best effort.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.revoke().await {
            warn!(error = %e, "identity revocation failed, clearing local session anyway");
        }
        self.scheduler.stop().await;
        self.store.reset_anonymous();
        self.mirror.clear();
        self.events.publish(SessionEvent::SignedOut {
            reason: SignOutReason::Logout,
        });
        info!("session closed");
    }

    /// Restore a persisted session and start watching the provider's
    /// identity stream.
    ///
    /// A present mirror only puts the session into `Authenticating`;
    /// the identity stream is authoritative and either completes the
    /// session with a fresh token or resolves it back to anonymous.
    pub async fn initialize(&self) {
        if let Some(entry) = self.mirror.load() {
            debug!(role = %entry.role, "persisted session found, awaiting identity confirmation");
            self.store.begin_authenticating();
        }
        self.spawn_watcher().await;
    }

    /// Tear down the identity watcher and the refresh scheduler. Must
    /// run before the owning scope is dropped so no background task
    /// acts on a dead session.
    pub async fn shutdown(&self) {
        if let Some(shutdown_tx) = self.watcher_shutdown.write().await.take() {
            let _ = shutdown_tx.send(()).await;
        }
        if let Some(handle) = self.watcher.write().await.take() {
            let _ = handle.await;
        }
        self.scheduler.stop().await;
        debug!("auth manager shut down");
    }

    async fn establish(&self, issued: IdentitySession) -> Result<SessionSnapshot, AuthError> {
        let role = issued.grant.role().to_string();
        self.store
            .complete_login(issued.identity.clone(), issued.grant.token.clone(), role.clone());
        if let Err(e) = self.mirror.save(&issued.grant.token.value, &role) {
            warn!(error = %e, "failed to persist session mirror");
        }
        self.scheduler.start().await;
        info!(uid = %issued.identity.uid, role = %role, "session established");
        Ok(self.store.snapshot())
    }

    async fn spawn_watcher(&self) {
        let mut watcher_guard = self.watcher.write().await;
        if watcher_guard.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.watcher_shutdown.write().await = Some(shutdown_tx);

        let provider = Arc::clone(&self.provider);
        let store = self.store.clone();
        let mirror = self.mirror.clone();
        let scheduler = Arc::clone(&self.scheduler);
        let mut identities = self.provider.identity_events();
        let mut sessions = self.store.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("identity watcher stopping");
                        break;
                    }

                    event = identities.recv() => match event {
                        Ok(Some(identity)) => {
                            handle_identity(&store, &mirror, &scheduler, provider.as_ref(), identity).await;
                        }
                        Ok(None) => {
                            let snapshot = store.snapshot();
                            if snapshot.session.status == SessionStatus::Anonymous {
                                continue;
                            }
                            info!("identity service reports no identity, clearing session");
                            scheduler.stop().await;
                            store.reset_anonymous();
                            mirror.clear();
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "identity watcher lagged behind");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },

                    event = sessions.recv() => match event {
                        Ok(SessionEvent::StateChanged(snapshot))
                            if snapshot.session.status == SessionStatus::Expired =>
                        {
                            // Expiry cleanup: the rejecting request
                            // already cleared the mirror; stop the
                            // timer and finish the transition.
                            scheduler.stop().await;
                            store.reset_anonymous();
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "session watcher lagged behind");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        *watcher_guard = Some(handle);
    }
}

/// React to the provider reporting a signed-in identity: confirm it
/// with a forced token fetch and overwrite whatever the session holds.
async fn handle_identity(
    store: &SessionStore,
    mirror: &SessionMirror,
    scheduler: &Arc<RefreshScheduler>,
    provider: &dyn IdentityProvider,
    identity: Identity,
) {
    let snapshot = store.snapshot();
    if snapshot.session.status == SessionStatus::Authenticated
        && snapshot.session.identity.as_ref().map(|i| i.uid.as_str()) == Some(identity.uid.as_str())
    {
        // Already established for this identity (normal login path).
        return;
    }

    match provider.fetch_token(true).await {
        Ok(grant) => {
            let role = grant.role().to_string();
            store.complete_login(identity.clone(), grant.token.clone(), role.clone());
            if let Err(e) = mirror.save(&grant.token.value, &role) {
                warn!(error = %e, "failed to persist session mirror");
            }
            scheduler.start().await;
            info!(uid = %identity.uid, role = %role, "session confirmed by identity service");
        }
        Err(e) => {
            warn!(error = %e, uid = %identity.uid, "could not obtain a token for the reported identity");
            scheduler.stop().await;
            store.reset_anonymous();
            mirror.clear();
        }
    }
}
