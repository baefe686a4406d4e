use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{FutureExt, Shared};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::mirror::SessionMirror;
use crate::auth::provider::{IdentityProvider, TokenGrant};
use crate::error::AuthError;
use crate::session::state::SessionStatus;
use crate::session::store::SessionStore;

type RefreshFuture = Shared<Pin<Box<dyn Future<Output = Result<TokenGrant, AuthError>> + Send>>>;
type InflightSlot = Arc<Mutex<Option<RefreshFuture>>>;

/// Keeps the session token from going stale without user action.
///
/// While the session is authenticated a periodic task forces a token
/// renewal; the owning scope starts it on login and stops it on
/// logout or expiry, so no refresh ever fires against a dead session.
///
/// Concurrent refresh requests are deduplicated: whoever arrives while
/// one is in flight attaches to the same operation and observes the
/// same outcome, so a timer tick racing a manual refresh costs exactly
/// one token fetch.
pub struct RefreshScheduler {
    store: SessionStore,
    provider: Arc<dyn IdentityProvider>,
    mirror: SessionMirror,
    interval: Duration,
    inflight: InflightSlot,
    task: RwLock<Option<JoinHandle<()>>>,
    shutdown: RwLock<Option<mpsc::Sender<()>>>,
}

impl RefreshScheduler {
    pub fn new(
        store: SessionStore,
        provider: Arc<dyn IdentityProvider>,
        mirror: SessionMirror,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            mirror,
            interval,
            inflight: Arc::new(Mutex::new(None)),
            task: RwLock::new(None),
            shutdown: RwLock::new(None),
        }
    }

    /// Start the periodic refresh task. Idempotent while running.
    pub async fn start(&self) {
        let mut task_guard = self.task.write().await;
        if task_guard.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown.write().await = Some(shutdown_tx);

        let store = self.store.clone();
        let provider = Arc::clone(&self.provider);
        let mirror = self.mirror.clone();
        let inflight = Arc::clone(&self.inflight);
        let interval = self.interval;
        info!(interval_secs = interval.as_secs(), "refresh scheduler started");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; the session was just
            // refreshed by login, so skip it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match join_refresh(&inflight, &store, &provider, &mirror).await {
                            Ok(_) => debug!("scheduled token refresh completed"),
                            Err(e) => {
                                // The current token may still be valid;
                                // retry at the next tick instead of
                                // tearing the session down.
                                warn!(error = %e, "scheduled token refresh failed, retrying next tick");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("refresh scheduler stopping");
                        break;
                    }
                }
            }
        });

        *task_guard = Some(handle);
    }

    /// Stop the periodic task. An in-flight refresh is not cancelled;
    /// its result is discarded by the store's generation check if the
    /// session moved on.
    pub async fn stop(&self) {
        if let Some(shutdown_tx) = self.shutdown.write().await.take() {
            let _ = shutdown_tx.send(()).await;
        }
        if let Some(handle) = self.task.write().await.take() {
            let _ = handle.await;
            info!("refresh scheduler stopped");
        }
    }

    /// Whether the periodic task is currently running.
    pub async fn is_running(&self) -> bool {
        self.task.read().await.is_some()
    }

    /// Force a token renewal now.
    ///
    /// If a refresh is already in flight the caller joins it rather
    /// than issuing a second fetch; all joined callers resolve with
    /// the same grant or the same error.
    pub async fn force_refresh(&self) -> Result<TokenGrant, AuthError> {
        join_refresh(&self.inflight, &self.store, &self.provider, &self.mirror).await
    }
}

/// Join the in-flight refresh, or start one if none is underway.
async fn join_refresh(
    inflight: &InflightSlot,
    store: &SessionStore,
    provider: &Arc<dyn IdentityProvider>,
    mirror: &SessionMirror,
) -> Result<TokenGrant, AuthError> {
    let shared = {
        let mut slot = inflight.lock().await;
        match slot.as_ref() {
            Some(existing) => existing.clone(),
            None => {
                let store = store.clone();
                let provider = Arc::clone(provider);
                let mirror = mirror.clone();
                let slot_handle = Arc::clone(inflight);

                let fut: RefreshFuture = async move {
                    let result = run_refresh(store, provider, mirror).await;
                    // Clear the slot so the next request starts fresh.
                    *slot_handle.lock().await = None;
                    result
                }
                .boxed()
                .shared();

                *slot = Some(fut.clone());
                fut
            }
        }
    };

    shared.await
}

/// One actual refresh round-trip. Reads the store generation before
/// the fetch so a completion that lost the race to a newer write is
/// dropped instead of clobbering it.
async fn run_refresh(
    store: SessionStore,
    provider: Arc<dyn IdentityProvider>,
    mirror: SessionMirror,
) -> Result<TokenGrant, AuthError> {
    let snapshot = store.snapshot();
    if snapshot.session.status != SessionStatus::Authenticated {
        return Err(AuthError::NotAuthenticated);
    }
    let started_generation = snapshot.generation;

    let grant = provider.fetch_token(true).await?;
    let role = grant.role().to_string();

    if store.apply_refresh(started_generation, grant.token.clone(), role.clone()) {
        if let Err(e) = mirror.save(&grant.token.value, &role) {
            warn!(error = %e, "failed to persist refreshed session mirror");
        }
        debug!(role = %role, "session token refreshed");
    } else {
        debug!("refresh result superseded by a newer session write");
    }

    Ok(grant)
}
