use std::sync::Arc;
use std::time::Duration;

// Export modules
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod session;

#[cfg(test)]
mod tests;

pub use api::{HttpClient, PortalApi, ReqwestHttpClient};
pub use auth::{AuthManager, IdentityProvider, RestIdentityClient, SessionMirror};
pub use config::CoreConfig;
pub use error::{ApiError, AuthError};
pub use events::{SessionEvent, SignOutReason, Subscriber};
pub use session::{
    DenyReason, Redirect, RefreshScheduler, RouteAccess, RouteGuard, Session, SessionSnapshot,
    SessionStatus, SessionStore,
};

use events::{EventStream, EVENT_CHANNEL_CAPACITY};

/// Top-level wiring of the session core.
///
/// Owns the one session store plus every component around it and the
/// two background lifetimes (identity watcher, refresh timer). UI and
/// data-access code receive their collaborators from here instead of
/// reaching for globals, so tests can swap in doubles.
pub struct SessionCore {
    /// Session event stream shared by all components.
    pub events: EventStream<SessionEvent>,
    /// The single source of truth for the current session.
    pub store: SessionStore,
    /// Gate consulted before rendering protected views.
    pub guard: RouteGuard,
    /// Login/registration/logout entry points.
    pub auth: Arc<AuthManager>,
    /// Authorized client for the portal backend.
    pub portal: Arc<PortalApi>,
    scheduler: Arc<RefreshScheduler>,
    config: CoreConfig,
}

impl SessionCore {
    /// Build the core against the real identity service and backend.
    pub fn new(config: CoreConfig) -> Self {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let provider: Arc<dyn IdentityProvider> =
            Arc::new(RestIdentityClient::new(Arc::clone(&http), &config));
        Self::with_provider(config, provider, http)
    }

    /// Build the core with an injected identity provider and HTTP
    /// client (test doubles, alternative identity backends).
    pub fn with_provider(
        config: CoreConfig,
        provider: Arc<dyn IdentityProvider>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let events: EventStream<SessionEvent> = EventStream::new(EVENT_CHANNEL_CAPACITY);
        let store = SessionStore::new(events.clone());
        let mirror = SessionMirror::new(&config.mirror_path);
        let guard = RouteGuard::new(store.clone());

        let scheduler = Arc::new(RefreshScheduler::new(
            store.clone(),
            Arc::clone(&provider),
            mirror.clone(),
            Duration::from_secs(config.refresh_interval_secs),
        ));

        let auth = Arc::new(AuthManager::new(
            provider,
            store.clone(),
            mirror.clone(),
            events.clone(),
            Arc::clone(&scheduler),
        ));

        let portal = Arc::new(PortalApi::new(
            http,
            config.api_base.clone(),
            store.clone(),
            mirror,
            events.clone(),
        ));

        Self {
            events,
            store,
            guard,
            auth,
            portal,
            scheduler,
            config,
        }
    }

    /// Restore any persisted session and start the identity watcher.
    pub async fn initialize(&self) {
        self.auth.initialize().await;
    }

    /// Stop every background task owned by the core.
    pub async fn shutdown(&self) {
        self.auth.shutdown().await;
    }

    /// Force a token refresh outside the periodic cadence. Concurrent
    /// callers share one underlying fetch.
    pub async fn refresh_now(&self) -> Result<auth::TokenGrant, AuthError> {
        self.scheduler.force_refresh().await
    }

    /// The configuration the core was built with.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}
