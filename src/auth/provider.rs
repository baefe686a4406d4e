use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::events::Subscriber;
use crate::session::{BearerToken, Identity, DEFAULT_ROLE};

/// Claims decoded from an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// User id the token was issued to.
    pub user_id: Option<String>,
    /// Role claim embedded in the token, if present.
    pub role: Option<String>,
    /// Expiry claimed by the token itself.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly issued token together with its decoded claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: BearerToken,
    pub claims: TokenClaims,
}

impl TokenGrant {
    /// The role this grant confers. Falls back to the baseline role
    /// when the token carries no role claim.
    pub fn role(&self) -> &str {
        self.claims.role.as_deref().unwrap_or(DEFAULT_ROLE)
    }
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub identity: Identity,
    pub grant: TokenGrant,
}

/// Seam over the external identity service.
///
/// Implementations issue and renew tokens and report identity changes;
/// they never touch the session store themselves.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange credentials for an identity and a token.
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AuthError>;

    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, AuthError>;

    /// Invalidate the provider-held session, when supported.
    async fn revoke(&self) -> Result<(), AuthError> {
        // Default implementation does nothing
        Ok(())
    }

    /// Obtain a token for the current identity. With `force_refresh`
    /// a new token is fetched from the identity service rather than
    /// served from cache.
    async fn fetch_token(&self, force_refresh: bool) -> Result<TokenGrant, AuthError>;

    /// Subscribe to identity changes. The subscription yields the
    /// current identity (or `None`) first, then an event per
    /// sign-in/sign-out observed by the provider. This is the
    /// authoritative signal for whether any identity exists.
    fn identity_events(&self) -> Subscriber<Option<Identity>>;
}
