use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::http_client::HttpClient;
use crate::auth::provider::{IdentityProvider, IdentitySession, TokenClaims, TokenGrant};
use crate::config::CoreConfig;
use crate::error::AuthError;
use crate::events::{EventStream, Subscriber};
use crate::session::{BearerToken, Identity};

const IDENTITY_EVENT_CAPACITY: usize = 16;

// Seconds of remaining validity below which a cached token is not
// served without a refresh.
const CACHED_TOKEN_MIN_VALIDITY_SECS: i64 = 60;

/// Credentials the provider holds between calls.
#[derive(Debug, Clone)]
struct StoredCredentials {
    identity: Identity,
    refresh_token: String,
    grant: TokenGrant,
}

/// Response of the sign-in and sign-up endpoints.
#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "localId")]
    local_id: String,
    email: Option<String>,
    #[serde(rename = "expiresIn")]
    expires_in: Option<String>,
}

/// Response of the token refresh endpoint (snake_case wire format).
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error: IdentityErrorDetail,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorDetail {
    message: String,
}

/// Identity-service client speaking the Google Identity Toolkit REST
/// protocol: password sign-in/sign-up plus refresh-token grants. Role
/// claims ride inside the issued JWT and are re-decoded on every
/// grant, never cached across refreshes.
pub struct RestIdentityClient {
    http: Arc<dyn HttpClient>,
    identity_url: String,
    token_url: String,
    api_key: String,
    credentials: RwLock<Option<StoredCredentials>>,
    identity_events: EventStream<Option<Identity>>,
}

impl RestIdentityClient {
    pub fn new(http: Arc<dyn HttpClient>, config: &CoreConfig) -> Self {
        Self {
            http,
            identity_url: config.identity_url.clone(),
            token_url: config.token_url.clone(),
            api_key: config.api_key.clone(),
            credentials: RwLock::new(None),
            // Replays "no identity" until a sign-in is observed.
            identity_events: EventStream::with_initial(IDENTITY_EVENT_CAPACITY, None),
        }
    }

    fn account_url(&self, action: &str) -> String {
        format!(
            "{}/v1/accounts:{}?key={}",
            self.identity_url, action, self.api_key
        )
    }

    fn refresh_url(&self) -> String {
        format!("{}/v1/token?key={}", self.token_url, self.api_key)
    }

    async fn password_grant(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, AuthError> {
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .http
            .post(
                &self.account_url(action),
                json_headers(),
                body.to_string(),
            )
            .await
            .map_err(AuthError::network)?;

        if !response.is_success() {
            return Err(map_identity_error(response.status(), response.body()));
        }

        let parsed: SignInResponse = response
            .json()
            .map_err(|e| AuthError::provider(format!("malformed sign-in response: {e}")))?;

        let identity = Identity::new(parsed.local_id, parsed.email);
        let grant = build_grant(&parsed.id_token, parsed.expires_in.as_deref());

        *self.credentials.write() = Some(StoredCredentials {
            identity: identity.clone(),
            refresh_token: parsed.refresh_token,
            grant: grant.clone(),
        });
        self.identity_events.publish(Some(identity.clone()));
        info!(uid = %identity.uid, "identity service issued a session");

        Ok(IdentitySession { identity, grant })
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AuthError> {
        self.password_grant("signInWithPassword", email, password)
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, AuthError> {
        self.password_grant("signUp", email, password).await
    }

    async fn revoke(&self) -> Result<(), AuthError> {
        // The identity service has no client-side revocation call;
        // dropping the refresh token ends the provider session.
        if let Some(creds) = self.credentials.write().take() {
            self.identity_events.publish(None);
            debug!(uid = %creds.identity.uid, "provider session discarded");
        }
        Ok(())
    }

    async fn fetch_token(&self, force_refresh: bool) -> Result<TokenGrant, AuthError> {
        let (refresh_token, cached) = {
            let guard = self.credentials.read();
            match guard.as_ref() {
                Some(creds) => (creds.refresh_token.clone(), creds.grant.clone()),
                None => return Err(AuthError::NotAuthenticated),
            }
        };

        if !force_refresh && !cached.token.expires_soon(CACHED_TOKEN_MIN_VALIDITY_SECS) {
            return Ok(cached);
        }

        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });

        let response = self
            .http
            .post(&self.refresh_url(), json_headers(), body.to_string())
            .await
            .map_err(AuthError::network)?;

        if !response.is_success() {
            return Err(map_identity_error(response.status(), response.body()));
        }

        let parsed: RefreshResponse = response
            .json()
            .map_err(|e| AuthError::provider(format!("malformed token response: {e}")))?;

        let grant = build_grant(&parsed.id_token, parsed.expires_in.as_deref());

        {
            let mut guard = self.credentials.write();
            if let Some(creds) = guard.as_mut() {
                creds.refresh_token = parsed.refresh_token;
                creds.grant = grant.clone();
                if let Some(user_id) = parsed.user_id {
                    creds.identity.uid = user_id;
                }
            }
        }
        debug!("token refreshed from identity service");

        Ok(grant)
    }

    fn identity_events(&self) -> Subscriber<Option<Identity>> {
        self.identity_events.subscribe()
    }
}

fn json_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers
}

/// Build a grant from a raw token and the service-reported lifetime,
/// decoding the claims embedded in the token payload.
fn build_grant(id_token: &str, expires_in: Option<&str>) -> TokenGrant {
    let claims = decode_claims(id_token);
    let expires_at = expires_in
        .and_then(|secs| secs.parse::<i64>().ok())
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
        .or(claims.expires_at);

    TokenGrant {
        token: BearerToken::new(id_token, expires_at),
        claims,
    }
}

/// Decode the claim set from a JWT without verifying the signature.
/// Verification belongs to the backend; the client only reads the
/// role, subject and expiry claims. Tokens that are not JWTs yield an
/// empty claim set, which downstream code treats as the baseline role.
pub(crate) fn decode_claims(token: &str) -> TokenClaims {
    let empty = TokenClaims {
        user_id: None,
        role: None,
        expires_at: None,
    };

    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) => payload,
        _ => return empty,
    };

    let decoded = match URL_SAFE_NO_PAD.decode(payload) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "token payload is not valid base64, ignoring claims");
            return empty;
        }
    };

    let value: serde_json::Value = match serde_json::from_slice(&decoded) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "token payload is not valid JSON, ignoring claims");
            return empty;
        }
    };

    TokenClaims {
        user_id: value
            .get("user_id")
            .or_else(|| value.get("sub"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        role: value.get("role").and_then(|v| v.as_str()).map(str::to_string),
        expires_at: value
            .get("exp")
            .and_then(|v| v.as_i64())
            .and_then(timestamp_to_datetime),
    }
}

fn timestamp_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Map an identity-service error body onto the credential taxonomy.
fn map_identity_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<IdentityErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| format!("status {status}"));

    match message.as_str() {
        m if m.starts_with("EMAIL_NOT_FOUND")
            || m.starts_with("INVALID_PASSWORD")
            || m.starts_with("INVALID_LOGIN_CREDENTIALS")
            || m.starts_with("USER_DISABLED") =>
        {
            AuthError::InvalidCredentials
        }
        m if m.starts_with("EMAIL_EXISTS") => AuthError::AccountExists,
        m if m.starts_with("WEAK_PASSWORD") => AuthError::WeakCredential,
        _ => AuthError::provider(message),
    }
}
