use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role claim granting access to the administration views.
pub const ROLE_ADMIN: &str = "admin";

/// Role assigned when a token carries no role claim.
pub const DEFAULT_ROLE: &str = "proveedor";

/// Reference to the externally managed user behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user id assigned by the identity service.
    pub uid: String,
    /// Email address, when the identity service reports one.
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }
}

/// Bearer credential presented to the portal backend.
///
/// Opaque except for its validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    /// The raw token value sent in the Authorization header.
    pub value: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token expires (if known).
    pub expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            issued_at: Utc::now(),
            expires_at,
        }
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |exp| exp <= Utc::now())
    }

    /// Check if the token will expire within the given threshold.
    pub fn expires_soon(&self, threshold_secs: i64) -> bool {
        self.expires_at
            .map_or(false, |exp| (exp - Utc::now()).num_seconds() < threshold_secs)
    }
}

/// Lifecycle state of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No identity is present.
    Anonymous,
    /// Credentials are being exchanged, or a persisted session is
    /// awaiting confirmation from the identity service.
    Authenticating,
    /// A valid token and role are present.
    Authenticated,
    /// The backend rejected the token; cleanup is pending.
    Expired,
}

/// The single process-wide record of who is signed in.
///
/// Invariant: `token` and `role` are populated exactly when `status`
/// is [`SessionStatus::Authenticated`]; the constructors below are the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Option<Identity>,
    pub token: Option<BearerToken>,
    pub role: Option<String>,
    pub status: SessionStatus,
}

impl Session {
    /// The state every client starts in.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            token: None,
            role: None,
            status: SessionStatus::Anonymous,
        }
    }

    /// Credentials submitted, or a persisted session awaiting
    /// confirmation.
    pub fn authenticating() -> Self {
        Self {
            identity: None,
            token: None,
            role: None,
            status: SessionStatus::Authenticating,
        }
    }

    /// A fully established session.
    pub fn authenticated(identity: Identity, token: BearerToken, role: String) -> Self {
        Self {
            identity: Some(identity),
            token: Some(token),
            role: Some(role),
            status: SessionStatus::Authenticated,
        }
    }

    /// Token rejected by the backend. The credential is dropped so it
    /// can never be reused; the identity is kept for diagnostics until
    /// cleanup resets the session.
    pub fn expired(identity: Option<Identity>) -> Self {
        Self {
            identity,
            token: None,
            role: None,
            status: SessionStatus::Expired,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Whether the session carries the given role claim.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

/// A point-in-time view of the session, tagged with the store
/// generation that produced it. Generations strictly increase, so two
/// snapshots can always be ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub session: Session,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn constructors_uphold_token_invariant() {
        assert!(Session::anonymous().token.is_none());
        assert!(Session::authenticating().token.is_none());
        assert!(Session::expired(None).token.is_none());

        let session = Session::authenticated(
            Identity::new("uid-1", None),
            BearerToken::new("tok", None),
            DEFAULT_ROLE.to_string(),
        );
        assert!(session.token.is_some());
        assert!(session.role.is_some());
        assert!(session.is_authenticated());
    }

    #[test]
    fn expired_session_drops_credential_but_keeps_identity() {
        let identity = Identity::new("uid-1", Some("p@example.com".into()));
        let session = Session::expired(Some(identity.clone()));
        assert_eq!(session.identity, Some(identity));
        assert!(session.token.is_none());
        assert!(session.role.is_none());
    }

    #[test]
    fn token_expiry_window() {
        let expiring = BearerToken::new("tok", Some(Utc::now() + Duration::seconds(30)));
        assert!(!expiring.is_expired());
        assert!(expiring.expires_soon(60));
        assert!(!expiring.expires_soon(10));

        let expired = BearerToken::new("tok", Some(Utc::now() - Duration::seconds(1)));
        assert!(expired.is_expired());

        let unknown = BearerToken::new("tok", None);
        assert!(!unknown.is_expired());
        assert!(!unknown.expires_soon(3600));
    }

    #[test]
    fn role_checks() {
        let admin = Session::authenticated(
            Identity::new("uid-1", None),
            BearerToken::new("tok", None),
            ROLE_ADMIN.to_string(),
        );
        assert!(admin.is_admin());
        assert!(!admin.has_role(DEFAULT_ROLE));
    }
}
