use http::StatusCode;
use thiserror::Error;

/// Errors raised by the identity provider and the session manager.
///
/// Clone with owned message payloads so a refresh outcome can be fanned
/// out to every caller attached to the same in-flight operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity service rejected the email/password pair.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Registration failed because the email is already taken.
    #[error("an account already exists for this email")]
    AccountExists,

    /// Registration failed because the password is too weak.
    #[error("password does not meet the security requirements")]
    WeakCredential,

    /// An operation that needs a signed-in session found none.
    #[error("no authenticated session")]
    NotAuthenticated,

    /// The identity service answered with something we could not use.
    #[error("identity service returned an unusable response: {message}")]
    Provider { message: String },

    /// The identity service could not be reached.
    #[error("network error talking to the identity service: {message}")]
    NetworkError { message: String },
}

impl AuthError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn network(message: impl std::fmt::Display) -> Self {
        Self::NetworkError {
            message: message.to_string(),
        }
    }
}

/// Errors raised by calls to the portal backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No session token exists; the request was never sent.
    #[error("no session token available")]
    Unauthenticated,

    /// The backend rejected the session token. The session has been
    /// expired locally; callers should suppress their own error toast
    /// for this case since the sign-out flow already notifies the user.
    #[error("session expired")]
    SessionExpired,

    /// The backend answered with a non-success status other than 401.
    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: StatusCode, message: String },

    /// The backend could not be reached at all.
    #[error("network unavailable: {message}")]
    NetworkUnavailable { message: String },
}

impl ApiError {
    pub fn request_failed(status: StatusCode, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }
}
