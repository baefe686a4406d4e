use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::http_client::{HttpClient, SimpleHttpResponse};
use crate::api::types::{DashboardStats, InvoiceList, SupplierList, SupplierProfile};
use crate::auth::mirror::SessionMirror;
use crate::error::ApiError;
use crate::events::{EventStream, SessionEvent, SignOutReason};
use crate::session::store::SessionStore;

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
    Patch,
    Put,
}

impl Verb {
    fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Put => "PUT",
        }
    }
}

/// Authorized client for the portal backend.
///
/// Every call reads the current session token and sends it as a bearer
/// credential; a call without an authenticated session fails locally
/// before any network traffic. A 401 answer is the one structural
/// signal handled here: the session is expired exactly once, the
/// persisted mirror is cleared, a sign-out event is published for
/// navigation, and the caller gets a typed [`ApiError::SessionExpired`]
/// so it can skip its own error notification.
pub struct PortalApi {
    http: Arc<dyn HttpClient>,
    base_url: String,
    store: SessionStore,
    mirror: SessionMirror,
    events: EventStream<SessionEvent>,
}

impl PortalApi {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        store: SessionStore,
        mirror: SessionMirror,
        events: EventStream<SessionEvent>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
            mirror,
            events,
        }
    }

    /// GET a backend path.
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.dispatch(Verb::Get, path, None).await
    }

    /// POST a JSON body to a backend path.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.dispatch(Verb::Post, path, Some(body)).await
    }

    /// PATCH a backend path with a JSON body.
    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.dispatch(Verb::Patch, path, Some(body)).await
    }

    /// PUT a JSON body to a backend path.
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.dispatch(Verb::Put, path, Some(body)).await
    }

    /// List invoices visible to the current role.
    pub async fn list_invoices(&self) -> Result<InvoiceList, ApiError> {
        decode(self.get("/invoices").await?)
    }

    /// Set an invoice's payment status (admin only on the backend).
    pub async fn update_invoice_status(
        &self,
        invoice_id: &str,
        status: &str,
    ) -> Result<Value, ApiError> {
        self.patch(
            &format!("/invoices/{invoice_id}/status"),
            &json!({ "status": status }),
        )
        .await
    }

    /// List registered suppliers (admin only on the backend).
    pub async fn list_suppliers(&self) -> Result<SupplierList, ApiError> {
        decode(self.get("/suppliers").await?)
    }

    /// Fetch the administrator dashboard statistics.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        decode(self.get("/dashboard/stats").await?)
    }

    /// Fetch the current user's supplier profile.
    pub async fn get_profile(&self) -> Result<SupplierProfile, ApiError> {
        decode(self.get("/profile").await?)
    }

    /// Update the current user's supplier profile.
    pub async fn update_profile(&self, profile: &SupplierProfile) -> Result<Value, ApiError> {
        let body = serde_json::to_value(profile)
            .map_err(|e| ApiError::request_failed(StatusCode::BAD_REQUEST, e.to_string()))?;
        self.put("/profile", &body).await
    }

    async fn dispatch(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let token = self.store.bearer_token().ok_or(ApiError::Unauthenticated)?;

        let request_id = Uuid::new_v4();
        let url = format!("{}{}", self.base_url, path);

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        if body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        debug!(request_id = %request_id, method = verb.as_str(), path, "portal request");

        let payload = body.map(|b| b.to_string()).unwrap_or_default();
        let result = match verb {
            Verb::Get => self.http.get(&url, headers).await,
            Verb::Post => self.http.post(&url, headers, payload).await,
            Verb::Patch => self.http.patch(&url, headers, payload).await,
            Verb::Put => self.http.put(&url, headers, payload).await,
        };

        let response = result.map_err(|e| {
            warn!(request_id = %request_id, error = %e, "portal request failed to reach the backend");
            ApiError::NetworkUnavailable {
                message: e.to_string(),
            }
        })?;

        self.handle_response(request_id, response)
    }

    fn handle_response(
        &self,
        request_id: Uuid,
        response: SimpleHttpResponse,
    ) -> Result<Value, ApiError> {
        let status =
            StatusCode::from_u16(response.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session();
            return Err(ApiError::SessionExpired);
        }

        if !status.is_success() {
            debug!(request_id = %request_id, status = %status, "portal request rejected");
            return Err(ApiError::request_failed(status, response.text()));
        }

        let body = response.text();
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::request_failed(status, format!("invalid response body: {e}")))
    }

    /// The rejection cascade. `SessionStore::expire` is idempotent, so
    /// concurrent 401s perform the side effects exactly once.
    fn expire_session(&self) {
        if self.store.expire() {
            self.mirror.clear();
            self.events.publish(SessionEvent::SignedOut {
                reason: SignOutReason::Expired,
            });
            warn!("backend rejected the session token, session expired");
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| {
        ApiError::request_failed(StatusCode::OK, format!("unexpected response shape: {e}"))
    })
}
