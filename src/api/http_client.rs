use anyhow::Result;
use reqwest;
use std::collections::HashMap;

/// HTTP method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
    PATCH,
    PUT,
}

/// A very simple version that only holds response data
#[derive(Debug, Clone)]
pub struct SimpleHttpResponse {
    /// HTTP status code
    status_code: u16,
    /// Response body
    body: String,
}

impl SimpleHttpResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status_code: status,
            body: body.into(),
        }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status_code
    }

    /// Get a reference to the response body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Get the body as text (consumes the response)
    pub fn text(self) -> String {
        self.body
    }

    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Check if successful (2xx status)
    pub fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// Trait for HTTP client operations, allowing for mocking
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform HTTP GET request and return a SimpleHttpResponse
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> Result<SimpleHttpResponse>;

    /// Perform HTTP POST request and return a SimpleHttpResponse
    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse>;

    /// Perform HTTP PATCH request and return a SimpleHttpResponse
    async fn patch(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse>;

    /// Perform HTTP PUT request and return a SimpleHttpResponse
    async fn put(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse>;
}

/// Implementation of HttpClient using reqwest
pub struct ReqwestHttpClient {
    /// Internal reqwest client
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new client with custom configuration
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
        headers: HashMap<String, String>,
    ) -> Result<SimpleHttpResponse> {
        let mut request = request;
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(SimpleHttpResponse::new(status, body))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> Result<SimpleHttpResponse> {
        self.dispatch(self.client.get(url), headers).await
    }

    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse> {
        self.dispatch(self.client.post(url).body(body), headers).await
    }

    async fn patch(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse> {
        self.dispatch(self.client.patch(url).body(body), headers).await
    }

    async fn put(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse> {
        self.dispatch(self.client.put(url).body(body), headers).await
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockHttpClient;
    use super::*;

    #[tokio::test]
    async fn mock_client_returns_configured_responses() -> Result<()> {
        let client = MockHttpClient::new();
        client.mock_response("https://example.com/api", 200, "Hello, world!");
        client.mock_json(
            "https://example.com/api/json",
            200,
            &serde_json::json!({"ok": true}),
        )?;

        let response = client.get("https://example.com/api", HashMap::new()).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text(), "Hello, world!");

        let response = client
            .get("https://example.com/api/json", HashMap::new())
            .await?;
        let json: serde_json::Value = response.json()?;
        assert_eq!(json["ok"], true);

        let missing = client
            .get("https://example.com/not-found", HashMap::new())
            .await;
        assert!(missing.is_err());

        assert_eq!(client.request_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn mock_client_simulates_transport_failure() {
        let client = MockHttpClient::new();
        client.mock_response("https://example.com/api", 200, "ok");
        client.fail_with("connection reset");

        let result = client.get("https://example.com/api", HashMap::new()).await;
        assert!(result.is_err());
    }
}
