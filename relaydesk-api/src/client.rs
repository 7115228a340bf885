//! Gateway HTTP client
//!
//! Every gateway endpoint answers with the same envelope:
//! `{ "code": 0, "message": "...", "data": ... }`. [`ApiClient`] unwraps it, attaches the
//! bearer token read from the session store and maps failures onto [`RelayDeskError`].

use relaydesk_core::{
    ApiConfig, DurableStore, ErrorContext, RelayDeskError, RelayDeskResult, AUTH_TOKEN_KEY,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for the gateway client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// API root, e.g. `http://localhost:8080/api/v1`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Additional headers
    pub headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for ApiClientConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_seconds: config.timeout_seconds,
            user_agent: config.user_agent.clone(),
            headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set additional header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Response envelope shared by all gateway endpoints
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// HTTP client for the gateway API
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
    token_store: Option<Arc<dyn DurableStore>>,
}

impl ApiClient {
    /// Create a client that sends requests without credentials
    pub fn new(config: ApiClientConfig) -> RelayDeskResult<Self> {
        let client = create_http_client(&config)?;
        debug!("Created gateway client for {}", config.base_url);

        Ok(Self {
            client,
            config,
            token_store: None,
        })
    }

    /// Read the bearer token from `store` on every request
    pub fn with_token_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// GET `path` with the given query pairs and unwrap the envelope
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> RelayDeskResult<T> {
        let request = self.client.get(self.url(path)).query(query);
        self.execute(request, "GET", path).await
    }

    /// POST a JSON body to `path` and unwrap the envelope
    pub async fn post<B, T>(&self, path: &str, body: &B) -> RelayDeskResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        self.execute(request, "POST", path).await
    }

    /// POST without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> RelayDeskResult<T> {
        let request = self.client.post(self.url(path));
        self.execute(request, "POST", path).await
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn bearer_token(&self) -> Option<String> {
        let store = self.token_store.as_ref()?;
        match store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read access token, sending request without it");
                None
            }
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        mut request: reqwest::RequestBuilder,
        method: &str,
        path: &str,
    ) -> RelayDeskResult<T> {
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token);
        }

        debug!("{} {}", method, path);

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e, method, path))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, method, path))?;

        if !status.is_success() {
            return Err(status_error(status, &body, path));
        }

        let envelope: Envelope = serde_json::from_str(&body)?;
        if envelope.code != 0 {
            return Err(gateway_error(
                status.as_u16(),
                Some(envelope.code),
                envelope.message,
                path,
            ));
        }

        Ok(serde_json::from_value(envelope.data)?)
    }

    fn transport_error(&self, error: reqwest::Error, method: &str, path: &str) -> RelayDeskError {
        if error.is_timeout() {
            return RelayDeskError::Timeout {
                operation: format!("{} {}", method, path),
                duration_ms: self.config.timeout_seconds * 1000,
                context: ErrorContext::new("api_client")
                    .with_operation("execute")
                    .with_suggestion("Increase api.timeout_seconds")
                    .with_suggestion("Check gateway availability"),
            };
        }

        RelayDeskError::Network {
            message: format!("Failed to reach {}: {}", self.url(path), error),
            source: Some(Box::new(error)),
            context: ErrorContext::new("api_client")
                .with_operation("execute")
                .with_metadata("path", path)
                .with_suggestion("Check api.base_url and network connectivity"),
        }
    }
}

/// Drop query pairs whose value is absent or empty
pub fn clean_query<'a>(params: Vec<(&'a str, Option<String>)>) -> Vec<(&'a str, String)> {
    params
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect()
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(config: &ApiClientConfig) -> RelayDeskResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            RelayDeskError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    for (key, value) in &config.headers {
        let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            RelayDeskError::Config {
                message: format!("Invalid header name '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?;

        let header_value =
            reqwest::header::HeaderValue::from_str(value).map_err(|e| RelayDeskError::Config {
                message: format!("Invalid header value for '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        headers.insert(header_name, header_value);
    }

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| RelayDeskError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

/// Map a non-2xx response onto an `Http` error.
///
/// The message comes from the envelope when the body carries one, else the raw body, else
/// the canonical reason phrase.
fn status_error(status: reqwest::StatusCode, body: &str, path: &str) -> RelayDeskError {
    let envelope = serde_json::from_str::<Envelope>(body).ok();
    let code = envelope.as_ref().map(|e| e.code);
    let message = match envelope {
        Some(envelope) if !envelope.message.is_empty() => envelope.message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    };

    gateway_error(status.as_u16(), code, message, path)
}

fn gateway_error(status: u16, code: Option<i64>, message: String, path: &str) -> RelayDeskError {
    let mut error = RelayDeskError::http(status, message, "api_client");
    if let RelayDeskError::Http { context, .. } = &mut error {
        context.metadata.insert("path".to_string(), path.to_string());
        if let Some(code) = code {
            context.metadata.insert("code".to_string(), code.to_string());
        }
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_api_config() {
        let api = ApiConfig {
            base_url: "https://relay.example.com/api/v1/".to_string(),
            timeout_seconds: 5,
            user_agent: "relaydesk-test".to_string(),
        };
        let config = ApiClientConfig::from(&api).with_header("X-Trace".into(), "1".into());
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.headers.get("X-Trace").map(String::as_str), Some("1"));

        let client = ApiClient::new(config).unwrap();
        assert_eq!(client.url("/auth/me"), "https://relay.example.com/api/v1/auth/me");
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let config = ApiClientConfig::new("http://localhost")
            .with_header("bad header".into(), "x".into());
        assert!(matches!(
            ApiClient::new(config),
            Err(RelayDeskError::Config { .. })
        ));
    }

    #[test]
    fn test_clean_query_drops_empty_values() {
        let query = clean_query(vec![
            ("page", Some("1".to_string())),
            ("model", Some(String::new())),
            ("platform", None),
            ("user_id", Some("7".to_string())),
        ]);
        assert_eq!(
            query,
            vec![("page", "1".to_string()), ("user_id", "7".to_string())]
        );
    }

    #[test]
    fn test_status_error_message_sources() {
        let enveloped = status_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"code":401,"message":"token expired"}"#,
            "/auth/me",
        );
        assert!(enveloped.is_credential_rejected());
        assert_eq!(enveloped.to_string(), "HTTP 401: token expired");
        let context = enveloped.context().unwrap();
        assert_eq!(context.metadata.get("code").map(String::as_str), Some("401"));

        let plain = status_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down", "/x");
        assert_eq!(plain.to_string(), "HTTP 502: upstream down");

        let empty = status_error(reqwest::StatusCode::NOT_FOUND, "", "/x");
        assert_eq!(empty.to_string(), "HTTP 404: Not Found");
    }
}
