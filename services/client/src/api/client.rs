//! services/client/src/api/client.rs
//!
//! The authenticated HTTP client. Turns typed calls into requests against one
//! configured origin, attaches the bearer token, and normalizes failures into
//! [`ClientError`].

use crate::config::{Config, RetryConfig};
use crate::error::{ClientError, ClientResult};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};
use weave_core::TokenStore;

/// Message used when an error body cannot be parsed at all.
const UNKNOWN_ERROR: &str = "Unknown error";

//=========================================================================================
// The Main Client Struct
//=========================================================================================

/// Client for the Weave backend.
///
/// Holds the bearer token in memory and mirrors it into the [`TokenStore`].
/// Concurrent calls are independent; nothing is de-duplicated.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
    token: RwLock<Option<String>>,
    tokens: TokenStore,
}

impl ApiClient {
    /// Builds a client for `config.base_url` with the configured timeout enforced.
    pub fn new(config: &Config, tokens: TokenStore) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
            token: RwLock::new(None),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    //-------------------------------------------------------------------------------------
    // Token lifecycle
    //-------------------------------------------------------------------------------------

    /// Pulls the persisted token into memory. Run once at startup.
    pub async fn load_token(&self) -> Option<String> {
        let token = self.tokens.load().await;
        *self.token.write() = token.clone();
        token
    }

    /// The token attached to outgoing requests, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// True while a token is held. Says nothing about whether the server still accepts it.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Assigns the token in memory, then persists it.
    ///
    /// The in-memory assignment happens first so a request issued right after
    /// login already carries it. A persistence failure is logged; the session
    /// keeps working for the lifetime of the process.
    pub(crate) async fn set_token(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
        if let Err(e) = self.tokens.save(token).await {
            error!("Failed to save auth token: {}", e);
        }
    }

    /// Drops the token from memory and storage. Memory is always cleared.
    pub(crate) async fn clear_token(&self) {
        *self.token.write() = None;
        if let Err(e) = self.tokens.clear().await {
            error!("Failed to clear auth token: {}", e);
        }
    }

    //-------------------------------------------------------------------------------------
    // Request plumbing
    //-------------------------------------------------------------------------------------

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub(crate) fn http_request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http.request(method, self.url(endpoint))
    }

    /// The bearer header, when a token is held.
    pub(crate) fn auth_headers(&self) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.token.read().as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::Internal(format!("invalid auth header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Default JSON headers plus auth.
    fn json_headers(&self) -> ClientResult<HeaderMap> {
        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// GET with the retry policy applied to transport failures.
    #[instrument(name = "api_get", skip(self))]
    pub(crate) async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<T> {
        let url = self.url(endpoint);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = self.http.get(&url).headers(self.json_headers()?);
            match self.execute(request, endpoint).await {
                Err(ClientError::Transport(e)) if attempt < self.retry.max_attempts => {
                    let delay = retry_delay(self.retry.base_delay, attempt);
                    warn!(
                        "GET {} failed (attempt {}/{}), retrying in {:?}: {}",
                        endpoint, attempt, self.retry.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// A single non-retried call with an optional JSON body.
    #[instrument(name = "api_send", skip(self, body))]
    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .http_request(method, endpoint)
            .headers(self.json_headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, endpoint).await
    }

    /// Body-less variant of [`ApiClient::send_json`].
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
    ) -> ClientResult<T> {
        self.send_json::<(), T>(method, endpoint, None).await
    }

    /// Sends a prepared request and applies the shared success/error contract.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> ClientResult<T> {
        debug!("Sending request to {}", endpoint);
        let response = request.send().await.map_err(|e| {
            error!("API request failed: {}: {}", endpoint, e);
            ClientError::Transport(e)
        })?;
        handle_response(response, endpoint).await
    }

    /// Races `fut` against `cancel`; a fired token wins with [`ClientError::Cancelled`].
    pub async fn cancellable<F, T>(&self, cancel: &CancellationToken, fut: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Request cancelled by caller");
                Err(ClientError::Cancelled)
            }
            result = fut => result,
        }
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`,
/// saturating at `Duration::MAX`.
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        .unwrap_or(Duration::MAX)
}

//=========================================================================================
// Response Handling
//=========================================================================================

async fn handle_response<T: DeserializeOwned>(response: Response, endpoint: &str) -> ClientResult<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
        error!("Failed to read response body: {}: {}", endpoint, e);
        ClientError::Transport(e)
    })?;

    if !status.is_success() {
        let message = error_message(status.as_u16(), &body);
        warn!("API error from {} ({}): {}", endpoint, status, message);
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    // Body-less successes decode as JSON `null`.
    let bytes: &[u8] = if body.iter().all(|b| b.is_ascii_whitespace()) {
        b"null"
    } else {
        &body
    };
    serde_json::from_slice(bytes).map_err(|e| {
        error!("Failed to decode response from {}: {}", endpoint, e);
        ClientError::Decode(e.to_string())
    })
}

/// Extracts the human message from an error body.
///
/// `{"detail": "..."}` is the contract. Validation errors carry a structured
/// `detail`, which is passed through as JSON text; some endpoints use
/// `message` instead.
pub(crate) fn error_message(status: u16, body: &[u8]) -> String {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return UNKNOWN_ERROR.to_string(),
    };

    let field = |name: &str| match value.get(name) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Null) | None => None,
        Some(serde_json::Value::String(_)) => None,
        Some(other) => Some(other.to_string()),
    };

    field("detail")
        .or_else(|| field("message"))
        .unwrap_or_else(|| format!("HTTP {}", status))
}
