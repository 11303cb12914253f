// crates/migrate-preflight-cloud/src/transport.rs
// ============================================================================
// Module: Management API Transport
// Description: Authenticated REST transport with pagination and retries.
// Purpose: Issue bounded, classified requests against the control plane.
// Dependencies: migrate-preflight-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! The transport owns the HTTP client and its connection pool, reuses
//! bearer tokens until shortly before expiry, classifies response statuses
//! into the cloud failure taxonomy, and follows `value`/`nextLink`
//! pagination. Every request honors the caller's cancellation token both as
//! a pre-flight gate and as a per-request timeout bound.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use migrate_preflight_core::BearerToken;
use migrate_preflight_core::CallContext;
use migrate_preflight_core::CloudError;
use migrate_preflight_core::RequestId;
use migrate_preflight_core::Timestamp;
use migrate_preflight_core::TokenSource;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use serde_json::Value;
use url::Url;

use crate::retry::CallFailure;
use crate::retry::RetryPolicy;
use crate::retry::RetryableKind;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default management endpoint.
const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
/// Token refresh margin before the reported expiry.
const TOKEN_EXPIRY_MARGIN_MS: i64 = 60_000;
/// Bytes of an error body preserved into failure reasons.
const MAX_ERROR_BODY_BYTES: usize = 512;

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ArmTransportConfig {
    /// Management endpoint base URL.
    pub endpoint: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// User agent for outbound requests.
    pub user_agent: String,
    /// Retry policy applied per call.
    pub retry: RetryPolicy,
}

impl Default for ArmTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_ms: 30_000,
            user_agent: "migrate-preflight/0.1".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Authenticated transport over the management REST API.
pub struct ArmTransport {
    /// Shared HTTP client owning the connection pool.
    client: Client,
    /// Parsed endpoint base.
    endpoint: Url,
    /// External credential capability.
    credential: Arc<dyn TokenSource>,
    /// Cached bearer token, reused until near expiry.
    token: Mutex<Option<BearerToken>>,
    /// Per-request timeout.
    request_timeout: Duration,
    /// Retry policy.
    retry: RetryPolicy,
}

impl ArmTransport {
    /// Creates a transport over the given credential.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::Network`] when the HTTP client or endpoint
    /// cannot be constructed.
    pub fn new(
        credential: Arc<dyn TokenSource>,
        config: ArmTransportConfig,
    ) -> Result<Self, CloudError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| CloudError::Network {
                reason: format!("http client build failed: {err}"),
            })?;
        let endpoint = Url::parse(&config.endpoint).map_err(|err| CloudError::Network {
            reason: format!("invalid endpoint: {err}"),
        })?;
        Ok(Self {
            client,
            endpoint,
            credential,
            token: Mutex::new(None),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            retry: config.retry,
        })
    }

    /// Issues a GET and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] per the failure taxonomy.
    pub fn get_json(
        &self,
        ctx: &CallContext,
        path: &str,
        api_version: &str,
    ) -> Result<Value, CloudError> {
        let url = self.build_url(path, api_version)?;
        self.execute(ctx, Method::GET, url, None)
    }

    /// Issues a PUT with a JSON body and parses the response.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] per the failure taxonomy.
    pub fn put_json(
        &self,
        ctx: &CallContext,
        path: &str,
        api_version: &str,
        body: &Value,
    ) -> Result<Value, CloudError> {
        let url = self.build_url(path, api_version)?;
        self.execute(ctx, Method::PUT, url, Some(body))
    }

    /// Issues a POST with a JSON body and parses the response.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] per the failure taxonomy.
    pub fn post_json(
        &self,
        ctx: &CallContext,
        path: &str,
        api_version: &str,
        body: &Value,
    ) -> Result<Value, CloudError> {
        let url = self.build_url(path, api_version)?;
        self.execute(ctx, Method::POST, url, Some(body))
    }

    /// Issues a GET and collects every page's `value` entries, following
    /// `nextLink` until exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] per the failure taxonomy.
    pub fn get_paged(
        &self,
        ctx: &CallContext,
        path: &str,
        api_version: &str,
    ) -> Result<Vec<Value>, CloudError> {
        let mut items = Vec::new();
        let mut next = Some(self.build_url(path, api_version)?);
        while let Some(url) = next {
            let page = self.execute(ctx, Method::GET, url, None)?;
            match page.get("value").and_then(Value::as_array) {
                Some(values) => items.extend(values.iter().cloned()),
                None => {
                    // Single-item responses have no pagination envelope.
                    items.push(page.clone());
                }
            }
            next = match page.get("nextLink").and_then(Value::as_str) {
                Some(link) => Some(Url::parse(link).map_err(|err| CloudError::Malformed {
                    reason: format!("invalid nextLink: {err}"),
                    request_id: None,
                })?),
                None => None,
            };
        }
        Ok(items)
    }

    /// Builds the request URL, appending `api-version` unless present.
    fn build_url(&self, path: &str, api_version: &str) -> Result<Url, CloudError> {
        let mut url = self.endpoint.join(path).map_err(|err| CloudError::Malformed {
            reason: format!("invalid request path '{path}': {err}"),
            request_id: None,
        })?;
        let has_version = url.query_pairs().any(|(key, _)| key == "api-version");
        if !has_version {
            url.query_pairs_mut().append_pair("api-version", api_version);
        }
        Ok(url)
    }

    /// Executes one call under the retry policy.
    fn execute(
        &self,
        ctx: &CallContext,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, CloudError> {
        self.retry.run(&ctx.cancel, || {
            let token = match self.bearer() {
                Ok(token) => token,
                Err(err) => return Err(CallFailure::Fatal(err)),
            };
            let timeout = match ctx.cancel.remaining() {
                Some(remaining) if remaining < self.request_timeout => remaining,
                _ => self.request_timeout,
            };
            if timeout.is_zero() {
                return Err(CallFailure::Fatal(CloudError::Cancelled));
            }
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(&token)
                .timeout(timeout);
            if let Some(body) = body {
                request = request.json(body);
            }
            match request.send() {
                Ok(response) => classify(&url, response),
                Err(err) => Err(CallFailure::Retryable {
                    kind: RetryableKind::Network,
                    reason: err.to_string(),
                    request_id: None,
                }),
            }
        })
    }

    /// Returns a bearer token, reusing the cached one until near expiry.
    fn bearer(&self) -> Result<String, CloudError> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref()
            && token_is_fresh(token)
        {
            return Ok(token.token.clone());
        }
        let token = self.credential.bearer_token()?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Returns true while a token is safely inside its expiry margin.
fn token_is_fresh(token: &BearerToken) -> bool {
    match token.expires_at {
        None => true,
        Some(expires_at) => {
            Timestamp::now().as_unix_millis() + TOKEN_EXPIRY_MARGIN_MS
                < expires_at.as_unix_millis()
        }
    }
}

// ============================================================================
// SECTION: Response Classification
// ============================================================================

/// Maps a response to a parsed body or a classified failure.
fn classify(url: &Url, response: Response) -> Result<Value, CallFailure> {
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-ms-request-id")
        .and_then(|value| value.to_str().ok())
        .map(RequestId::new);

    if status.is_success() {
        let text = response.text().map_err(|err| CallFailure::Retryable {
            kind: RetryableKind::Network,
            reason: format!("failed to read response body: {err}"),
            request_id: request_id.clone(),
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&text).map_err(|err| {
            CallFailure::Fatal(CloudError::Malformed {
                reason: format!("response is not valid json: {err}"),
                request_id,
            })
        });
    }

    let reason = error_reason(status, response);
    match status {
        StatusCode::NOT_FOUND => Err(CallFailure::Fatal(CloudError::NotFound {
            resource: url.path().to_string(),
            request_id,
        })),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(CallFailure::Fatal(CloudError::Forbidden {
                scope: url.path().to_string(),
                request_id,
            }))
        }
        StatusCode::TOO_MANY_REQUESTS => Err(CallFailure::Retryable {
            kind: RetryableKind::Throttled,
            reason,
            request_id,
        }),
        StatusCode::REQUEST_TIMEOUT => Err(CallFailure::Retryable {
            kind: RetryableKind::Transient,
            reason,
            request_id,
        }),
        status if status.is_server_error() => Err(CallFailure::Retryable {
            kind: RetryableKind::Transient,
            reason,
            request_id,
        }),
        _ => Err(CallFailure::Fatal(CloudError::Malformed {
            reason,
            request_id,
        })),
    }
}

/// Renders a bounded failure reason from an error response.
fn error_reason(status: StatusCode, response: Response) -> String {
    let body = response.text().unwrap_or_default();
    let trimmed: String = body.chars().take(MAX_ERROR_BODY_BYTES).collect();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {trimmed}")
    }
}
