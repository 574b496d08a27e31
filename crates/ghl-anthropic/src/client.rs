// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Provides [`AnthropicClient`] which handles request construction,
//! authentication, streaming SSE responses, transient error retry, and the
//! mapping of vendor failures into [`DispatchError`].

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use ghl_core::error::{DispatchError, DispatchErrorKind};
use ghl_core::{GhlError, ProviderSettings};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::sse::{self, StreamEvent};
use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// API version sent when the settings carry none.
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Pause between in-adapter retries.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// HTTP client for Anthropic API communication.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl AnthropicClient {
    /// Builds a client with the credential's key and version headers baked in.
    pub fn new(settings: &ProviderSettings) -> Result<Self, GhlError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(settings.api_key.expose_secret())
            .map_err(|e| GhlError::Config(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        let version = settings
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_API_VERSION);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(version).map_err(|e| {
                GhlError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GhlError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/messages", settings.base_url.trim_end_matches('/')),
            max_retries: settings.max_retries,
        })
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, DispatchError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.send(&req).await?;
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| {
            DispatchError::new(
                DispatchErrorKind::Unknown,
                format!("failed to parse API response: {e}"),
            )
        })
    }

    /// Sends a streaming request and returns a stream of SSE events.
    pub async fn stream_message(
        &self,
        request: &MessageRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent, GhlError>> + Send>>, DispatchError>
    {
        let mut req = request.clone();
        req.stream = true;
        let response = self.send(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// POSTs the request, retrying transient failures up to `max_retries`.
    async fn send(&self, req: &MessageRequest) -> Result<reqwest::Response, DispatchError> {
        let mut attempt = 0;
        loop {
            let result = match self.client.post(&self.endpoint).json(req).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(status = %response.status(), attempt, "response received");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    error_from_response(status, &body)
                }
                Err(e) => transport_error(e),
            };

            if !result.is_retryable() || attempt >= self.max_retries {
                return Err(result);
            }
            attempt += 1;
            warn!(attempt, error = %result, "transient error, will retry");
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
}

/// Maps a reqwest failure that produced no HTTP status.
pub fn transport_error(e: reqwest::Error) -> DispatchError {
    let kind = if e.is_timeout() {
        DispatchErrorKind::Timeout
    } else if e.is_connect() {
        DispatchErrorKind::UpstreamUnavailable
    } else {
        DispatchErrorKind::Unknown
    };
    DispatchError::new(kind, format!("HTTP request failed: {e}"))
}

/// Maps a non-2xx response. The vendor's error type refines the status.
pub fn error_from_response(status: u16, body: &str) -> DispatchError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => {
            let mut err = DispatchError::from_status(
                status,
                format!(
                    "Anthropic API error ({}): {}",
                    api_err.error.type_, api_err.error.message
                ),
            );
            if let Some(kind) = kind_for_error_type(&api_err.error.type_) {
                err.kind = kind;
            }
            err
        }
        Err(_) => DispatchError::from_status(status, format!("API returned {status}: {body}")),
    }
}

/// Classification of Anthropic's documented error types.
pub fn kind_for_error_type(error_type: &str) -> Option<DispatchErrorKind> {
    match error_type {
        "authentication_error" | "permission_error" => Some(DispatchErrorKind::AuthRejected),
        "rate_limit_error" => Some(DispatchErrorKind::RateLimited),
        "overloaded_error" | "api_error" => Some(DispatchErrorKind::UpstreamUnavailable),
        "invalid_request_error" | "not_found_error" | "request_too_large" => {
            Some(DispatchErrorKind::InvalidRequest)
        }
        "timeout_error" => Some(DispatchErrorKind::Timeout),
        _ => None,
    }
}
