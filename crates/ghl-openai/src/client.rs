// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible Chat Completions endpoints.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use ghl_core::error::{DispatchError, DispatchErrorKind};
use ghl_core::{GhlError, ProviderSettings};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::sse::{self, StreamEvent};
use crate::types::{ApiErrorDetail, ApiErrorResponse, CompletionRequest, CompletionResponse};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// HTTP client bound to one credential and one base URL.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl OpenAiClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, GhlError> {
        let mut headers = HeaderMap::new();
        let mut auth =
            HeaderValue::from_str(&format!("Bearer {}", settings.api_key.expose_secret()))
                .map_err(|e| GhlError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GhlError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            max_retries: settings.max_retries,
        })
    }

    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, DispatchError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| {
            DispatchError::new(
                DispatchErrorKind::Unknown,
                format!("failed to parse API response: {e}"),
            )
        })
    }

    pub async fn stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent, GhlError>> + Send>>, DispatchError>
    {
        let response = self.send(request).await?;
        Ok(sse::parse_sse_stream(response))
    }

    async fn send(&self, req: &CompletionRequest) -> Result<reqwest::Response, DispatchError> {
        let mut attempt = 0;
        loop {
            let err = match self.client.post(&self.endpoint).json(req).send().await {
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

            if !err.is_retryable() || attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;
            warn!(attempt, error = %err, "transient error, will retry");
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
}

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

/// Maps a non-2xx response, letting the vendor's error code refine the status.
pub fn error_from_response(status: u16, body: &str) -> DispatchError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => {
            let mut err = DispatchError::from_status(
                status,
                format!("API error: {}", api_err.error.message),
            );
            if let Some(kind) = refine_kind(&api_err.error) {
                err.kind = kind;
            }
            err
        }
        Err(_) => DispatchError::from_status(status, format!("API returned {status}: {body}")),
    }
}

/// Codes and types that carry more information than the status alone.
pub fn refine_kind(detail: &ApiErrorDetail) -> Option<DispatchErrorKind> {
    let code = detail.code_str().or(detail.type_.as_deref())?;
    match code {
        "invalid_api_key" | "authentication_error" | "permission_denied" => {
            Some(DispatchErrorKind::AuthRejected)
        }
        "insufficient_quota" | "rate_limit_exceeded" | "tokens" => {
            Some(DispatchErrorKind::RateLimited)
        }
        "model_not_found" | "context_length_exceeded" | "invalid_request_error" => {
            Some(DispatchErrorKind::InvalidRequest)
        }
        "server_error" | "service_unavailable" => Some(DispatchErrorKind::UpstreamUnavailable),
        _ => None,
    }
}
