// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a local or remote Ollama daemon.
//!
//! Streamed responses are newline-delimited JSON, one [`OllamaResponse`] per
//! line, rather than SSE.

use std::pin::Pin;
use std::time::Duration;

use bytes::BytesMut;
use futures::stream::{self, Stream, StreamExt};
use ghl_core::error::{DispatchError, DispatchErrorKind};
use ghl_core::{GhlError, ProviderSettings};
use tracing::{debug, warn};

use crate::types::{OllamaError, OllamaRequest, OllamaResponse};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Largest partial line held while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// One parsed NDJSON line.
#[derive(Debug, Clone)]
pub enum StreamLine {
    Response(OllamaResponse),
    Error(String),
}

pub type LineStream = Pin<Box<dyn Stream<Item = Result<StreamLine, GhlError>> + Send>>;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl OllamaClient {
    /// No authentication header is sent; the daemon has none.
    pub fn new(settings: &ProviderSettings) -> Result<Self, GhlError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GhlError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", settings.base_url.trim_end_matches('/')),
            max_retries: settings.max_retries,
        })
    }

    pub async fn chat(&self, request: &OllamaRequest) -> Result<OllamaResponse, DispatchError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| {
            DispatchError::new(
                DispatchErrorKind::Unknown,
                format!("failed to parse Ollama response: {e}"),
            )
        })
    }

    pub async fn stream(&self, request: &OllamaRequest) -> Result<LineStream, DispatchError> {
        let response = self.send(request).await?;
        Ok(parse_ndjson_stream(response))
    }

    async fn send(&self, req: &OllamaRequest) -> Result<reqwest::Response, DispatchError> {
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
                    let detail = serde_json::from_str::<OllamaError>(&body)
                        .map(|e| e.error)
                        .unwrap_or(body);
                    DispatchError::from_status(status, format!("Ollama returned {status}: {detail}"))
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

fn parse_line(line: &[u8]) -> Result<StreamLine, GhlError> {
    if let Ok(err) = serde_json::from_slice::<OllamaError>(line) {
        return Ok(StreamLine::Error(err.error));
    }
    serde_json::from_slice(line).map(StreamLine::Response).map_err(|e| {
        GhlError::dispatch(
            DispatchErrorKind::Unknown,
            format!("failed to parse Ollama stream line: {e}"),
        )
    })
}

/// Splits complete lines off the front of `buffer`.
fn drain_lines(buffer: &mut BytesMut) -> Vec<Result<StreamLine, GhlError>> {
    let mut out = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line = buffer.split_to(pos + 1);
        let trimmed = line.trim_ascii();
        if !trimmed.is_empty() {
            out.push(parse_line(trimmed));
        }
    }
    out
}

/// Appends one network chunk and drains the complete lines. A partial line
/// that outgrows [`MAX_LINE_BYTES`] is discarded and reported as
/// `StreamInterrupted`; the flag then stays set.
fn push_chunk(
    buffer: &mut BytesMut,
    bytes: &[u8],
    overflowed: &mut bool,
) -> Vec<Result<StreamLine, GhlError>> {
    if *overflowed {
        return Vec::new();
    }
    buffer.extend_from_slice(bytes);
    let mut out = drain_lines(buffer);
    if buffer.len() > MAX_LINE_BYTES {
        *overflowed = true;
        warn!(buffered = buffer.len(), "Ollama stream line exceeded the size limit");
        buffer.clear();
        out.push(Err(GhlError::dispatch(
            DispatchErrorKind::StreamInterrupted,
            format!("Ollama stream line exceeded {MAX_LINE_BYTES} bytes without a newline"),
        )));
    }
    out
}

/// Re-frames the response body into NDJSON lines. A line may span several
/// network chunks; a trailing line without a newline is flushed at the end.
pub fn parse_ndjson_stream(response: reqwest::Response) -> LineStream {
    let mut buffer = BytesMut::new();
    let mut overflowed = false;
    let lines = response
        .bytes_stream()
        .map(Some)
        .chain(stream::once(async { None }))
        .flat_map(move |item| {
            let out = match item {
                Some(Ok(bytes)) => push_chunk(&mut buffer, &bytes, &mut overflowed),
                Some(Err(e)) => vec![Err(GhlError::dispatch(
                    DispatchErrorKind::StreamInterrupted,
                    format!("Ollama stream error: {e}"),
                ))],
                None => {
                    let rest = buffer.split();
                    let trimmed = rest.trim_ascii();
                    if trimmed.is_empty() {
                        Vec::new()
                    } else {
                        vec![parse_line(trimmed)]
                    }
                }
            };
            stream::iter(out)
        });
    Box::pin(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_split_across_chunks_are_joined() {
        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(b"{\"message\":{\"role\":\"assistant\",\"content\":\"He");
        assert!(drain_lines(&mut buffer).is_empty());

        buffer.extend_from_slice(b"llo\"},\"done\":false}\n\n{\"done\":true");
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines.len(), 1);
        match &lines[0] {
            Ok(StreamLine::Response(r)) => {
                assert_eq!(r.message.as_ref().unwrap().content, "Hello");
                assert!(!r.done);
            }
            other => panic!("expected response line, got {other:?}"),
        }
        assert_eq!(&buffer[..], b"{\"done\":true");
    }

    #[test]
    fn oversized_partial_line_interrupts_once() {
        let mut buffer = BytesMut::new();
        let mut overflowed = false;
        let big = vec![b'x'; MAX_LINE_BYTES / 2 + 1];

        assert!(push_chunk(&mut buffer, &big, &mut overflowed).is_empty());
        let out = push_chunk(&mut buffer, &big, &mut overflowed);
        assert_eq!(out.len(), 1);
        match &out[0] {
            Err(GhlError::Dispatch(e)) => {
                assert_eq!(e.kind, DispatchErrorKind::StreamInterrupted)
            }
            other => panic!("expected StreamInterrupted, got {other:?}"),
        }
        assert!(overflowed);
        assert!(buffer.is_empty());

        assert!(push_chunk(&mut buffer, b"{\"done\":true}\n", &mut overflowed).is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn complete_lines_before_the_limit_still_parse() {
        let mut buffer = BytesMut::new();
        let mut overflowed = false;
        let out = push_chunk(&mut buffer, b"{\"done\":true}\n{\"do", &mut overflowed);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_ok());
        assert!(!overflowed);
        assert_eq!(&buffer[..], b"{\"do");
    }

    #[test]
    fn error_lines_are_recognized() {
        match parse_line(br#"{"error":"model runner crashed"}"#) {
            Ok(StreamLine::Error(msg)) => assert_eq!(msg, "model runner crashed"),
            other => panic!("expected error line, got {other:?}"),
        }
    }
}
