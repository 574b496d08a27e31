// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for streamed chat completions.
//!
//! The payload of every `data:` line is a JSON chunk, except the literal
//! `[DONE]` sentinel that closes the stream.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use ghl_core::GhlError;
use ghl_core::error::DispatchErrorKind;

use crate::types::{ApiErrorDetail, ApiErrorResponse, CompletionChunk};

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Chunk(CompletionChunk),
    /// The `[DONE]` sentinel.
    Done,
    /// The vendor aborted the stream with an error payload.
    Error(ApiErrorDetail),
}

fn parse_data(data: &str) -> Result<StreamEvent, GhlError> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(StreamEvent::Done);
    }
    if let Ok(err) = serde_json::from_str::<ApiErrorResponse>(data) {
        return Ok(StreamEvent::Error(err.error));
    }
    serde_json::from_str(data).map(StreamEvent::Chunk).map_err(|e| {
        GhlError::dispatch(
            DispatchErrorKind::Unknown,
            format!("failed to parse completion chunk: {e}"),
        )
    })
}

/// Parses a streaming response into typed [`StreamEvent`]s.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, GhlError>> + Send>> {
    let mapped = response
        .bytes_stream()
        .eventsource()
        .filter_map(|result| async move {
            match result {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => Some(parse_data(&event.data)),
                Err(e) => Some(Err(GhlError::dispatch(
                    DispatchErrorKind::StreamInterrupted,
                    format!("SSE stream error: {e}"),
                ))),
            }
        });

    Box::pin(mapped)
}
