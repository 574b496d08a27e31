// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for Anthropic Messages API streaming responses.
//!
//! Converts a reqwest response byte stream into typed [`StreamEvent`] variants
//! using the `eventsource-stream` crate for SSE protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use ghl_core::error::DispatchErrorKind;
use ghl_core::GhlError;
use serde::de::DeserializeOwned;

use crate::types::{SseContentBlockDelta, SseError, SseMessageDelta, SseMessageStart};

/// Typed SSE events from the Anthropic streaming protocol.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Initial message metadata (id, model, input usage).
    MessageStart(SseMessageStart),
    /// Incremental update to a content block.
    ContentBlockDelta(SseContentBlockDelta),
    /// Message-level delta (stop_reason, output usage).
    MessageDelta(SseMessageDelta),
    /// The message is complete.
    MessageStop,
    /// API error during streaming.
    Error(SseError),
}

fn parse<T: DeserializeOwned>(name: &str, data: &str) -> Result<T, GhlError> {
    serde_json::from_str(data).map_err(|e| {
        GhlError::dispatch(
            DispatchErrorKind::Unknown,
            format!("failed to parse {name} event: {e}"),
        )
    })
}

/// Parses a reqwest streaming response into a stream of typed [`StreamEvent`]s.
///
/// Block start/stop and ping events carry nothing the chat contract needs and
/// are skipped, as are event types this parser does not know. A transport
/// error mid-body becomes `StreamInterrupted`.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, GhlError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let parsed = match event.event.as_str() {
                    "message_start" => {
                        parse(&event.event, &event.data).map(StreamEvent::MessageStart)
                    }
                    "content_block_delta" => {
                        parse(&event.event, &event.data).map(StreamEvent::ContentBlockDelta)
                    }
                    "message_delta" => {
                        parse(&event.event, &event.data).map(StreamEvent::MessageDelta)
                    }
                    "message_stop" => Ok(StreamEvent::MessageStop),
                    "error" => parse(&event.event, &event.data).map(StreamEvent::Error),
                    _ => return None,
                };
                Some(parsed)
            }
            Err(e) => Some(Err(GhlError::dispatch(
                DispatchErrorKind::StreamInterrupted,
                format!("SSE stream error: {e}"),
            ))),
        }
    });

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SseDelta;

    /// Serves raw SSE text through wiremock to get a real reqwest::Response.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parse_content_block_delta() {
        let sse = "event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        let event = stream.next().await.unwrap().unwrap();
        match event {
            StreamEvent::ContentBlockDelta(delta) => {
                assert_eq!(delta.index, 0);
                assert!(matches!(delta.delta, SseDelta::TextDelta { ref text } if text == "Hello"));
            }
            other => panic!("expected ContentBlockDelta, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn skips_ping_and_unknown_events() {
        let sse = concat!(
            "event: ping\ndata: {\"type\":\"ping\"}\n\n",
            "event: content_block_start\ndata: {\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
            "event: future_event\ndata: {}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        );
        let response = mock_sse_response(sse).await;
        let events: Vec<_> = parse_sse_stream(response).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::MessageStop)));
    }

    #[tokio::test]
    async fn parse_error_event() {
        let sse = "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);
        match stream.next().await.unwrap().unwrap() {
            StreamEvent::Error(err) => assert_eq!(err.error.type_, "overloaded_error"),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error_item() {
        let sse = "event: message_delta\ndata: {not json}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);
        assert!(stream.next().await.unwrap().is_err());
    }
}
