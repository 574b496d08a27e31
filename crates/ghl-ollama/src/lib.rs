// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama provider for the GHL assistant.
//!
//! Talks to the native `/api/chat` endpoint. Credentials for this provider
//! may carry an empty secret; nothing is sent for authentication.

pub mod client;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ghl_core::error::DispatchErrorKind;
use ghl_core::types::{
    AdapterType, ChatMessage, ChatOptions, ChatResponse, ChatStream, ChatStreamChunk,
    HealthStatus, TokenUsage,
};
use ghl_core::{GhlError, PluginAdapter, ProviderDispatch, ProviderSettings, ProviderType};
use tracing::debug;

use crate::client::{OllamaClient, StreamLine};
use crate::types::{OllamaMessage, OllamaOptions, OllamaRequest, OllamaResponse};

pub struct OllamaProvider {
    client: OllamaClient,
    model: String,
    defaults: ChatOptions,
}

impl OllamaProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, GhlError> {
        let client = OllamaClient::new(&settings)?;
        debug!(model = %settings.model, base_url = %settings.base_url, "Ollama provider initialized");
        Ok(Self {
            client,
            model: settings.model,
            defaults: settings.defaults,
        })
    }

    /// Registry factory.
    pub fn factory(settings: ProviderSettings) -> Result<Arc<dyn ProviderDispatch>, GhlError> {
        Ok(Arc::new(Self::new(settings)?))
    }

    fn to_request(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
        stream: bool,
    ) -> OllamaRequest {
        let options = options.or(&self.defaults);
        OllamaRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
                top_p: options.top_p,
                frequency_penalty: options.frequency_penalty,
                presence_penalty: options.presence_penalty,
            },
        }
    }
}

fn usage_of(response: &OllamaResponse) -> Option<TokenUsage> {
    match (response.prompt_eval_count, response.eval_count) {
        (None, None) => None,
        (input, output) => Some(TokenUsage::new(
            input.unwrap_or_default(),
            output.unwrap_or_default(),
        )),
    }
}

#[async_trait]
impl PluginAdapter for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, GhlError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GhlError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderDispatch for OllamaProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, GhlError> {
        let request = self.to_request(messages, options, false);
        let response = self.client.chat(&request).await?;
        Ok(ChatResponse {
            usage: usage_of(&response),
            content: response.message.map(|m| m.content).unwrap_or_default(),
            model: if response.model.is_empty() {
                self.model.clone()
            } else {
                response.model
            },
        })
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatStream, GhlError> {
        let request = self.to_request(messages, options, true);
        let lines = self.client.stream(&request).await?;

        let mut done = false;
        let chunks = lines
            .map(Some)
            .chain(stream::once(async { None }))
            .flat_map(move |item| {
                let mut out: Vec<Result<ChatStreamChunk, GhlError>> = Vec::new();
                if done {
                    return stream::iter(out);
                }
                match item {
                    Some(Ok(StreamLine::Response(line))) => {
                        if let Some(message) = &line.message {
                            if !message.content.is_empty() {
                                out.push(Ok(ChatStreamChunk::delta(message.content.clone())));
                            }
                        }
                        if line.done {
                            done = true;
                            if let Some(usage) = usage_of(&line) {
                                out.push(Ok(ChatStreamChunk::usage(usage)));
                            }
                            out.push(Ok(ChatStreamChunk::stop()));
                        }
                    }
                    Some(Ok(StreamLine::Error(message))) => {
                        done = true;
                        out.push(Err(GhlError::dispatch(
                            DispatchErrorKind::StreamInterrupted,
                            format!("Ollama aborted the stream: {message}"),
                        )));
                    }
                    Some(Err(e)) => {
                        done = true;
                        out.push(Err(e));
                    }
                    None => {
                        done = true;
                        out.push(Err(GhlError::dispatch(
                            DispatchErrorKind::StreamInterrupted,
                            "stream ended before the final line",
                        )));
                    }
                }
                stream::iter(out)
            });

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ghl_core::types::StreamEventType;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn provider(base_url: &str) -> OllamaProvider {
        OllamaProvider::new(ProviderSettings {
            provider_type: ProviderType::Ollama,
            api_key: SecretString::from(String::new()),
            model: "llama3.2".into(),
            defaults: ChatOptions {
                max_tokens: Some(128),
                ..Default::default()
            },
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            api_version: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn chat_maps_counts_and_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2",
                "stream": false,
                "options": {"num_predict": 128}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.2",
                "message": {"role": "assistant", "content": "hello"},
                "done": true,
                "prompt_eval_count": 5,
                "eval_count": 3
            })))
            .mount(&server)
            .await;

        let resp = provider(&server.uri())
            .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.content, "hello");
        assert_eq!(resp.usage, Some(TokenUsage::new(5, 3)));
    }

    #[tokio::test]
    async fn no_authorization_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(|req: &Request| !req.headers.contains_key("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.2",
                "message": {"role": "assistant", "content": "ok"},
                "done": true
            })))
            .mount(&server)
            .await;

        let resp = provider(&server.uri())
            .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.usage, None);
    }

    #[tokio::test]
    async fn unknown_model_is_invalid_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "model \"llama3.2\" not found, try pulling it first"
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        match err {
            GhlError::Dispatch(e) => {
                assert_eq!(e.kind, DispatchErrorKind::InvalidRequest);
                assert!(e.message.contains("try pulling it first"));
            }
            other => panic!("expected dispatch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_daemon_is_upstream_unavailable() {
        // Nothing listens on port 9 of localhost in the test environment.
        let err = provider("http://127.0.0.1:9")
            .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "got {err:?}");
    }

    #[tokio::test]
    async fn stream_emits_deltas_then_usage_and_stop() {
        let server = MockServer::start().await;
        let mut body = String::new();
        for word in ["one", " two", " three"] {
            body.push_str(
                &serde_json::json!({"model": "llama3.2", "message": {"role": "assistant", "content": word}, "done": false})
                    .to_string(),
            );
            body.push('\n');
        }
        body.push_str(
            &serde_json::json!({"model": "llama3.2", "message": {"role": "assistant", "content": ""},
                "done": true, "prompt_eval_count": 4, "eval_count": 3})
            .to_string(),
        );
        body.push('\n');

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-ndjson")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let chunks: Vec<ChatStreamChunk> = provider(&server.uri())
            .stream_chat(&[ChatMessage::user("count")], &ChatOptions::default())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        let kinds: Vec<StreamEventType> = chunks.iter().map(|c| c.event_type).collect();
        assert_eq!(
            kinds,
            vec![
                StreamEventType::Delta,
                StreamEventType::Delta,
                StreamEventType::Delta,
                StreamEventType::Usage,
                StreamEventType::Stop
            ]
        );
        assert_eq!(chunks[3].usage, Some(TokenUsage::new(4, 3)));
    }

    #[tokio::test]
    async fn error_line_interrupts_stream() {
        let server = MockServer::start().await;
        let body = format!(
            "{}\n{}\n",
            serde_json::json!({"message": {"role": "assistant", "content": "par"}, "done": false}),
            serde_json::json!({"error": "out of memory"})
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let items: Vec<_> = provider(&server.uri())
            .stream_chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().text.as_deref(), Some("par"));
        match &items[1] {
            Err(GhlError::Dispatch(e)) => {
                assert_eq!(e.kind, DispatchErrorKind::StreamInterrupted);
                assert!(e.message.contains("out of memory"));
            }
            other => panic!("expected StreamInterrupted, got {other:?}"),
        }
    }
}
