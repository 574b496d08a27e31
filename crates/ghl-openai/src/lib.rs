// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider for the GHL assistant.
//!
//! One implementation serves the `openai`, `groq`, and `together` provider
//! tags; they differ only in base URL and in how streamed usage is reported.

pub mod client;
pub mod sse;
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

use crate::client::OpenAiClient;
use crate::sse::StreamEvent;
use crate::types::{ApiMessage, CompletionRequest, StreamOptions};

/// Chat Completions provider implementing [`ProviderDispatch`].
pub struct OpenAiProvider {
    client: OpenAiClient,
    provider_type: ProviderType,
    model: String,
    defaults: ChatOptions,
}

impl OpenAiProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, GhlError> {
        if !matches!(
            settings.provider_type,
            ProviderType::OpenAi | ProviderType::Groq | ProviderType::Together
        ) {
            return Err(GhlError::Config(format!(
                "{} is not served by the OpenAI-compatible provider",
                settings.provider_type
            )));
        }
        let client = OpenAiClient::new(&settings)?;
        debug!(provider = %settings.provider_type, model = %settings.model, "OpenAI-compatible provider initialized");
        Ok(Self {
            client,
            provider_type: settings.provider_type,
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
    ) -> CompletionRequest {
        let options = options.or(&self.defaults);
        CompletionRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            stream,
            stream_options: (stream && self.provider_type == ProviderType::OpenAi)
                .then_some(StreamOptions {
                    include_usage: true,
                }),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        match self.provider_type {
            ProviderType::Groq => "groq",
            ProviderType::Together => "together",
            _ => "openai",
        }
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
impl ProviderDispatch for OpenAiProvider {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
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
        let response = self.client.complete(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            model: response.model,
        })
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatStream, GhlError> {
        let request = self.to_request(messages, options, true);
        let events = self.client.stream(&request).await?;

        let mut done = false;
        let chunks = events
            .map(Some)
            .chain(stream::once(async { None }))
            .flat_map(move |item| {
                let out: Vec<Result<ChatStreamChunk, GhlError>> = if done {
                    Vec::new()
                } else {
                    match item {
                        Some(Ok(StreamEvent::Chunk(chunk))) => {
                            let mut out = Vec::new();
                            for choice in &chunk.choices {
                                if let Some(text) = &choice.delta.content {
                                    if !text.is_empty() {
                                        out.push(Ok(ChatStreamChunk::delta(text.clone())));
                                    }
                                }
                            }
                            if let Some(u) = chunk.reported_usage() {
                                out.push(Ok(ChatStreamChunk::usage(TokenUsage::new(
                                    u.prompt_tokens,
                                    u.completion_tokens,
                                ))));
                            }
                            out
                        }
                        Some(Ok(StreamEvent::Done)) => {
                            done = true;
                            vec![Ok(ChatStreamChunk::stop())]
                        }
                        Some(Ok(StreamEvent::Error(detail))) => {
                            done = true;
                            vec![Err(GhlError::dispatch(
                                DispatchErrorKind::StreamInterrupted,
                                format!("stream aborted by vendor: {}", detail.message),
                            ))]
                        }
                        Some(Err(e)) => {
                            done = true;
                            vec![Err(e)]
                        }
                        None => {
                            done = true;
                            vec![Err(GhlError::dispatch(
                                DispatchErrorKind::StreamInterrupted,
                                "stream ended before [DONE]",
                            ))]
                        }
                    }
                };
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
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(provider_type: ProviderType, base_url: &str, timeout: Duration) -> ProviderSettings {
        ProviderSettings {
            provider_type,
            api_key: SecretString::from("sk-test".to_string()),
            model: "gpt-4o-mini".into(),
            defaults: ChatOptions {
                temperature: Some(0.7),
                ..Default::default()
            },
            base_url: base_url.to_string(),
            timeout,
            max_retries: 0,
            api_version: None,
        }
    }

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(settings(
            ProviderType::OpenAi,
            &server.uri(),
            Duration::from_secs(5),
        ))
        .unwrap()
    }

    #[test]
    fn rejects_foreign_provider_tags() {
        let err = OpenAiProvider::new(settings(
            ProviderType::Anthropic,
            "http://localhost",
            Duration::from_secs(1),
        ))
        .err()
        .unwrap();
        assert!(matches!(err, GhlError::Config(_)));
    }

    #[tokio::test]
    async fn chat_sends_bearer_and_merged_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.7,
                "max_tokens": 64,
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Hi"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}
            })))
            .mount(&server)
            .await;

        let resp = provider(&server)
            .chat(
                &[ChatMessage::system("Be brief."), ChatMessage::user("Hi")],
                &ChatOptions {
                    max_tokens: Some(64),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.content, "Hello!");
        assert_eq!(resp.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(resp.usage, Some(TokenUsage::new(9, 2)));
    }

    #[tokio::test]
    async fn slow_vendor_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({"model": "m", "choices": []})),
            )
            .mount(&server)
            .await;

        let p = OpenAiProvider::new(settings(
            ProviderType::OpenAi,
            &server.uri(),
            Duration::from_millis(50),
        ))
        .unwrap();
        let err = p
            .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        match err {
            GhlError::Dispatch(e) => assert_eq!(e.kind, DispatchErrorKind::Timeout),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn stream_keeps_order_and_reports_usage() {
        let server = MockServer::start().await;
        let mut body = String::new();
        for word in ["a", "b", "c", "d", "e"] {
            body.push_str(&format!(
                "data: {}\n\n",
                serde_json::json!({"choices": [{"index": 0, "delta": {"content": word}, "finish_reason": null}]})
            ));
        }
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [], "usage": {"prompt_tokens": 4, "completion_tokens": 5, "total_tokens": 9}})
        ));
        body.push_str("data: [DONE]\n\n");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "stream": true,
                "stream_options": {"include_usage": true}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let chunks: Vec<ChatStreamChunk> = provider(&server)
            .stream_chat(&[ChatMessage::user("letters")], &ChatOptions::default())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        let text: String = chunks.iter().filter_map(|c| c.text.as_deref()).collect();
        assert_eq!(text, "abcde");
        assert_eq!(
            chunks.iter().filter_map(|c| c.usage).last(),
            Some(TokenUsage::new(4, 5))
        );
        assert_eq!(chunks.last().unwrap().event_type, StreamEventType::Stop);
    }

    #[tokio::test]
    async fn groq_does_not_request_stream_options() {
        let server = MockServer::start().await;
        let body = format!(
            "data: {}\n\ndata: {}\n\ndata: [DONE]\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": "hey"}}]}),
            serde_json::json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
                "x_groq": {"id": "req_1", "usage": {"prompt_tokens": 2, "completion_tokens": 1}}})
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let p = OpenAiProvider::new(settings(
            ProviderType::Groq,
            &server.uri(),
            Duration::from_secs(5),
        ))
        .unwrap();
        assert_eq!(p.name(), "groq");
        assert!(p.to_request(&[], &ChatOptions::default(), true).stream_options.is_none());

        let chunks: Vec<ChatStreamChunk> = p
            .stream_chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(
            chunks.iter().filter_map(|c| c.usage).last(),
            Some(TokenUsage::new(2, 1))
        );
    }

    #[tokio::test]
    async fn missing_done_is_interrupted() {
        let server = MockServer::start().await;
        let body = format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": "par"}}]})
        );
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let items: Vec<_> = provider(&server)
            .stream_chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(GhlError::Dispatch(e)) => assert_eq!(e.kind, DispatchErrorKind::StreamInterrupted),
            other => panic!("expected StreamInterrupted, got {other:?}"),
        }
    }
}
