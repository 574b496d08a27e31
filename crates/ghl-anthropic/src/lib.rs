// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider for the GHL assistant.
//!
//! This crate implements [`ProviderDispatch`] for the Anthropic Messages API,
//! providing both single-shot completion and streaming SSE responses.

pub mod client;
pub mod sse;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ghl_core::error::{DispatchError, DispatchErrorKind};
use ghl_core::types::{
    AdapterType, ChatMessage, ChatOptions, ChatResponse, ChatRole, ChatStream, ChatStreamChunk,
    HealthStatus, TokenUsage,
};
use ghl_core::{GhlError, PluginAdapter, ProviderDispatch, ProviderSettings, ProviderType};
use tracing::debug;

use crate::client::AnthropicClient;
use crate::sse::StreamEvent;
use crate::types::{ApiMessage, MessageRequest, ResponseContentBlock, SseDelta};

/// Used when neither the request nor the credential sets `max_tokens`.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic Claude provider implementing [`ProviderDispatch`].
pub struct AnthropicProvider {
    client: AnthropicClient,
    model: String,
    defaults: ChatOptions,
}

impl AnthropicProvider {
    /// Creates a provider bound to one credential.
    pub fn new(settings: ProviderSettings) -> Result<Self, GhlError> {
        let client = AnthropicClient::new(&settings)?;
        debug!(model = %settings.model, "Anthropic provider initialized");
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

    /// Converts the uniform conversation into a [`MessageRequest`].
    ///
    /// System messages are lifted into the top-level `system` field, joined
    /// by blank lines; the remaining turns keep their order.
    fn to_message_request(&self, messages: &[ChatMessage], options: &ChatOptions) -> MessageRequest {
        let options = options.or(&self.defaults);

        let system_parts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        let messages = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| ApiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        MessageRequest {
            model: self.model.clone(),
            messages,
            system,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature,
            top_p: options.top_p,
            stream: false,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, GhlError> {
        // Avoid spending tokens on health checks.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GhlError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderDispatch for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, GhlError> {
        let request = self.to_message_request(messages, options);
        let response = self.client.complete_message(&request).await?;

        let content = response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(ChatResponse {
            content,
            usage: Some(TokenUsage::new(
                response.usage.input_tokens,
                response.usage.output_tokens,
            )),
            model: response.model,
        })
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatStream, GhlError> {
        let request = self.to_message_request(messages, options);
        let events = self.client.stream_message(&request).await?;

        let mut state = StreamState::default();
        let chunks = events
            .map(Some)
            .chain(stream::once(async { None }))
            .filter_map(move |item| {
                let chunk = match item {
                    Some(Ok(event)) => state.on_event(event),
                    Some(Err(e)) => state.fail(e),
                    None => state.on_end(),
                };
                async move { chunk }
            });

        Ok(Box::pin(chunks))
    }
}

/// Per-stream bookkeeping: the usage seen so far and whether a terminal item
/// was emitted.
#[derive(Debug, Default)]
struct StreamState {
    input_tokens: u32,
    done: bool,
}

impl StreamState {
    fn on_event(&mut self, event: StreamEvent) -> Option<Result<ChatStreamChunk, GhlError>> {
        if self.done {
            return None;
        }
        match event {
            StreamEvent::MessageStart(start) => {
                self.input_tokens = start.message.usage.input_tokens;
                Some(Ok(ChatStreamChunk::usage(TokenUsage::new(
                    start.message.usage.input_tokens,
                    start.message.usage.output_tokens,
                ))))
            }
            StreamEvent::ContentBlockDelta(delta) => match delta.delta {
                SseDelta::TextDelta { text } => Some(Ok(ChatStreamChunk::delta(text))),
                SseDelta::Other => None,
            },
            StreamEvent::MessageDelta(delta) => delta.usage.map(|u| {
                Ok(ChatStreamChunk::usage(TokenUsage::new(
                    self.input_tokens,
                    u.output_tokens,
                )))
            }),
            StreamEvent::MessageStop => {
                self.done = true;
                Some(Ok(ChatStreamChunk::stop()))
            }
            StreamEvent::Error(err) => {
                let detail = format!(
                    "Anthropic stream error ({}): {}",
                    err.error.type_, err.error.message
                );
                debug!(error_type = %err.error.type_, "stream aborted by vendor");
                self.fail(GhlError::dispatch(DispatchErrorKind::StreamInterrupted, detail))
            }
        }
    }

    fn fail(&mut self, err: GhlError) -> Option<Result<ChatStreamChunk, GhlError>> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(Err(err))
    }

    fn on_end(&mut self) -> Option<Result<ChatStreamChunk, GhlError>> {
        self.fail(GhlError::Dispatch(DispatchError::new(
            DispatchErrorKind::StreamInterrupted,
            "stream ended before message_stop",
        )))
    }
}
