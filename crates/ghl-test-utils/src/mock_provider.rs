// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted vendor client for deterministic dispatch tests.
//!
//! A [`ScriptedProvider`] is registered in place of a real vendor. Every client
//! the registry builds from it shares one FIFO of [`Scripted`] outcomes, so a
//! test can say "the next call times out, the one after answers" without any
//! network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use secrecy::ExposeSecret;
use tokio::sync::Mutex;

use ghl_core::error::DispatchErrorKind;
use ghl_core::types::{
    AdapterType, ChatMessage, ChatOptions, ChatResponse, ChatStream, ChatStreamChunk,
    HealthStatus, TokenUsage,
};
use ghl_core::{GhlError, PluginAdapter, ProviderDispatch, ProviderSettings, ProviderType};

/// Content returned when nothing is queued.
pub const DEFAULT_REPLY: &str = "mock response";

/// One step of a scripted stream.
#[derive(Debug, Clone)]
pub enum StreamStep {
    Delta(String),
    Usage(TokenUsage),
    Stop,
    /// Yields a `StreamInterrupted` error and ends the stream.
    Interrupt,
    /// Never yields again; the consumer has to drop the stream.
    Stall,
}

/// The outcome of the next call against a scripted provider.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply {
        content: String,
        usage: Option<TokenUsage>,
    },
    /// Fails the call (or the stream open) with this kind.
    Fail(DispatchErrorKind),
    Stream(Vec<StreamStep>),
}

impl Scripted {
    pub fn reply(content: impl Into<String>, input_tokens: u32, output_tokens: u32) -> Self {
        Self::Reply {
            content: content.into(),
            usage: Some(TokenUsage::new(input_tokens, output_tokens)),
        }
    }

    /// A well-formed stream: one delta per fragment, usage, then stop.
    pub fn stream(fragments: &[&str], usage: TokenUsage) -> Self {
        let mut steps: Vec<StreamStep> = fragments
            .iter()
            .map(|f| StreamStep::Delta((*f).to_string()))
            .collect();
        steps.push(StreamStep::Usage(usage));
        steps.push(StreamStep::Stop);
        Self::Stream(steps)
    }

    fn default_reply() -> Self {
        Self::reply(DEFAULT_REPLY, 10, 20)
    }
}

/// What a client was built with. The key is kept in the clear so tests can
/// assert the decrypted value reached the vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedWith {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
}

#[derive(Default)]
struct ScriptState {
    queue: Mutex<VecDeque<Scripted>>,
    opened: StdMutex<Vec<OpenedWith>>,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
}

/// Handle to a scripted vendor. Cheap to clone; clones share the script.
#[derive(Clone)]
pub struct ScriptedProvider {
    provider_type: ProviderType,
    state: Arc<ScriptState>,
}

impl ScriptedProvider {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            state: Arc::new(ScriptState::default()),
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    /// Appends an outcome to the script.
    pub async fn push(&self, outcome: Scripted) {
        self.state.queue.lock().await.push_back(outcome);
    }

    pub async fn push_all(&self, outcomes: impl IntoIterator<Item = Scripted>) {
        self.state.queue.lock().await.extend(outcomes);
    }

    /// Calls made against clients of this provider, streams included.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Settings of every client built so far, oldest first.
    pub fn opened(&self) -> Vec<OpenedWith> {
        self.state
            .opened
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    /// Messages of the most recent call.
    pub async fn last_messages(&self) -> Vec<ChatMessage> {
        self.state.last_messages.lock().await.clone()
    }

    /// Registry factory building clients that share this script.
    pub fn factory(
        &self,
    ) -> impl Fn(ProviderSettings) -> Result<Arc<dyn ProviderDispatch>, GhlError> + Send + Sync + 'static
    {
        let handle = self.clone();
        move |settings: ProviderSettings| {
            if let Ok(mut opened) = handle.state.opened.lock() {
                opened.push(OpenedWith {
                    model: settings.model.clone(),
                    api_key: settings.api_key.expose_secret().to_string(),
                    base_url: settings.base_url.clone(),
                });
            }
            Ok(Arc::new(ScriptedClient {
                provider_type: handle.provider_type,
                model: settings.model,
                state: handle.state.clone(),
            }) as Arc<dyn ProviderDispatch>)
        }
    }
}

/// A client bound to one credential, answering from the shared script.
pub struct ScriptedClient {
    provider_type: ProviderType,
    model: String,
    state: Arc<ScriptState>,
}

impl ScriptedClient {
    async fn next(&self, messages: &[ChatMessage]) -> Scripted {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        *self.state.last_messages.lock().await = messages.to_vec();
        self.state
            .queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(Scripted::default_reply)
    }

    fn failure(&self, kind: DispatchErrorKind) -> GhlError {
        GhlError::dispatch(kind, format!("scripted {kind} from {}", self.provider_type))
    }
}

#[async_trait]
impl PluginAdapter for ScriptedClient {
    fn name(&self) -> &str {
        "scripted-provider"
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
impl ProviderDispatch for ScriptedClient {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<ChatResponse, GhlError> {
        match self.next(messages).await {
            Scripted::Reply { content, usage } => Ok(ChatResponse {
                content,
                usage,
                model: self.model.clone(),
            }),
            Scripted::Fail(kind) => Err(self.failure(kind)),
            Scripted::Stream(steps) => {
                let mut content = String::new();
                let mut usage = None;
                for step in steps {
                    match step {
                        StreamStep::Delta(text) => content.push_str(&text),
                        StreamStep::Usage(u) => usage = Some(u),
                        StreamStep::Stop => break,
                        StreamStep::Interrupt | StreamStep::Stall => {
                            return Err(self.failure(DispatchErrorKind::StreamInterrupted));
                        }
                    }
                }
                Ok(ChatResponse {
                    content,
                    usage,
                    model: self.model.clone(),
                })
            }
        }
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<ChatStream, GhlError> {
        let steps = match self.next(messages).await {
            Scripted::Fail(kind) => return Err(self.failure(kind)),
            Scripted::Reply { content, usage } => {
                let mut steps = vec![StreamStep::Delta(content)];
                steps.extend(usage.map(StreamStep::Usage));
                steps.push(StreamStep::Stop);
                steps
            }
            Scripted::Stream(steps) => steps,
        };

        let mut items = Vec::with_capacity(steps.len());
        let mut stall = false;
        for step in steps {
            match step {
                StreamStep::Delta(text) => items.push(Ok(ChatStreamChunk::delta(text))),
                StreamStep::Usage(u) => items.push(Ok(ChatStreamChunk::usage(u))),
                StreamStep::Stop => {
                    items.push(Ok(ChatStreamChunk::stop()));
                    break;
                }
                StreamStep::Interrupt => {
                    items.push(Err(self.failure(DispatchErrorKind::StreamInterrupted)));
                    break;
                }
                StreamStep::Stall => {
                    stall = true;
                    break;
                }
            }
        }

        let head = stream::iter(items);
        if stall {
            Ok(head.chain(stream::pending()).boxed())
        } else {
            Ok(head.boxed())
        }
    }
}
