// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential selection with sequential failover.
//!
//! Candidates come from [`CredentialStore::list_active`] in priority order and
//! are tried one at a time. Retryable failures advance to the next candidate;
//! anything else stops the loop. Every attempt leaves exactly one usage row,
//! written before the outcome is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use ghl_config::ProvidersConfig;
use ghl_core::error::DispatchError;
use ghl_core::types::{ChatMessage, ChatOptions, ChatResponse, ChatStream, Credential};
use ghl_core::{GhlError, ProviderDispatch, ProviderSettings, ProviderType};
use ghl_cost::{UsageEntry, UsageRecorder};
use ghl_vault::CredentialStore;
use tracing::{debug, error, info, warn};

use crate::metered::{UsageGuard, meter};
use crate::registry::ProviderRegistry;

/// One chat request for one tenant.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub client_id: String,
    /// Conversation the usage rows are linked to, if any.
    pub session_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub options: ChatOptions,
}

impl DispatchRequest {
    pub fn new(client_id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            client_id: client_id.into(),
            session_id: None,
            messages,
            options: ChatOptions::default(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }
}

/// A successful non-streaming dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub response: ChatResponse,
    pub provider_type: ProviderType,
    pub credential_id: String,
    /// Candidates tried, including the one that answered.
    pub attempts: usize,
}

/// A successfully opened, metered stream.
pub struct SelectedStream {
    pub provider_type: ProviderType,
    pub model: String,
    pub credential_id: String,
    pub attempts: usize,
    pub stream: ChatStream,
}

impl std::fmt::Debug for SelectedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedStream")
            .field("provider_type", &self.provider_type)
            .field("model", &self.model)
            .field("credential_id", &self.credential_id)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

/// Picks credentials for a client and dispatches with failover.
pub struct ProviderSelector {
    credentials: Arc<CredentialStore>,
    registry: Arc<ProviderRegistry>,
    recorder: Arc<UsageRecorder>,
    providers: ProvidersConfig,
}

impl ProviderSelector {
    pub fn new(
        credentials: Arc<CredentialStore>,
        registry: Arc<ProviderRegistry>,
        recorder: Arc<UsageRecorder>,
        providers: ProvidersConfig,
    ) -> Self {
        Self {
            credentials,
            registry,
            recorder,
            providers,
        }
    }

    pub fn recorder(&self) -> &Arc<UsageRecorder> {
        &self.recorder
    }

    /// Sends the conversation and waits for the full response.
    pub async fn chat(&self, request: &DispatchRequest) -> Result<DispatchOutcome, GhlError> {
        let candidates = self.candidates(request).await?;
        let total = candidates.len();
        let mut last: Option<DispatchError> = None;

        for (index, credential) in candidates.into_iter().enumerate() {
            let started = Instant::now();
            let entry = self.entry_for(request, &credential);
            let result = match self.open(&credential) {
                Ok(provider) => provider.chat(&request.messages, &request.options).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(response) => {
                    self.record(
                        entry
                            .with_usage(response.usage)
                            .with_duration(started.elapsed()),
                    )
                    .await;
                    self.spawn_mark_used(&credential);
                    info!(
                        client_id = %request.client_id,
                        provider = %credential.provider_type,
                        credential_id = %credential.id,
                        attempts = index + 1,
                        duration_ms = elapsed_ms(started.elapsed()),
                        "chat dispatched"
                    );
                    return Ok(DispatchOutcome {
                        response,
                        provider_type: credential.provider_type,
                        credential_id: credential.id,
                        attempts: index + 1,
                    });
                }
                Err(err) => {
                    self.record(
                        entry
                            .with_duration(started.elapsed())
                            .with_error(err.to_string()),
                    )
                    .await;
                    last = Some(self.fail_or_advance(request, &credential, err, index, total)?);
                }
            }
        }

        Err(exhausted(total, last))
    }

    /// Opens a streaming response on the first candidate that accepts it.
    ///
    /// Failover only happens while opening. Once a stream is returned its
    /// failures surface to the caller as `StreamInterrupted` items and are
    /// never retried elsewhere.
    pub async fn stream_chat(&self, request: &DispatchRequest) -> Result<SelectedStream, GhlError> {
        let candidates = self.candidates(request).await?;
        let total = candidates.len();
        let mut last: Option<DispatchError> = None;

        for (index, credential) in candidates.into_iter().enumerate() {
            let started = Instant::now();
            let entry = self.entry_for(request, &credential);
            let opened = match self.open(&credential) {
                Ok(provider) => provider
                    .stream_chat(&request.messages, &request.options)
                    .await
                    .map(|stream| (stream, provider.model().to_string())),
                Err(e) => Err(e),
            };

            match opened {
                Ok((stream, model)) => {
                    self.spawn_mark_used(&credential);
                    debug!(
                        client_id = %request.client_id,
                        provider = %credential.provider_type,
                        credential_id = %credential.id,
                        attempts = index + 1,
                        "stream opened"
                    );
                    let guard = UsageGuard::new(self.recorder.clone(), entry, started);
                    return Ok(SelectedStream {
                        provider_type: credential.provider_type,
                        model,
                        credential_id: credential.id,
                        attempts: index + 1,
                        stream: meter(stream, guard),
                    });
                }
                Err(err) => {
                    self.record(
                        entry
                            .with_duration(started.elapsed())
                            .with_error(err.to_string()),
                    )
                    .await;
                    last = Some(self.fail_or_advance(request, &credential, err, index, total)?);
                }
            }
        }

        Err(exhausted(total, last))
    }

    /// Active credentials in selection order. An empty list is recorded as a
    /// provider-less usage row and reported as `NoActiveProvider`.
    async fn candidates(&self, request: &DispatchRequest) -> Result<Vec<Credential>, GhlError> {
        let candidates = self.credentials.list_active(&request.client_id).await?;
        if candidates.is_empty() {
            let err = GhlError::NoActiveProvider {
                client_id: request.client_id.clone(),
            };
            warn!(client_id = %request.client_id, "no active provider credential");
            self.record(UsageEntry {
                client_id: request.client_id.clone(),
                session_id: request.session_id.clone(),
                error: Some(err.to_string()),
                ..Default::default()
            })
            .await;
            return Err(err);
        }
        Ok(candidates)
    }

    /// Returns the retryable error to remember, or the error that ends the loop.
    fn fail_or_advance(
        &self,
        request: &DispatchRequest,
        credential: &Credential,
        err: GhlError,
        index: usize,
        total: usize,
    ) -> Result<DispatchError, GhlError> {
        match err {
            GhlError::Dispatch(dispatch) if dispatch.is_retryable() => {
                warn!(
                    client_id = %request.client_id,
                    provider = %credential.provider_type,
                    credential_id = %credential.id,
                    kind = %dispatch.kind,
                    remaining = total - index - 1,
                    error = %dispatch.message,
                    "provider failed, trying next candidate"
                );
                Ok(dispatch)
            }
            other => {
                warn!(
                    client_id = %request.client_id,
                    provider = %credential.provider_type,
                    credential_id = %credential.id,
                    error = %other,
                    "provider failed with a non-retryable error"
                );
                Err(other)
            }
        }
    }

    /// Decrypts the secret and builds the vendor client. The plaintext lives
    /// only as long as the returned client.
    fn open(&self, credential: &Credential) -> Result<Arc<dyn ProviderDispatch>, GhlError> {
        let api_key = self.credentials.decrypt(credential)?;
        let provider_type = credential.provider_type;
        let settings = ProviderSettings {
            provider_type,
            api_key,
            model: credential.model_config.chat_model.clone(),
            defaults: credential.model_config.options(),
            base_url: self.providers.base_url_for(provider_type).to_string(),
            timeout: Duration::from_secs(self.providers.request_timeout_secs),
            max_retries: self.providers.max_retries,
            api_version: (provider_type == ProviderType::Anthropic)
                .then(|| self.providers.anthropic_api_version.clone()),
        };
        self.registry.create(settings)
    }

    fn entry_for(&self, request: &DispatchRequest, credential: &Credential) -> UsageEntry {
        UsageEntry::attempt(
            request.client_id.clone(),
            request.session_id.clone(),
            credential.provider_type,
            credential.model_config.chat_model.clone(),
        )
    }

    /// Accounting never changes the dispatch outcome.
    async fn record(&self, entry: UsageEntry) {
        let client_id = entry.client_id.clone();
        if let Err(e) = self.recorder.record(entry).await {
            error!(client_id = %client_id, error = %e, "failed to record usage");
        }
    }

    fn spawn_mark_used(&self, credential: &Credential) {
        let store = self.credentials.clone();
        let credential_id = credential.id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.mark_used(&credential_id, Utc::now()).await {
                warn!(credential_id = %credential_id, error = %e, "failed to mark credential used");
            }
        });
    }
}

fn exhausted(attempts: usize, last: Option<DispatchError>) -> GhlError {
    match last {
        Some(last) => GhlError::AllProvidersExhausted { attempts, last },
        None => GhlError::Internal("failover loop ended without an attempt".to_string()),
    }
}

fn elapsed_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
