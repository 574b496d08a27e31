// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the runtime stack from a validated configuration.

use std::sync::Arc;

use ghl_agent::Assistant;
use ghl_config::GhlConfig;
use ghl_core::types::Client;
use ghl_core::{ClientRepository, GhlError, ProviderType};
use ghl_cost::UsageRecorder;
use ghl_router::{ProviderRegistry, ProviderSelector};
use ghl_storage::SqliteStorage;
use ghl_vault::{CipherBox, CredentialStore};
use tracing::debug;

/// Registry with every vendor compiled into this binary.
pub fn provider_registry() -> ProviderRegistry {
    #[allow(unused_mut)]
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "anthropic")]
    registry.register(ProviderType::Anthropic, ghl_anthropic::AnthropicProvider::factory);

    #[cfg(feature = "openai")]
    for provider_type in [ProviderType::OpenAi, ProviderType::Groq, ProviderType::Together] {
        registry.register(provider_type, ghl_openai::OpenAiProvider::factory);
    }

    #[cfg(feature = "ollama")]
    registry.register(ProviderType::Ollama, ghl_ollama::OllamaProvider::factory);

    debug!(providers = ?registry.provider_types(), "provider registry built");
    registry
}

/// The opened stack every data command works against.
pub struct App {
    pub config: GhlConfig,
    pub storage: Arc<SqliteStorage>,
    pub credentials: Arc<CredentialStore>,
    pub recorder: Arc<UsageRecorder>,
    pub selector: Arc<ProviderSelector>,
    pub assistant: Arc<Assistant>,
}

impl App {
    /// Opens the database and builds the dispatch stack.
    ///
    /// Fails before touching storage when the master key is missing or
    /// malformed.
    pub async fn open(config: GhlConfig) -> Result<Self, GhlError> {
        let cipher = Arc::new(CipherBox::from_hex(
            config.assistant.master_encryption_key.as_deref(),
        )?);
        let storage = Arc::new(SqliteStorage::open(config.storage.clone()).await?);

        let credentials = Arc::new(CredentialStore::new(storage.clone(), cipher));
        let recorder = Arc::new(UsageRecorder::new(storage.clone(), storage.clone()));
        let selector = Arc::new(ProviderSelector::new(
            credentials.clone(),
            Arc::new(provider_registry()),
            recorder.clone(),
            config.providers.clone(),
        ));
        let assistant = Arc::new(Assistant::new(
            config.assistant.clone(),
            storage.clone(),
            storage.clone(),
            storage.clone(),
            selector.clone(),
        ));

        Ok(Self {
            config,
            storage,
            credentials,
            recorder,
            selector,
            assistant,
        })
    }

    /// Looks a tenant up by location id.
    pub async fn client_by_location(&self, location_id: &str) -> Result<Client, GhlError> {
        self.storage
            .find_client_by_location(location_id)
            .await?
            .ok_or_else(|| GhlError::NotFound {
                entity: "client",
                id: location_id.to_string(),
            })
    }

    /// Accepts either a client id or a location id.
    pub async fn resolve_client(&self, reference: &str) -> Result<Client, GhlError> {
        if let Some(client) = self.storage.get_client(reference).await? {
            return Ok(client);
        }
        self.client_by_location(reference).await
    }
}
