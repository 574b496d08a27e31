// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatch and assistant tests.
//!
//! `TestHarness` assembles the full stack on a temp SQLite database: credential
//! store with a freshly generated master key, usage recorder, a registry whose
//! every provider tag is backed by a [`ScriptedProvider`], the selector, and
//! the assistant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ghl_agent::{Assistant, AssistantReply, InboundEvent};
use ghl_config::{AssistantConfig, ProvidersConfig, StorageConfig};
use ghl_core::traits::NewClient;
use ghl_core::types::{Client, ClientSettings, Credential, ModelConfig, UsageLog, WebhookLog};
use ghl_core::{
    ClientRepository, GhlError, ProviderType, StorageAdapter, WebhookRepository,
};
use ghl_cost::UsageRecorder;
use ghl_router::{ProviderRegistry, ProviderSelector};
use ghl_storage::SqliteStorage;
use ghl_vault::{CipherBox, CredentialStore, MasterKey};
use secrecy::SecretString;

use crate::mock_provider::ScriptedProvider;

/// Registry with a scripted provider behind every tag.
pub fn scripted_registry() -> (ProviderRegistry, HashMap<ProviderType, ScriptedProvider>) {
    let mut registry = ProviderRegistry::new();
    let mut providers = HashMap::new();
    for provider_type in ProviderType::ALL {
        let scripted = ScriptedProvider::new(provider_type);
        registry.register(provider_type, scripted.factory());
        providers.insert(provider_type, scripted);
    }
    (registry, providers)
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    assistant: AssistantConfig,
    providers: ProvidersConfig,
    registry: Option<ProviderRegistry>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            providers: ProvidersConfig::default(),
            registry: None,
        }
    }

    /// Turn the assistant module off.
    pub fn disabled(mut self) -> Self {
        self.assistant.enabled = false;
        self
    }

    pub fn with_memory_window(mut self, window: usize) -> Self {
        self.assistant.memory_window = window;
        self
    }

    pub fn with_providers(mut self, providers: ProvidersConfig) -> Self {
        self.providers = providers;
        self
    }

    /// Dispatch through `registry` instead of the scripted vendors, e.g. real
    /// vendor clients pointed at a mock server.
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, GhlError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| GhlError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let key = MasterKey::generate()?;
        let cipher = Arc::new(CipherBox::new(&key)?);
        let credentials = Arc::new(CredentialStore::new(storage.clone(), cipher));
        let recorder = Arc::new(UsageRecorder::new(storage.clone(), storage.clone()));

        let (scripted_registry, scripted) = scripted_registry();
        let registry = self.registry.unwrap_or(scripted_registry);
        let selector = Arc::new(ProviderSelector::new(
            credentials.clone(),
            Arc::new(registry),
            recorder.clone(),
            self.providers,
        ));
        let assistant = Arc::new(Assistant::new(
            self.assistant,
            storage.clone(),
            storage.clone(),
            storage.clone(),
            selector.clone(),
        ));

        Ok(TestHarness {
            storage,
            credentials,
            recorder,
            selector,
            assistant,
            scripted,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with scripted vendors and temp storage.
pub struct TestHarness {
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub credentials: Arc<CredentialStore>,
    pub recorder: Arc<UsageRecorder>,
    pub selector: Arc<ProviderSelector>,
    pub assistant: Arc<Assistant>,
    scripted: HashMap<ProviderType, ScriptedProvider>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Default harness: assistant enabled, default provider settings.
    pub async fn new() -> Result<Self, GhlError> {
        Self::builder().build().await
    }

    /// The scripted vendor behind `provider_type`.
    pub fn scripted(&self, provider_type: ProviderType) -> &ScriptedProvider {
        &self.scripted[&provider_type]
    }

    pub async fn create_client(&self, location_id: &str) -> Result<Client, GhlError> {
        self.create_client_with(location_id, ClientSettings::default())
            .await
    }

    pub async fn create_client_with(
        &self,
        location_id: &str,
        settings: ClientSettings,
    ) -> Result<Client, GhlError> {
        self.storage
            .create_client(NewClient {
                location_id: location_id.to_string(),
                company_name: Some("Test Roofing Co".to_string()),
                subscription_tier: "starter".to_string(),
                settings,
            })
            .await
    }

    /// Registers a credential with key `sk-test-<tag>` and model `<tag>-model`.
    pub async fn add_credential(
        &self,
        client_id: &str,
        provider_type: ProviderType,
        priority: i32,
    ) -> Result<Credential, GhlError> {
        let key = SecretString::from(format!("sk-test-{provider_type}"));
        self.credentials
            .register(
                client_id,
                provider_type,
                &key,
                ModelConfig::new(format!("{provider_type}-model")),
                priority,
            )
            .await
    }

    /// Usage rows for the client, oldest first.
    pub async fn usage(&self, client_id: &str) -> Result<Vec<UsageLog>, GhlError> {
        self.recorder.list(client_id, None).await
    }

    /// Polls until the client has at least `count` usage rows or two seconds
    /// pass. Needed for rows written by spawned tasks.
    pub async fn wait_for_usage(
        &self,
        client_id: &str,
        count: usize,
    ) -> Result<Vec<UsageLog>, GhlError> {
        for _ in 0..100 {
            let rows = self.usage(client_id).await?;
            if rows.len() >= count {
                return Ok(rows);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.usage(client_id).await
    }

    /// Polls until the credential has a `last_used_at` stamp.
    pub async fn wait_for_last_used(&self, credential_id: &str) -> Result<Credential, GhlError> {
        for _ in 0..100 {
            let credential = self.credentials.get(credential_id).await?;
            if credential.last_used_at.is_some() {
                return Ok(credential);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.credentials.get(credential_id).await
    }

    pub async fn webhook_logs(&self, client_id: Option<&str>) -> Result<Vec<WebhookLog>, GhlError> {
        self.storage.list_webhook_logs(client_id, 100).await
    }

    /// Sends one message for `location_id` through the assistant.
    pub async fn send_message(
        &self,
        location_id: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<AssistantReply, GhlError> {
        self.assistant
            .handle(InboundEvent::message(location_id, conversation_id, text))
            .await
    }
}
