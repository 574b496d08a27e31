// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait and one repository trait per persisted entity.
//!
//! Uniqueness and foreign-key invariants are enforced by the backend schema;
//! implementations translate violations into [`GhlError::DuplicateCredential`]
//! and [`GhlError::NotFound`].

use async_trait::async_trait;

use crate::error::GhlError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AvailableModel, Client, ClientSettings, ContextEntry, ConversationSession, Credential,
    EncryptedSecret, ModelConfig, ModelPricing, ProviderType, SessionMetadata, UsageLog,
    UsageSummary, WebhookLog,
};

/// Adapter for storage and persistence backends.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), GhlError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), GhlError>;
}

/// Fields supplied when onboarding a tenant.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub location_id: String,
    pub company_name: Option<String>,
    pub subscription_tier: String,
    pub settings: ClientSettings,
}

/// Fields supplied when persisting a freshly encrypted credential.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub client_id: String,
    pub provider_type: ProviderType,
    pub secret: EncryptedSecret,
    pub model_config: ModelConfig,
    pub priority: i32,
}

/// Catalog entry to insert or replace.
#[derive(Debug, Clone)]
pub struct NewModel {
    pub provider_type: ProviderType,
    pub model_id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub pricing: Option<ModelPricing>,
    pub context_window: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

/// One accounting row, already priced.
#[derive(Debug, Clone, Default)]
pub struct NewUsageLog {
    pub client_id: String,
    pub session_id: Option<String>,
    pub provider_type: Option<ProviderType>,
    pub model_used: Option<String>,
    pub tokens_input: Option<u32>,
    pub tokens_output: Option<u32>,
    pub tokens_total: Option<u32>,
    pub cost_usd: Option<f64>,
    pub request_duration_ms: u64,
    pub error_message: Option<String>,
}

/// One inbound webhook event.
#[derive(Debug, Clone, Default)]
pub struct NewWebhookLog {
    pub client_id: Option<String>,
    pub event_type: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub response_status: Option<u16>,
    pub error_message: Option<String>,
}

/// Tenant records.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Fails with `Storage` when the location id is already registered.
    async fn create_client(&self, client: NewClient) -> Result<Client, GhlError>;

    async fn get_client(&self, id: &str) -> Result<Option<Client>, GhlError>;

    async fn find_client_by_location(&self, location_id: &str)
    -> Result<Option<Client>, GhlError>;

    async fn list_clients(&self) -> Result<Vec<Client>, GhlError>;

    async fn update_client_settings(
        &self,
        id: &str,
        settings: &ClientSettings,
    ) -> Result<Client, GhlError>;

    /// Soft activation toggle.
    async fn set_client_active(&self, id: &str, active: bool) -> Result<Client, GhlError>;

    /// Hard delete. Cascades to credentials, sessions, and usage rows.
    async fn delete_client(&self, id: &str) -> Result<(), GhlError>;
}

/// Provider credentials. Secrets only ever cross this boundary encrypted.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Fails with `DuplicateCredential` when the (client, provider type) pair
    /// exists and with `NotFound` when the client does not.
    async fn insert_credential(&self, credential: NewCredential) -> Result<Credential, GhlError>;

    async fn get_credential(&self, id: &str) -> Result<Option<Credential>, GhlError>;

    async fn find_credential(
        &self,
        client_id: &str,
        provider_type: ProviderType,
    ) -> Result<Option<Credential>, GhlError>;

    /// Every credential of the client, active or not, in selection order.
    async fn list_credentials(&self, client_id: &str) -> Result<Vec<Credential>, GhlError>;

    /// Active credentials by priority ascending, then most recent use first
    /// (never-used last), then creation order.
    async fn list_active_credentials(&self, client_id: &str)
    -> Result<Vec<Credential>, GhlError>;

    async fn update_credential_secret(
        &self,
        id: &str,
        secret: &EncryptedSecret,
    ) -> Result<Credential, GhlError>;

    async fn update_credential_config(
        &self,
        id: &str,
        model_config: Option<&ModelConfig>,
        priority: Option<i32>,
    ) -> Result<Credential, GhlError>;

    async fn set_credential_active(&self, id: &str, active: bool)
    -> Result<Credential, GhlError>;

    /// Sets `last_used_at`. Leaves `updated_at` alone.
    async fn touch_credential(&self, id: &str, used_at: &str) -> Result<(), GhlError>;

    async fn delete_credential(&self, id: &str) -> Result<(), GhlError>;
}

/// Read-mostly model catalog.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Inserts the entry or replaces the one with the same (provider, model).
    async fn upsert_model(&self, model: NewModel) -> Result<AvailableModel, GhlError>;

    async fn find_model(
        &self,
        provider_type: ProviderType,
        model_id: &str,
    ) -> Result<Option<AvailableModel>, GhlError>;

    async fn list_models(
        &self,
        provider_type: Option<ProviderType>,
    ) -> Result<Vec<AvailableModel>, GhlError>;

    async fn set_model_active(&self, id: &str, active: bool) -> Result<(), GhlError>;
}

/// Conversation sessions with their append-only context log.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Returns the session for (client, conversation), creating it if absent.
    async fn get_or_create_session(
        &self,
        client_id: &str,
        conversation_id: &str,
        contact_id: Option<&str>,
        metadata: &SessionMetadata,
    ) -> Result<ConversationSession, GhlError>;

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>, GhlError>;

    async fn find_session(
        &self,
        client_id: &str,
        conversation_id: &str,
    ) -> Result<Option<ConversationSession>, GhlError>;

    /// Appends one entry and bumps `last_message_at`. Existing entries are
    /// never rewritten.
    async fn append_context(&self, session_id: &str, entry: &ContextEntry)
    -> Result<(), GhlError>;

    /// Usage rows referencing the session keep existing with a cleared link.
    async fn delete_session(&self, id: &str) -> Result<(), GhlError>;
}

/// Immutable usage accounting.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn insert_usage(&self, entry: NewUsageLog) -> Result<UsageLog, GhlError>;

    /// Rows for the client, oldest first, optionally from `since` onwards.
    async fn list_usage(
        &self,
        client_id: &str,
        since: Option<&str>,
    ) -> Result<Vec<UsageLog>, GhlError>;

    async fn usage_summary(
        &self,
        client_id: &str,
        since: Option<&str>,
    ) -> Result<UsageSummary, GhlError>;
}

/// Immutable inbound webhook audit.
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn insert_webhook_log(&self, entry: NewWebhookLog) -> Result<WebhookLog, GhlError>;

    /// Most recent first.
    async fn list_webhook_logs(
        &self,
        client_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<WebhookLog>, GhlError>;
}
