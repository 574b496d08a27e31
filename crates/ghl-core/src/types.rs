// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits, repositories, and the dispatch path.

use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::GhlError;

/// Closed set of AI vendors a credential can target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Anthropic,
    Groq,
    Together,
    Ollama,
}

impl ProviderType {
    pub const ALL: [ProviderType; 5] = [
        ProviderType::OpenAi,
        ProviderType::Anthropic,
        ProviderType::Groq,
        ProviderType::Together,
        ProviderType::Ollama,
    ];

    /// Whether the vendor authenticates with an API key.
    pub fn requires_api_key(self) -> bool {
        !matches!(self, ProviderType::Ollama)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
}

// --- Chat contract ---

/// Author of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One message of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }
}

/// Sampling options for a chat request. Unset fields defer to the credential's
/// model configuration and then to the vendor default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

impl ChatOptions {
    /// Fills every unset field from `fallback`.
    pub fn or(&self, fallback: &ChatOptions) -> ChatOptions {
        ChatOptions {
            temperature: self.temperature.or(fallback.temperature),
            max_tokens: self.max_tokens.or(fallback.max_tokens),
            top_p: self.top_p.or(fallback.top_p),
            frequency_penalty: self.frequency_penalty.or(fallback.frequency_penalty),
            presence_penalty: self.presence_penalty.or(fallback.presence_penalty),
        }
    }
}

/// Token accounting reported by a vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Builds a usage record whose total is input + output.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }
}

/// A completed, non-streaming chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
    /// Model that actually served the request.
    pub model: String,
}

/// What a [`ChatStreamChunk`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventType {
    /// An incremental text fragment.
    Delta,
    /// A cumulative usage snapshot; later snapshots replace earlier ones.
    Usage,
    /// The vendor finished the response.
    Stop,
}

/// One item of a streaming chat response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatStreamChunk {
    pub event_type: StreamEventType,
    pub text: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl ChatStreamChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            event_type: StreamEventType::Delta,
            text: Some(text.into()),
            usage: None,
        }
    }

    pub fn usage(usage: TokenUsage) -> Self {
        Self {
            event_type: StreamEventType::Usage,
            text: None,
            usage: Some(usage),
        }
    }

    pub fn stop() -> Self {
        Self {
            event_type: StreamEventType::Stop,
            text: None,
            usage: None,
        }
    }
}

/// Lazy, finite, non-restartable sequence of stream chunks. Dropping it closes
/// the upstream connection.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamChunk, GhlError>> + Send>>;

// --- Tenants ---

/// Free-form per-tenant settings. Unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A subscribing tenant, identified externally by its location id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub location_id: String,
    pub company_name: Option<String>,
    pub subscription_tier: String,
    pub is_active: bool,
    pub settings: ClientSettings,
    pub created_at: String,
    pub updated_at: String,
}

// --- Credentials ---

/// An AES-256-GCM sealed secret. All three parts are hex encoded and all three
/// are required to decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    pub ciphertext: String,
    pub iv: String,
    pub tag: String,
}

/// Model defaults for one credential. Unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub chat_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModelConfig {
    pub fn new(chat_model: impl Into<String>) -> Self {
        Self {
            chat_model: chat_model.into(),
            ..Self::default()
        }
    }

    /// The sampling defaults this configuration implies.
    pub fn options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }
}

/// One tenant's configuration for one provider type.
///
/// At most one exists per (client_id, provider_type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub client_id: String,
    pub provider_type: ProviderType,
    pub secret: EncryptedSecret,
    pub model_config: ModelConfig,
    pub is_active: bool,
    /// Lower value means higher preference.
    pub priority: i32,
    pub last_used_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// --- Model catalog ---

/// Vendor pricing. `unit` names the token quantity the prices refer to
/// ("1M tokens", "1K tokens", "token"); absent means per million tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Catalog entry for a (provider type, model id) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableModel {
    pub id: String,
    pub provider_type: ProviderType,
    pub model_id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub pricing: Option<ModelPricing>,
    pub context_window: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

// --- Conversations ---

/// One entry of a session's append-only context log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: String,
}

/// Contact details attached to a session. Unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One external conversation thread for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub client_id: String,
    pub conversation_id: String,
    pub contact_id: Option<String>,
    pub context: Vec<ContextEntry>,
    pub metadata: SessionMetadata,
    pub last_message_at: String,
    pub created_at: String,
    pub updated_at: String,
}

// --- Audit ---

/// One immutable record per dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: String,
    pub client_id: String,
    pub session_id: Option<String>,
    pub provider_type: Option<ProviderType>,
    pub model_used: Option<String>,
    pub tokens_input: Option<u32>,
    pub tokens_output: Option<u32>,
    pub tokens_total: Option<u32>,
    /// `None` means the price is unknown, not that the request was free.
    pub cost_usd: Option<f64>,
    pub request_duration_ms: u64,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// Aggregated usage for billing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub requests: u64,
    pub failures: u64,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub tokens_total: u64,
    /// Sum over rows with a known cost.
    pub cost_usd: f64,
    /// Successful rows whose cost could not be priced.
    pub unpriced_requests: u64,
}

/// One immutable record per inbound webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookLog {
    pub id: String,
    pub client_id: Option<String>,
    pub event_type: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub response_status: Option<u16>,
    pub error_message: Option<String>,
    pub created_at: String,
}
