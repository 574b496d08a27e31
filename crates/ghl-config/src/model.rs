// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the GHL assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently ignored.

use serde::{Deserialize, Serialize};

use ghl_core::ProviderType;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GhlConfig {
    /// Module switch, master key, and conversation defaults.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Vendor endpoints and request behavior.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Assistant module configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Enables or disables the whole module.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 64 hex characters (32 bytes) protecting every stored API key.
    #[serde(default)]
    pub master_encryption_key: Option<String>,

    /// Public base URL used when registering outbound webhooks.
    #[serde(default)]
    pub webhook_base_url: Option<String>,

    /// Number of most recent context entries sent with each request.
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            master_encryption_key: None,
            webhook_base_url: None,
            memory_window: default_memory_window(),
            log_level: default_log_level(),
        }
    }
}

// Never print the master key.
impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("enabled", &self.enabled)
            .field(
                "master_encryption_key",
                &self.master_encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("webhook_base_url", &self.webhook_base_url)
            .field("memory_window", &self.memory_window)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_memory_window() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ghl-assistant").join("ghl.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ghl.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Vendor endpoint configuration shared by every credential of a type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Per-request timeout applied by every HTTP vendor client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries inside one vendor client before reporting a transient error.
    /// Zero leaves recovery to credential failover.
    #[serde(default)]
    pub max_retries: u32,

    /// Value of the `anthropic-version` header.
    #[serde(default = "default_anthropic_api_version")]
    pub anthropic_api_version: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,

    #[serde(default = "default_together_base_url")]
    pub together_base_url: String,

    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,
}

impl ProvidersConfig {
    /// API root for the given provider tag.
    pub fn base_url_for(&self, provider: ProviderType) -> &str {
        match provider {
            ProviderType::OpenAi => &self.openai_base_url,
            ProviderType::Anthropic => &self.anthropic_base_url,
            ProviderType::Groq => &self.groq_base_url,
            ProviderType::Together => &self.together_base_url,
            ProviderType::Ollama => &self.ollama_base_url,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: 0,
            anthropic_api_version: default_anthropic_api_version(),
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            groq_base_url: default_groq_base_url(),
            together_base_url: default_together_base_url(),
            ollama_base_url: default_ollama_base_url(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_anthropic_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_together_base_url() -> String {
    "https://api.together.xyz/v1".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}
