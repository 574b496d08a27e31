// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghl credential` subcommands.
//!
//! API keys are read from a named environment variable (`--key-env`) or a
//! hidden prompt; they are never accepted as arguments.

use clap::Subcommand;
use ghl_core::types::{Credential, ModelConfig};
use ghl_core::{GhlError, ProviderType};
use ghl_vault::read_api_key;
use secrecy::SecretString;
use serde::Serialize;

use crate::app::App;
use crate::clients::print_json;

#[derive(Subcommand, Debug)]
pub enum CredentialCommands {
    /// Register a provider credential for a tenant.
    Add {
        /// Client id or location id.
        #[arg(long)]
        client: String,
        #[arg(long)]
        provider: ProviderType,
        /// Model requests are sent to.
        #[arg(long)]
        model: String,
        /// Lower is preferred.
        #[arg(long, default_value_t = 1)]
        priority: i32,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Environment variable holding the API key.
        #[arg(long)]
        key_env: Option<String>,
    },
    /// Replace a credential's API key.
    Rotate {
        credential: String,
        #[arg(long)]
        key_env: Option<String>,
    },
    /// List a tenant's credentials in selection order.
    List {
        #[arg(long)]
        client: String,
        #[arg(long)]
        json: bool,
    },
    /// Exclude a credential from selection.
    Deactivate { credential: String },
    /// Make a credential selectable again.
    Activate { credential: String },
    /// Change a credential's priority.
    Priority { credential: String, priority: i32 },
    /// Delete a credential. Usage rows keep their history.
    Delete { credential: String },
}

/// Credential as shown to operators: everything except the sealed secret.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialView<'a> {
    id: &'a str,
    provider_type: ProviderType,
    model_config: &'a ModelConfig,
    is_active: bool,
    priority: i32,
    last_used_at: Option<&'a str>,
    created_at: &'a str,
}

impl<'a> From<&'a Credential> for CredentialView<'a> {
    fn from(c: &'a Credential) -> Self {
        Self {
            id: &c.id,
            provider_type: c.provider_type,
            model_config: &c.model_config,
            is_active: c.is_active,
            priority: c.priority,
            last_used_at: c.last_used_at.as_deref(),
            created_at: &c.created_at,
        }
    }
}

pub async fn run(app: &App, command: CredentialCommands) -> Result<(), GhlError> {
    match command {
        CredentialCommands::Add {
            client,
            provider,
            model,
            priority,
            temperature,
            max_tokens,
            key_env,
        } => {
            let client = app.resolve_client(&client).await?;
            let key = api_key(provider, key_env.as_deref())?;
            let config = ModelConfig {
                temperature,
                max_tokens,
                ..ModelConfig::new(model)
            };
            let credential = app
                .credentials
                .register(&client.id, provider, &key, config, priority)
                .await?;
            println!(
                "registered {} credential {} for client {}",
                provider, credential.id, client.id
            );
        }
        CredentialCommands::Rotate { credential, key_env } => {
            let current = app.credentials.get(&credential).await?;
            let key = api_key(current.provider_type, key_env.as_deref())?;
            app.credentials.rotate(&credential, &key).await?;
            println!("rotated credential {credential}");
        }
        CredentialCommands::List { client, json } => {
            let client = app.resolve_client(&client).await?;
            let credentials = app.credentials.list(&client.id).await?;
            let views: Vec<CredentialView<'_>> = credentials.iter().map(Into::into).collect();
            if json {
                print_json(&views)?;
            } else if views.is_empty() {
                println!("no credentials for client {}", client.id);
            } else {
                for view in &views {
                    println!("{}", credential_line(view));
                }
            }
        }
        CredentialCommands::Deactivate { credential } => {
            app.credentials.deactivate(&credential).await?;
            println!("deactivated credential {credential}");
        }
        CredentialCommands::Activate { credential } => {
            app.credentials.activate(&credential).await?;
            println!("activated credential {credential}");
        }
        CredentialCommands::Priority {
            credential,
            priority,
        } => {
            app.credentials
                .update_config(&credential, None, Some(priority))
                .await?;
            println!("credential {credential} now has priority {priority}");
        }
        CredentialCommands::Delete { credential } => {
            app.credentials.delete(&credential).await?;
            println!("deleted credential {credential}");
        }
    }
    Ok(())
}

/// Ollama needs no key; an empty one is stored so the row stays uniform.
fn api_key(provider: ProviderType, key_env: Option<&str>) -> Result<SecretString, GhlError> {
    if !provider.requires_api_key() && key_env.is_none() {
        return Ok(SecretString::from(String::new()));
    }
    read_api_key(key_env, &format!("{provider} API key"))
}

fn credential_line(view: &CredentialView<'_>) -> String {
    format!(
        "{}  {:<10} {:<32} p={:<3} {:<8} last used {}",
        view.id,
        view.provider_type.to_string(),
        view.model_config.chat_model,
        view.priority,
        if view.is_active { "active" } else { "inactive" },
        view.last_used_at.unwrap_or("never"),
    )
}
