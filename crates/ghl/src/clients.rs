// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghl client` subcommands.

use clap::Subcommand;
use ghl_core::traits::NewClient;
use ghl_core::types::{Client, ClientSettings};
use ghl_core::{ClientRepository, GhlError};

use crate::app::App;

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Onboard a tenant.
    Create {
        /// External location id the tenant is addressed by.
        location_id: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long, default_value = "starter")]
        tier: String,
        /// Context entries sent with each request.
        #[arg(long)]
        memory_window: Option<usize>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        temperature: Option<f64>,
        /// System prompt prepended to every conversation.
        #[arg(long)]
        system_prompt: Option<String>,
    },
    /// List tenants.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Stop serving a tenant without deleting anything.
    Deactivate { client: String },
    /// Resume serving a tenant.
    Activate { client: String },
    /// Delete a tenant with its credentials, sessions, and usage.
    Delete {
        client: String,
        /// Required; deletion cannot be undone.
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(app: &App, command: ClientCommands) -> Result<(), GhlError> {
    match command {
        ClientCommands::Create {
            location_id,
            company,
            tier,
            memory_window,
            max_tokens,
            temperature,
            system_prompt,
        } => {
            let mut settings = ClientSettings {
                max_tokens,
                temperature,
                memory_window,
                ..ClientSettings::default()
            };
            if let Some(prompt) = system_prompt {
                settings.extra.insert(
                    ghl_agent::context::SYSTEM_PROMPT_KEY.to_string(),
                    serde_json::Value::String(prompt),
                );
            }
            let client = app
                .storage
                .create_client(NewClient {
                    location_id,
                    company_name: company,
                    subscription_tier: tier,
                    settings,
                })
                .await?;
            println!("created client {} for location {}", client.id, client.location_id);
        }
        ClientCommands::List { json } => {
            let clients = app.storage.list_clients().await?;
            if json {
                print_json(&clients)?;
            } else if clients.is_empty() {
                println!("no clients");
            } else {
                for client in &clients {
                    println!("{}", client_line(client));
                }
            }
        }
        ClientCommands::Deactivate { client } => {
            let client = app.resolve_client(&client).await?;
            app.storage.set_client_active(&client.id, false).await?;
            println!("deactivated client {}", client.id);
        }
        ClientCommands::Activate { client } => {
            let client = app.resolve_client(&client).await?;
            app.storage.set_client_active(&client.id, true).await?;
            println!("activated client {}", client.id);
        }
        ClientCommands::Delete { client, yes } => {
            if !yes {
                return Err(GhlError::Config(
                    "refusing to delete without --yes".to_string(),
                ));
            }
            let client = app.resolve_client(&client).await?;
            app.storage.delete_client(&client.id).await?;
            println!("deleted client {}", client.id);
        }
    }
    Ok(())
}

fn client_line(client: &Client) -> String {
    format!(
        "{}  {:<24} {:<10} {:<8} {}",
        client.id,
        client.location_id,
        client.subscription_tier,
        if client.is_active { "active" } else { "inactive" },
        client.company_name.as_deref().unwrap_or("-"),
    )
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), GhlError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| GhlError::Internal(format!("failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}
