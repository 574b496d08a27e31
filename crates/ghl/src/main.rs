// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ghl - administration CLI for the multi-tenant GHL AI assistant.
//!
//! This is the binary entry point: key generation, tenant and credential
//! administration, the model catalog, ad-hoc chat, and usage reports.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod chat;
mod clients;
mod credentials;
mod doctor;
mod models;
mod usage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ghl_config::{ConfigError, GhlConfig};
use ghl_core::GhlError;
use ghl_vault::MasterKey;

use crate::app::App;

/// ghl - administration CLI for the multi-tenant GHL AI assistant.
#[derive(Parser, Debug)]
#[command(name = "ghl", version, about, long_about = None)]
struct Cli {
    /// Configuration file; replaces the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new master encryption key.
    Keygen,
    /// Check configuration, database, and stored credentials.
    Doctor {
        /// Also test-decrypt every stored credential.
        #[arg(long)]
        deep: bool,
    },
    /// Manage tenants.
    #[command(subcommand)]
    Client(clients::ClientCommands),
    /// Manage provider credentials.
    #[command(subcommand)]
    Credential(credentials::CredentialCommands),
    /// Manage the model pricing catalog.
    #[command(subcommand)]
    Models(models::ModelCommands),
    /// Send one message through a tenant's providers.
    Chat(chat::ChatArgs),
    /// Show a tenant's usage and cost.
    Usage(usage::UsageArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Needs neither configuration nor storage.
    if let Commands::Keygen = cli.command {
        return match MasterKey::generate() {
            Ok(key) => {
                println!("{}", key.to_hex().as_str());
                eprintln!("store this as GHL_MASTER_ENCRYPTION_KEY; losing it makes every stored credential unreadable");
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        };
    }

    let validated = load(cli.config.as_deref());

    if let Commands::Doctor { deep } = cli.command {
        init_tracing("warn");
        let fallback = raw(cli.config.as_deref());
        return match doctor::run_doctor(validated, fallback, deep, cli.plain).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e),
        };
    }

    let config = match validated {
        Ok(config) => config,
        Err(errors) => {
            ghl_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.assistant.log_level);

    match run(config, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

async fn run(config: GhlConfig, command: Commands) -> Result<(), GhlError> {
    let app = App::open(config).await?;
    match command {
        Commands::Client(command) => clients::run(&app, command).await,
        Commands::Credential(command) => credentials::run(&app, command).await,
        Commands::Models(command) => models::run(&app, command).await,
        Commands::Chat(args) => chat::run(&app, args).await,
        Commands::Usage(args) => usage::run(&app, args).await,
        Commands::Keygen | Commands::Doctor { .. } => Ok(()),
    }
}

fn load(path: Option<&Path>) -> Result<GhlConfig, Vec<ConfigError>> {
    match path {
        Some(path) => ghl_config::load_and_validate_path(path),
        None => ghl_config::load_and_validate(),
    }
}

/// Unvalidated configuration, or defaults when even that fails.
fn raw(path: Option<&Path>) -> GhlConfig {
    let loaded = match path {
        Some(path) => ghl_config::load_config_from_path(path),
        None => ghl_config::load_config(),
    };
    loaded.unwrap_or_default()
}

fn fail(err: &GhlError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::FAILURE
}

/// Logs go to stderr so command output stays pipeable. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ghl={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn credential_add_parses_provider_tag() {
        let cli = Cli::try_parse_from([
            "ghl",
            "credential",
            "add",
            "--client",
            "loc-1",
            "--provider",
            "groq",
            "--model",
            "llama-3.1-8b-instant",
            "--key-env",
            "GROQ_KEY",
        ])
        .unwrap();
        match cli.command {
            Commands::Credential(credentials::CredentialCommands::Add {
                provider,
                priority,
                key_env,
                ..
            }) => {
                assert_eq!(provider, ghl_core::ProviderType::Groq);
                assert_eq!(priority, 1);
                assert_eq!(key_env.as_deref(), Some("GROQ_KEY"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn api_key_is_not_an_argument() {
        let parsed = Cli::try_parse_from([
            "ghl",
            "credential",
            "add",
            "--client",
            "loc-1",
            "--provider",
            "openai",
            "--model",
            "gpt-4o-mini",
            "--api-key",
            "sk-live",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn chat_stream_conflicts_with_conversation() {
        let parsed = Cli::try_parse_from([
            "ghl",
            "chat",
            "--client",
            "loc-1",
            "--stream",
            "--conversation",
            "conv-1",
            "hi",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let parsed = Cli::try_parse_from([
            "ghl", "models", "list", "--provider", "mistral",
        ]);
        assert!(parsed.is_err());
    }
}
