// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghl doctor` command implementation.
//!
//! Runs diagnostic checks against the local installation: configuration and
//! master key, the database, and the vendors compiled into this binary. With
//! `--deep`, every stored credential is test-decrypted, which catches a master
//! key that no longer matches the data.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ghl_config::{ConfigError, GhlConfig, render_errors};
use ghl_core::{ClientRepository, GhlError, ProviderType};
use ghl_storage::SqliteStorage;
use ghl_vault::{CipherBox, CredentialStore};

use crate::app::provider_registry;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `ghl doctor` command.
///
/// `validated` is the outcome of loading and validating the configuration;
/// `fallback` is what the remaining checks run against when validation failed.
pub async fn run_doctor(
    validated: Result<GhlConfig, Vec<ConfigError>>,
    fallback: GhlConfig,
    deep: bool,
    plain: bool,
) -> Result<(), GhlError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let start = Instant::now();
    let (config, config_errors) = match validated {
        Ok(config) => (config, Vec::new()),
        Err(errors) => (fallback, errors),
    };
    let config = &config;

    let mut results = vec![if config_errors.is_empty() {
        CheckResult::new("Configuration", CheckStatus::Pass, "valid", start)
    } else {
        CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s), details below", config_errors.len()),
            start,
        )
    }];
    results.push(check_master_key(config));
    results.push(check_providers());

    let storage = check_database(config, &mut results).await;
    if deep {
        if let Some(storage) = storage {
            results.push(check_credentials(config, storage).await);
        }
    }

    println!();
    println!("  ghl doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", render(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
        if !deep {
            println!("  Run with --deep to test-decrypt stored credentials.");
        }
    } else {
        println!("  All checks passed.");
    }
    println!();

    if !config_errors.is_empty() {
        render_errors(&config_errors);
    }

    Ok(())
}

fn render(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

fn check_master_key(config: &GhlConfig) -> CheckResult {
    let start = Instant::now();
    match CipherBox::from_hex(config.assistant.master_encryption_key.as_deref()) {
        Ok(_) => CheckResult::new("Master key", CheckStatus::Pass, "valid", start),
        Err(e) => CheckResult::new("Master key", CheckStatus::Fail, e.to_string(), start),
    }
}

fn check_providers() -> CheckResult {
    let start = Instant::now();
    let registry = provider_registry();
    let missing: Vec<String> = ProviderType::ALL
        .iter()
        .filter(|p| !registry.contains(**p))
        .map(ToString::to_string)
        .collect();
    if missing.is_empty() {
        CheckResult::new("Providers", CheckStatus::Pass, "all vendors compiled in", start)
    } else {
        CheckResult::new(
            "Providers",
            CheckStatus::Warn,
            format!("not compiled in: {}", missing.join(", ")),
            start,
        )
    }
}

/// Opens the database (running migrations) and reports the tenant count.
async fn check_database(
    config: &GhlConfig,
    results: &mut Vec<CheckResult>,
) -> Option<Arc<SqliteStorage>> {
    let start = Instant::now();
    let storage = match SqliteStorage::open(config.storage.clone()).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            results.push(CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start));
            return None;
        }
    };
    match storage.list_clients().await {
        Ok(clients) => {
            let active = clients.iter().filter(|c| c.is_active).count();
            results.push(CheckResult::new(
                "Database",
                CheckStatus::Pass,
                format!(
                    "{} ({} clients, {active} active)",
                    config.storage.database_path,
                    clients.len()
                ),
                start,
            ));
            Some(storage)
        }
        Err(e) => {
            results.push(CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start));
            None
        }
    }
}

/// Decrypts every stored credential under the configured key.
async fn check_credentials(config: &GhlConfig, storage: Arc<SqliteStorage>) -> CheckResult {
    let start = Instant::now();
    let cipher = match CipherBox::from_hex(config.assistant.master_encryption_key.as_deref()) {
        Ok(cipher) => Arc::new(cipher),
        Err(_) => {
            return CheckResult::new("Credentials", CheckStatus::Fail, "no usable master key", start);
        }
    };
    let store = CredentialStore::new(storage.clone(), cipher);
    let clients = match storage.list_clients().await {
        Ok(clients) => clients,
        Err(e) => return CheckResult::new("Credentials", CheckStatus::Fail, e.to_string(), start),
    };

    let mut total = 0usize;
    let mut broken = Vec::new();
    for client in &clients {
        let credentials = match store.list(&client.id).await {
            Ok(credentials) => credentials,
            Err(e) => {
                return CheckResult::new("Credentials", CheckStatus::Fail, e.to_string(), start);
            }
        };
        for credential in &credentials {
            total += 1;
            if store.decrypt(credential).is_err() {
                broken.push(credential.id.clone());
            }
        }
    }

    if broken.is_empty() {
        CheckResult::new(
            "Credentials",
            CheckStatus::Pass,
            format!("{total} decrypt under the current key"),
            start,
        )
    } else {
        CheckResult::new(
            "Credentials",
            CheckStatus::Fail,
            format!("{} of {total} fail authentication: {}", broken.len(), broken.join(", ")),
            start,
        )
    }
}
