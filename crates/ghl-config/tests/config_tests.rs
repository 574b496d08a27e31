// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading.

use figment::Jail;
use ghl_config::diagnostic::ConfigError;
use ghl_config::model::GhlConfig;
use ghl_config::{load_and_validate_str, load_config, load_config_from_str};

const KEY: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

/// Every section and key deserializes from TOML.
#[test]
fn full_toml_deserializes() {
    let toml = format!(
        r#"
[assistant]
enabled = true
master_encryption_key = "{KEY}"
webhook_base_url = "https://hooks.example.com"
memory_window = 6
log_level = "debug"

[storage]
database_path = "/tmp/ghl-test.db"
wal_mode = false

[providers]
request_timeout_secs = 15
max_retries = 2
anthropic_api_version = "2023-06-01"
openai_base_url = "http://127.0.0.1:9000/v1"
ollama_base_url = "http://10.0.0.5:11434"
"#
    );

    let config = load_config_from_str(&toml).expect("valid TOML should deserialize");
    assert!(config.assistant.enabled);
    assert_eq!(config.assistant.master_encryption_key.as_deref(), Some(KEY));
    assert_eq!(
        config.assistant.webhook_base_url.as_deref(),
        Some("https://hooks.example.com")
    );
    assert_eq!(config.assistant.memory_window, 6);
    assert_eq!(config.storage.database_path, "/tmp/ghl-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.providers.request_timeout_secs, 15);
    assert_eq!(config.providers.max_retries, 2);
    assert_eq!(config.providers.openai_base_url, "http://127.0.0.1:9000/v1");
    assert_eq!(config.providers.ollama_base_url, "http://10.0.0.5:11434");
    // Untouched keys keep their defaults.
    assert_eq!(
        config.providers.anthropic_base_url,
        "https://api.anthropic.com/v1"
    );
}

#[test]
fn defaults_are_sensible() {
    let config = GhlConfig::default();
    assert!(config.assistant.enabled);
    assert!(config.assistant.master_encryption_key.is_none());
    assert_eq!(config.assistant.memory_window, 10);
    assert_eq!(config.assistant.log_level, "info");
    assert!(config.storage.database_path.ends_with("ghl.db"));
    assert!(config.storage.wal_mode);
    assert_eq!(config.providers.request_timeout_secs, 60);
    assert_eq!(config.providers.max_retries, 0);
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[assistant]
memory_windw = 4
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key must be rejected");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } if key == "memory_windw" => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("memory_window"));
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[providers]
request_timeout_secs = "soon"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("request_timeout_secs"))),
        "got: {errors:?}"
    );
}

#[test]
fn enabled_without_key_fails_validation() {
    let errors = load_and_validate_str("").unwrap_err();
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::MissingKey { key } if key == "assistant.master_encryption_key")
    ));
}

#[test]
fn disabled_module_needs_no_key() {
    let config = load_and_validate_str("[assistant]\nenabled = false\n").unwrap();
    assert!(!config.assistant.enabled);
}

#[test]
fn env_vars_override_files() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "ghl.toml",
            r#"
[assistant]
memory_window = 4

[providers]
request_timeout_secs = 30
"#,
        )?;
        jail.set_env("GHL_MASTER_ENCRYPTION_KEY", KEY);
        jail.set_env("GHL_ENABLED", "false");
        jail.set_env("GHL_PROVIDERS_REQUEST_TIMEOUT_SECS", "5");
        jail.set_env("GHL_STORAGE_DATABASE_PATH", "/var/lib/ghl/ghl.db");

        let config = load_config()?;
        assert_eq!(config.assistant.master_encryption_key.as_deref(), Some(KEY));
        assert!(!config.assistant.enabled);
        assert_eq!(config.assistant.memory_window, 4);
        assert_eq!(config.providers.request_timeout_secs, 5);
        assert_eq!(config.storage.database_path, "/var/lib/ghl/ghl.db");
        Ok(())
    });
}

#[test]
fn local_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "ghl.toml",
            "[providers]\ngroq_base_url = \"http://localhost:8081/openai/v1\"\n",
        )?;
        let config = load_config()?;
        assert_eq!(
            config.providers.groq_base_url,
            "http://localhost:8081/openai/v1"
        );
        Ok(())
    });
}
