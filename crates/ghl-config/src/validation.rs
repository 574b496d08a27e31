// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! All failures are collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::GhlConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Returns true when `key` is exactly 64 hexadecimal characters.
pub fn is_valid_master_key(key: &str) -> bool {
    key.len() == 64 && key.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &GhlConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let assistant = &config.assistant;

    if assistant.enabled {
        match assistant.master_encryption_key.as_deref() {
            None | Some("") => errors.push(ConfigError::MissingKey {
                key: "assistant.master_encryption_key".to_string(),
            }),
            Some(key) if !is_valid_master_key(key) => errors.push(ConfigError::Validation {
                message: format!(
                    "assistant.master_encryption_key must be exactly 64 hex characters (32 bytes), got {} characters",
                    key.len()
                ),
            }),
            Some(_) => {}
        }
    }

    if let Some(url) = assistant.webhook_base_url.as_deref() {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            errors.push(ConfigError::Validation {
                message: format!("assistant.webhook_base_url `{url}` must be an http(s) URL"),
            });
        }
    }

    if assistant.memory_window == 0 {
        errors.push(ConfigError::Validation {
            message: "assistant.memory_window must be at least 1".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&assistant.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "assistant.log_level `{}` is not one of {}",
                assistant.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.providers.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "providers.request_timeout_secs must be greater than 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> GhlConfig {
        let mut config = GhlConfig::default();
        config.assistant.master_encryption_key = Some("0f".repeat(32));
        config
    }

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors.iter().any(|e| match e {
            ConfigError::Validation { message } => message.contains(needle),
            ConfigError::MissingKey { key } => key.contains(needle),
            _ => false,
        })
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn enabled_module_requires_master_key() {
        let config = GhlConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "master_encryption_key"));
    }

    #[test]
    fn disabled_module_skips_master_key() {
        let mut config = GhlConfig::default();
        config.assistant.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn short_or_non_hex_key_fails() {
        let mut config = valid_config();
        config.assistant.master_encryption_key = Some("abc123".into());
        assert!(validate_config(&config).is_err());

        config.assistant.master_encryption_key = Some("zz".repeat(32));
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "64 hex characters"));
    }

    #[test]
    fn uppercase_hex_key_is_accepted() {
        assert!(is_valid_master_key(&"AB".repeat(32)));
        assert!(!is_valid_master_key(&"AB".repeat(33)));
    }

    #[test]
    fn errors_are_collected_not_short_circuited() {
        let mut config = valid_config();
        config.assistant.memory_window = 0;
        config.assistant.webhook_base_url = Some("ftp://example.com".into());
        config.providers.request_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_message(&errors, "memory_window"));
        assert!(has_message(&errors, "webhook_base_url"));
        assert!(has_message(&errors, "request_timeout_secs"));
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = valid_config();
        config.assistant.log_level = "loud".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "log_level"));
    }
}
