// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `/etc/ghl-assistant/ghl.toml`, then
//! `~/.config/ghl-assistant/ghl.toml`, then `./ghl.toml`, with `GHL_*`
//! environment variables applied last.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::GhlConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ghl-assistant/ghl.toml";

/// Configuration file in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ghl.toml";

/// Keys that live in `[assistant]` but are set without a section prefix,
/// e.g. `GHL_MASTER_ENCRYPTION_KEY`.
const ASSISTANT_SHORTHAND_KEYS: &[&str] = &["master_encryption_key", "webhook_base_url", "enabled"];

/// Sections reachable as `GHL_<SECTION>_<KEY>`.
const SECTIONS: &[&str] = &["assistant", "storage", "providers"];

/// The user-level configuration file, if a config directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ghl-assistant").join("ghl.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<GhlConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<GhlConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GhlConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GhlConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GhlConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(GhlConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment.merge(Toml::file(LOCAL_CONFIG_FILE)).merge(env_provider())
}

/// Environment provider with explicit key mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `GHL_PROVIDERS_REQUEST_TIMEOUT_SECS` must become
/// `providers.request_timeout_secs`.
fn env_provider() -> Env {
    Env::prefixed("GHL_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    if ASSISTANT_SHORTHAND_KEYS.contains(&key) {
        return format!("assistant.{key}");
    }
    for section in SECTIONS {
        let prefix = format!("{section}_");
        if key.starts_with(&prefix) {
            return key.replacen(&prefix, &format!("{section}."), 1);
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_keys_map_into_assistant() {
        assert_eq!(
            map_env_key("master_encryption_key"),
            "assistant.master_encryption_key"
        );
        assert_eq!(map_env_key("enabled"), "assistant.enabled");
        assert_eq!(map_env_key("webhook_base_url"), "assistant.webhook_base_url");
    }

    #[test]
    fn section_keys_keep_inner_underscores() {
        assert_eq!(
            map_env_key("providers_request_timeout_secs"),
            "providers.request_timeout_secs"
        );
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("assistant_memory_window"), "assistant.memory_window");
    }

    #[test]
    fn unknown_keys_pass_through() {
        assert_eq!(map_env_key("mystery"), "mystery");
    }
}
