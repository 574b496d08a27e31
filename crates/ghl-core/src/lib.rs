// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the GHL AI assistant.
//!
//! This crate provides the error taxonomy, entity types, and the adapter and
//! repository traits every other crate in the workspace builds on.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DispatchError, DispatchErrorKind, GhlError};
pub use types::{AdapterType, HealthStatus, ProviderType};

pub use traits::{
    ClientRepository, CredentialRepository, ModelCatalog, PluginAdapter, ProviderDispatch,
    ProviderSettings, SessionRepository, StorageAdapter, UsageRepository, WebhookRepository,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [AdapterType::Provider, AdapterType::Storage] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), variant);
            let json = serde_json::to_string(&variant).unwrap();
            let parsed: AdapterType = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        assert_ne!(HealthStatus::Degraded("slow".into()), healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }

    #[test]
    fn traits_are_object_safe() {
        fn _provider(_: &dyn ProviderDispatch) {}
        fn _storage(_: &dyn StorageAdapter) {}
        fn _clients(_: &dyn ClientRepository) {}
        fn _credentials(_: &dyn CredentialRepository) {}
        fn _models(_: &dyn ModelCatalog) {}
        fn _sessions(_: &dyn SessionRepository) {}
        fn _usage(_: &dyn UsageRepository) {}
        fn _webhooks(_: &dyn WebhookRepository) {}
    }
}
