// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-type tag to implementation mapping, filled once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use ghl_core::error::DispatchErrorKind;
use ghl_core::{GhlError, ProviderDispatch, ProviderSettings, ProviderType};

/// Builds a vendor client for one decrypted credential.
pub type ProviderFactory = Arc<
    dyn Fn(ProviderSettings) -> Result<Arc<dyn ProviderDispatch>, GhlError> + Send + Sync,
>;

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<ProviderType, ProviderFactory>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("provider_types", &self.provider_types())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the factory for `provider_type`.
    pub fn register<F>(&mut self, provider_type: ProviderType, factory: F) -> &mut Self
    where
        F: Fn(ProviderSettings) -> Result<Arc<dyn ProviderDispatch>, GhlError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(provider_type, Arc::new(factory));
        self
    }

    /// Builder-style [`Self::register`].
    pub fn with<F>(mut self, provider_type: ProviderType, factory: F) -> Self
    where
        F: Fn(ProviderSettings) -> Result<Arc<dyn ProviderDispatch>, GhlError>
            + Send
            + Sync
            + 'static,
    {
        self.register(provider_type, factory);
        self
    }

    pub fn contains(&self, provider_type: ProviderType) -> bool {
        self.factories.contains_key(&provider_type)
    }

    /// Registered tags in a stable order.
    pub fn provider_types(&self) -> Vec<ProviderType> {
        let mut types: Vec<_> = self.factories.keys().copied().collect();
        types.sort();
        types
    }

    /// Instantiates the client for `settings.provider_type`.
    ///
    /// A tag without a factory is a non-retryable `InvalidRequest`: trying
    /// another credential would silently change the vendor.
    pub fn create(&self, settings: ProviderSettings) -> Result<Arc<dyn ProviderDispatch>, GhlError> {
        let provider_type = settings.provider_type;
        match self.factories.get(&provider_type) {
            Some(factory) => factory(settings),
            None => Err(GhlError::dispatch(
                DispatchErrorKind::InvalidRequest,
                format!("no provider implementation is registered for {provider_type}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ghl_core::types::ChatOptions;
    use secrecy::SecretString;

    fn settings(provider_type: ProviderType) -> ProviderSettings {
        ProviderSettings {
            provider_type,
            api_key: SecretString::from("k".to_string()),
            model: "m".into(),
            defaults: ChatOptions::default(),
            base_url: "http://localhost".into(),
            timeout: Duration::from_secs(1),
            max_retries: 0,
            api_version: None,
        }
    }

    #[test]
    fn missing_factory_is_invalid_request() {
        let registry = ProviderRegistry::new();
        let err = registry.create(settings(ProviderType::Together)).err().unwrap();
        match err {
            GhlError::Dispatch(e) => {
                assert_eq!(e.kind, DispatchErrorKind::InvalidRequest);
                assert!(e.message.contains("together"));
            }
            other => panic!("expected dispatch error, got {other:?}"),
        }
        assert!(!registry.contains(ProviderType::Together));
    }

    #[test]
    fn factories_receive_settings() {
        let registry = ProviderRegistry::new().with(ProviderType::Groq, |s| {
            Err(GhlError::Config(format!("built for {}", s.model)))
        });
        assert_eq!(registry.provider_types(), vec![ProviderType::Groq]);
        let err = registry.create(settings(ProviderType::Groq)).err().unwrap();
        assert_eq!(err.to_string(), "configuration error: built for m");
    }
}
