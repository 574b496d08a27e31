// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential lifecycle: register, rotate, order, activate, and decrypt.
//!
//! Secrets enter as [`SecretString`], are sealed by the [`CipherBox`] before
//! they reach the repository, and are only opened again by
//! [`CredentialStore::decrypt`] at dispatch time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ghl_core::traits::{CredentialRepository, NewCredential};
use ghl_core::types::{Credential, ModelConfig};
use ghl_core::{GhlError, ProviderType};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::cipher::CipherBox;

/// Timestamp format shared with the storage layer.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Owns every tenant's provider credentials.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn CredentialRepository>,
    cipher: Arc<CipherBox>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn CredentialRepository>, cipher: Arc<CipherBox>) -> Self {
        Self { repo, cipher }
    }

    /// Encrypts `secret` and persists a new credential.
    ///
    /// Fails with [`GhlError::DuplicateCredential`] if the client already has a
    /// credential for `provider_type`. Replacing a secret is [`Self::rotate`].
    pub async fn register(
        &self,
        client_id: &str,
        provider_type: ProviderType,
        secret: &SecretString,
        model_config: ModelConfig,
        priority: i32,
    ) -> Result<Credential, GhlError> {
        if provider_type.requires_api_key() && secret.expose_secret().trim().is_empty() {
            return Err(GhlError::Config(format!(
                "{provider_type} credentials require a non-empty API key"
            )));
        }
        if model_config.chat_model.trim().is_empty() {
            return Err(GhlError::Config("modelConfig.chatModel must not be empty".to_string()));
        }

        // The unique index settles races; this read gives the common case a
        // clean error without a failed write.
        if self.repo.find_credential(client_id, provider_type).await?.is_some() {
            return Err(GhlError::DuplicateCredential {
                client_id: client_id.to_string(),
                provider_type,
            });
        }

        let sealed = self.cipher.encrypt(secret.expose_secret())?;
        let credential = self
            .repo
            .insert_credential(NewCredential {
                client_id: client_id.to_string(),
                provider_type,
                secret: sealed,
                model_config,
                priority,
            })
            .await?;

        info!(
            client_id,
            provider = %provider_type,
            credential_id = %credential.id,
            priority,
            key = %mask_secret(secret.expose_secret()),
            "credential registered"
        );
        Ok(credential)
    }

    /// Re-encrypts the credential under a fresh IV. The previous ciphertext is
    /// overwritten.
    pub async fn rotate(
        &self,
        credential_id: &str,
        new_secret: &SecretString,
    ) -> Result<Credential, GhlError> {
        let current = self.get(credential_id).await?;
        if current.provider_type.requires_api_key() && new_secret.expose_secret().trim().is_empty()
        {
            return Err(GhlError::Config(format!(
                "{} credentials require a non-empty API key",
                current.provider_type
            )));
        }

        let sealed = self.cipher.encrypt(new_secret.expose_secret())?;
        let credential = self
            .repo
            .update_credential_secret(credential_id, &sealed)
            .await?;
        info!(
            credential_id,
            client_id = %credential.client_id,
            provider = %credential.provider_type,
            "credential rotated"
        );
        Ok(credential)
    }

    /// Active credentials in selection order: priority ascending, then most
    /// recently used first.
    pub async fn list_active(&self, client_id: &str) -> Result<Vec<Credential>, GhlError> {
        self.repo.list_active_credentials(client_id).await
    }

    /// All credentials of the client, including inactive ones.
    pub async fn list(&self, client_id: &str) -> Result<Vec<Credential>, GhlError> {
        self.repo.list_credentials(client_id).await
    }

    pub async fn get(&self, credential_id: &str) -> Result<Credential, GhlError> {
        self.repo
            .get_credential(credential_id)
            .await?
            .ok_or_else(|| GhlError::NotFound {
                entity: "credential",
                id: credential_id.to_string(),
            })
    }

    /// Records a successful use. Callers on the dispatch path run this
    /// detached so it never delays a response.
    pub async fn mark_used(
        &self,
        credential_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), GhlError> {
        let stamp = at.format(TIMESTAMP_FORMAT).to_string();
        self.repo.touch_credential(credential_id, &stamp).await?;
        debug!(credential_id, used_at = %stamp, "credential marked used");
        Ok(())
    }

    /// Soft-disables the credential. Usage rows keep their provider linkage.
    pub async fn deactivate(&self, credential_id: &str) -> Result<Credential, GhlError> {
        let credential = self.repo.set_credential_active(credential_id, false).await?;
        info!(credential_id, provider = %credential.provider_type, "credential deactivated");
        Ok(credential)
    }

    pub async fn activate(&self, credential_id: &str) -> Result<Credential, GhlError> {
        let credential = self.repo.set_credential_active(credential_id, true).await?;
        info!(credential_id, provider = %credential.provider_type, "credential activated");
        Ok(credential)
    }

    /// Replaces the model configuration and/or priority.
    pub async fn update_config(
        &self,
        credential_id: &str,
        model_config: Option<ModelConfig>,
        priority: Option<i32>,
    ) -> Result<Credential, GhlError> {
        if let Some(config) = &model_config {
            if config.chat_model.trim().is_empty() {
                return Err(GhlError::Config(
                    "modelConfig.chatModel must not be empty".to_string(),
                ));
            }
        }
        self.repo
            .update_credential_config(credential_id, model_config.as_ref(), priority)
            .await
    }

    pub async fn delete(&self, credential_id: &str) -> Result<(), GhlError> {
        self.repo.delete_credential(credential_id).await?;
        info!(credential_id, "credential deleted");
        Ok(())
    }

    /// Opens the credential's secret for one dispatch.
    pub fn decrypt(&self, credential: &Credential) -> Result<SecretString, GhlError> {
        self.cipher.decrypt(&credential.secret).inspect_err(|_| {
            tracing::error!(
                credential_id = %credential.id,
                client_id = %credential.client_id,
                provider = %credential.provider_type,
                "credential secret failed authentication"
            );
        })
    }
}

/// Preview of a secret for logs and CLI output: first and last four
/// characters, or `****` for short values.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
