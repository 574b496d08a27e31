// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential lifecycle against the SQLite repository.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ghl_core::traits::NewClient;
use ghl_core::types::{ClientSettings, ModelConfig};
use ghl_core::{ClientRepository, GhlError, ProviderType};
use ghl_storage::SqliteStorage;
use ghl_vault::{CipherBox, CredentialStore, MasterKey};
use secrecy::{ExposeSecret, SecretString};

struct Fixture {
    store: CredentialStore,
    client_id: String,
}

async fn fixture() -> Fixture {
    let storage = Arc::new(SqliteStorage::open_in_memory().await.unwrap());
    let client_id = storage
        .create_client(NewClient {
            location_id: "loc-vault".to_string(),
            company_name: None,
            subscription_tier: "starter".to_string(),
            settings: ClientSettings::default(),
        })
        .await
        .unwrap()
        .id;
    let cipher = Arc::new(CipherBox::new(&MasterKey::generate().unwrap()).unwrap());
    Fixture {
        store: CredentialStore::new(storage, cipher),
        client_id,
    }
}

fn key(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn register_encrypts_and_decrypts() {
    let fx = fixture().await;
    let cred = fx
        .store
        .register(
            &fx.client_id,
            ProviderType::OpenAi,
            &key("sk-test-1234567890"),
            ModelConfig::new("gpt-4o-mini"),
            0,
        )
        .await
        .unwrap();

    assert!(cred.is_active);
    assert!(!cred.secret.ciphertext.contains("sk-test"));
    assert_eq!(cred.secret.iv.len(), 32);
    assert_eq!(cred.secret.tag.len(), 32);

    let stored = fx.store.get(&cred.id).await.unwrap();
    let plain = fx.store.decrypt(&stored).unwrap();
    assert_eq!(plain.expose_secret(), "sk-test-1234567890");
}

#[tokio::test]
async fn register_rejects_duplicate_provider() {
    let fx = fixture().await;
    fx.store
        .register(
            &fx.client_id,
            ProviderType::Anthropic,
            &key("sk-ant-one"),
            ModelConfig::new("claude-3-5-haiku-20241022"),
            0,
        )
        .await
        .unwrap();

    let err = fx
        .store
        .register(
            &fx.client_id,
            ProviderType::Anthropic,
            &key("sk-ant-two"),
            ModelConfig::new("claude-3-5-haiku-20241022"),
            1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GhlError::DuplicateCredential { .. }));
    assert_eq!(fx.store.list(&fx.client_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn register_validates_inputs() {
    let fx = fixture().await;

    let err = fx
        .store
        .register(
            "no-such-client",
            ProviderType::Groq,
            &key("gsk-123"),
            ModelConfig::new("llama-3.1-8b-instant"),
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GhlError::NotFound { .. }));

    let err = fx
        .store
        .register(
            &fx.client_id,
            ProviderType::Groq,
            &key("   "),
            ModelConfig::new("llama-3.1-8b-instant"),
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GhlError::Config(_)));

    let err = fx
        .store
        .register(
            &fx.client_id,
            ProviderType::Groq,
            &key("gsk-123"),
            ModelConfig::new(""),
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GhlError::Config(_)));

    // Local models run without a key.
    fx.store
        .register(
            &fx.client_id,
            ProviderType::Ollama,
            &key(""),
            ModelConfig::new("llama3.2"),
            5,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn rotate_replaces_secret_with_fresh_iv() {
    let fx = fixture().await;
    let cred = fx
        .store
        .register(
            &fx.client_id,
            ProviderType::Together,
            &key("tg-old-secret"),
            ModelConfig::new("meta-llama/Llama-3.3-70B-Instruct-Turbo"),
            0,
        )
        .await
        .unwrap();

    let rotated = fx.store.rotate(&cred.id, &key("tg-new-secret")).await.unwrap();
    assert_eq!(rotated.id, cred.id);
    assert_ne!(rotated.secret.iv, cred.secret.iv);
    assert_eq!(
        fx.store.decrypt(&rotated).unwrap().expose_secret(),
        "tg-new-secret"
    );

    let err = fx.store.rotate("missing", &key("x")).await.unwrap_err();
    assert!(matches!(err, GhlError::NotFound { .. }));
}

#[tokio::test]
async fn selection_order_and_activation() {
    let fx = fixture().await;
    let mut ids = Vec::new();
    for (provider, priority) in [
        (ProviderType::Anthropic, 2),
        (ProviderType::OpenAi, 0),
        (ProviderType::Groq, 1),
    ] {
        let cred = fx
            .store
            .register(
                &fx.client_id,
                provider,
                &key("key-value-123"),
                ModelConfig::new("m"),
                priority,
            )
            .await
            .unwrap();
        ids.push(cred.id);
    }

    let order: Vec<ProviderType> = fx
        .store
        .list_active(&fx.client_id)
        .await
        .unwrap()
        .iter()
        .map(|c| c.provider_type)
        .collect();
    assert_eq!(
        order,
        vec![ProviderType::OpenAi, ProviderType::Groq, ProviderType::Anthropic]
    );

    fx.store.deactivate(&ids[1]).await.unwrap();
    let active = fx.store.list_active(&fx.client_id).await.unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].provider_type, ProviderType::Groq);

    fx.store.activate(&ids[1]).await.unwrap();
    assert_eq!(fx.store.list_active(&fx.client_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn mark_used_breaks_priority_ties() {
    let fx = fixture().await;
    let a = fx
        .store
        .register(&fx.client_id, ProviderType::OpenAi, &key("key-a-123"), ModelConfig::new("m"), 0)
        .await
        .unwrap();
    let b = fx
        .store
        .register(&fx.client_id, ProviderType::Groq, &key("key-b-123"), ModelConfig::new("m"), 0)
        .await
        .unwrap();

    let now = Utc::now();
    fx.store.mark_used(&b.id, now).await.unwrap();
    assert_eq!(fx.store.list_active(&fx.client_id).await.unwrap()[0].id, b.id);

    fx.store
        .mark_used(&a.id, now + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(fx.store.list_active(&fx.client_id).await.unwrap()[0].id, a.id);
}

#[tokio::test]
async fn update_config_and_delete() {
    let fx = fixture().await;
    let cred = fx
        .store
        .register(
            &fx.client_id,
            ProviderType::OpenAi,
            &key("sk-abcdefghijk"),
            ModelConfig::new("gpt-4o-mini"),
            0,
        )
        .await
        .unwrap();

    let mut config = ModelConfig::new("gpt-4o");
    config.temperature = Some(0.2);
    let updated = fx
        .store
        .update_config(&cred.id, Some(config.clone()), None)
        .await
        .unwrap();
    assert_eq!(updated.model_config, config);
    assert_eq!(updated.priority, 0);

    assert!(matches!(
        fx.store
            .update_config(&cred.id, Some(ModelConfig::new(" ")), None)
            .await,
        Err(GhlError::Config(_))
    ));

    fx.store.delete(&cred.id).await.unwrap();
    assert!(matches!(
        fx.store.get(&cred.id).await,
        Err(GhlError::NotFound { .. })
    ));
}

#[tokio::test]
async fn decrypt_with_other_key_fails_authentication() {
    let fx = fixture().await;
    let cred = fx
        .store
        .register(
            &fx.client_id,
            ProviderType::OpenAi,
            &key("sk-abcdefghijk"),
            ModelConfig::new("gpt-4o"),
            0,
        )
        .await
        .unwrap();

    let other = CipherBox::new(&MasterKey::generate().unwrap()).unwrap();
    let err = other.decrypt(&cred.secret).unwrap_err();
    assert!(matches!(err, GhlError::AuthenticationFailure));
}
