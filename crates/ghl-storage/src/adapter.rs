// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage adapter and repository traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ghl_config::model::StorageConfig;
use ghl_core::traits::{NewClient, NewCredential, NewModel, NewUsageLog, NewWebhookLog};
use ghl_core::types::{
    AvailableModel, Client, ClientSettings, ContextEntry, ConversationSession, Credential,
    EncryptedSecret, ModelConfig, ProviderType, SessionMetadata, UsageLog, UsageSummary,
    WebhookLog,
};
use ghl_core::{
    AdapterType, ClientRepository, CredentialRepository, GhlError, HealthStatus, ModelCatalog,
    PluginAdapter, SessionRepository, StorageAdapter, UsageRepository, WebhookRepository,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates every repository call to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. Nothing is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, GhlError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    /// An initialized storage backed by a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, GhlError> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            config: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        })
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, GhlError> {
        self.db.get().ok_or_else(|| GhlError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, GhlError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GhlError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), GhlError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| GhlError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), GhlError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for SqliteStorage {
    async fn create_client(&self, client: NewClient) -> Result<Client, GhlError> {
        queries::clients::create_client(self.db()?, client).await
    }

    async fn get_client(&self, id: &str) -> Result<Option<Client>, GhlError> {
        queries::clients::get_client(self.db()?, id).await
    }

    async fn find_client_by_location(
        &self,
        location_id: &str,
    ) -> Result<Option<Client>, GhlError> {
        queries::clients::find_client_by_location(self.db()?, location_id).await
    }

    async fn list_clients(&self) -> Result<Vec<Client>, GhlError> {
        queries::clients::list_clients(self.db()?).await
    }

    async fn update_client_settings(
        &self,
        id: &str,
        settings: &ClientSettings,
    ) -> Result<Client, GhlError> {
        queries::clients::update_client_settings(self.db()?, id, settings).await
    }

    async fn set_client_active(&self, id: &str, active: bool) -> Result<Client, GhlError> {
        queries::clients::set_client_active(self.db()?, id, active).await
    }

    async fn delete_client(&self, id: &str) -> Result<(), GhlError> {
        queries::clients::delete_client(self.db()?, id).await
    }
}

#[async_trait]
impl CredentialRepository for SqliteStorage {
    async fn insert_credential(&self, credential: NewCredential) -> Result<Credential, GhlError> {
        queries::credentials::insert_credential(self.db()?, credential).await
    }

    async fn get_credential(&self, id: &str) -> Result<Option<Credential>, GhlError> {
        queries::credentials::get_credential(self.db()?, id).await
    }

    async fn find_credential(
        &self,
        client_id: &str,
        provider_type: ProviderType,
    ) -> Result<Option<Credential>, GhlError> {
        queries::credentials::find_credential(self.db()?, client_id, provider_type).await
    }

    async fn list_credentials(&self, client_id: &str) -> Result<Vec<Credential>, GhlError> {
        queries::credentials::list_credentials(self.db()?, client_id, false).await
    }

    async fn list_active_credentials(
        &self,
        client_id: &str,
    ) -> Result<Vec<Credential>, GhlError> {
        queries::credentials::list_credentials(self.db()?, client_id, true).await
    }

    async fn update_credential_secret(
        &self,
        id: &str,
        secret: &EncryptedSecret,
    ) -> Result<Credential, GhlError> {
        queries::credentials::update_secret(self.db()?, id, secret).await
    }

    async fn update_credential_config(
        &self,
        id: &str,
        model_config: Option<&ModelConfig>,
        priority: Option<i32>,
    ) -> Result<Credential, GhlError> {
        queries::credentials::update_config(self.db()?, id, model_config, priority).await
    }

    async fn set_credential_active(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Credential, GhlError> {
        queries::credentials::set_active(self.db()?, id, active).await
    }

    async fn touch_credential(&self, id: &str, used_at: &str) -> Result<(), GhlError> {
        queries::credentials::touch(self.db()?, id, used_at).await
    }

    async fn delete_credential(&self, id: &str) -> Result<(), GhlError> {
        queries::credentials::delete_credential(self.db()?, id).await
    }
}

#[async_trait]
impl ModelCatalog for SqliteStorage {
    async fn upsert_model(&self, model: NewModel) -> Result<AvailableModel, GhlError> {
        queries::catalog::upsert_model(self.db()?, model).await
    }

    async fn find_model(
        &self,
        provider_type: ProviderType,
        model_id: &str,
    ) -> Result<Option<AvailableModel>, GhlError> {
        queries::catalog::find_model(self.db()?, provider_type, model_id).await
    }

    async fn list_models(
        &self,
        provider_type: Option<ProviderType>,
    ) -> Result<Vec<AvailableModel>, GhlError> {
        queries::catalog::list_models(self.db()?, provider_type).await
    }

    async fn set_model_active(&self, id: &str, active: bool) -> Result<(), GhlError> {
        queries::catalog::set_model_active(self.db()?, id, active).await
    }
}

#[async_trait]
impl SessionRepository for SqliteStorage {
    async fn get_or_create_session(
        &self,
        client_id: &str,
        conversation_id: &str,
        contact_id: Option<&str>,
        metadata: &SessionMetadata,
    ) -> Result<ConversationSession, GhlError> {
        queries::sessions::get_or_create_session(
            self.db()?,
            client_id,
            conversation_id,
            contact_id,
            metadata,
        )
        .await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>, GhlError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn find_session(
        &self,
        client_id: &str,
        conversation_id: &str,
    ) -> Result<Option<ConversationSession>, GhlError> {
        queries::sessions::find_session(self.db()?, client_id, conversation_id).await
    }

    async fn append_context(
        &self,
        session_id: &str,
        entry: &ContextEntry,
    ) -> Result<(), GhlError> {
        queries::sessions::append_context(self.db()?, session_id, entry).await
    }

    async fn delete_session(&self, id: &str) -> Result<(), GhlError> {
        queries::sessions::delete_session(self.db()?, id).await
    }
}

#[async_trait]
impl UsageRepository for SqliteStorage {
    async fn insert_usage(&self, entry: NewUsageLog) -> Result<UsageLog, GhlError> {
        queries::usage::insert_usage(self.db()?, entry).await
    }

    async fn list_usage(
        &self,
        client_id: &str,
        since: Option<&str>,
    ) -> Result<Vec<UsageLog>, GhlError> {
        queries::usage::list_usage(self.db()?, client_id, since).await
    }

    async fn usage_summary(
        &self,
        client_id: &str,
        since: Option<&str>,
    ) -> Result<UsageSummary, GhlError> {
        queries::usage::usage_summary(self.db()?, client_id, since).await
    }
}

#[async_trait]
impl WebhookRepository for SqliteStorage {
    async fn insert_webhook_log(&self, entry: NewWebhookLog) -> Result<WebhookLog, GhlError> {
        queries::webhooks::insert_webhook_log(self.db()?, entry).await
    }

    async fn list_webhook_logs(
        &self,
        client_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<WebhookLog>, GhlError> {
        queries::webhooks::list_webhook_logs(self.db()?, client_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        assert!(storage.list_clients().await.is_err());
    }

    #[tokio::test]
    async fn in_memory_storage_is_ready_and_seeded() {
        let storage = SqliteStorage::open_in_memory().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        let models = storage.list_models(Some(ProviderType::Ollama)).await.unwrap();
        assert!(!models.is_empty());
        storage.shutdown().await.unwrap();
    }
}
