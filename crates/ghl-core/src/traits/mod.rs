// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter and repository trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use provider::{ProviderDispatch, ProviderSettings};
pub use storage::{
    ClientRepository, CredentialRepository, ModelCatalog, NewClient, NewCredential, NewModel,
    NewUsageLog, NewWebhookLog, SessionRepository, StorageAdapter, UsageRepository,
    WebhookRepository,
};
