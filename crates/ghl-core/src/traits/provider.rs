// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uniform chat contract implemented once per AI vendor.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::GhlError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, ChatOptions, ChatResponse, ChatStream, ProviderType};

/// Everything a vendor client needs to serve one credential.
///
/// Built per dispatch from the decrypted credential and the `[providers]`
/// configuration; dropped when the dispatch ends.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider_type: ProviderType,
    pub api_key: SecretString,
    pub model: String,
    /// Credential-level option defaults; request options win.
    pub defaults: ChatOptions,
    pub base_url: String,
    pub timeout: Duration,
    /// In-adapter retries for transient failures before failover.
    pub max_retries: u32,
    /// Vendor API version header, where the vendor uses one.
    pub api_version: Option<String>,
}

/// A vendor client bound to one decrypted credential.
///
/// Implementations must map every vendor failure into a
/// [`DispatchError`](crate::error::DispatchError) so the selector can decide
/// on failover without knowing the vendor.
#[async_trait]
pub trait ProviderDispatch: PluginAdapter {
    /// The provider tag this client serves.
    fn provider_type(&self) -> ProviderType;

    /// The model requests are sent to.
    fn model(&self) -> &str;

    /// Sends the conversation and waits for the full response.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, GhlError>;

    /// Opens a streaming response.
    ///
    /// Text deltas arrive in the order the vendor emitted them, without
    /// duplicates. A dropped connection yields a `StreamInterrupted` error
    /// item; earlier deltas stay valid.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatStream, GhlError>;
}
