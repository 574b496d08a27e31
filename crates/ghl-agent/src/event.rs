// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound events and the replies produced for them.

use ghl_core::GhlError;
use ghl_core::types::{ProviderType, SessionMetadata, TokenUsage};
use serde::{Deserialize, Serialize};

/// Event type used when the caller supplies none.
pub const DEFAULT_EVENT_TYPE: &str = "InboundMessage";

/// One inbound conversation message, already verified and routed by the
/// webhook boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    /// Tenant's external location id.
    pub location_id: String,
    /// External conversation thread id.
    pub conversation_id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    /// Text of the inbound message.
    pub message: String,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_string()
}

impl InboundEvent {
    pub fn message(
        location_id: impl Into<String>,
        conversation_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            conversation_id: conversation_id.into(),
            contact_id: None,
            event_type: default_event_type(),
            message: message.into(),
            metadata: SessionMetadata::default(),
        }
    }

    pub fn with_contact(mut self, contact_id: impl Into<String>) -> Self {
        self.contact_id = Some(contact_id.into());
        self
    }

    /// The audit payload stored with the webhook log.
    pub fn payload(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }
}

/// The assistant's answer to one inbound event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub client_id: String,
    pub session_id: String,
    pub content: String,
    pub provider_type: ProviderType,
    pub model: String,
    pub usage: Option<TokenUsage>,
    /// Candidates tried before one answered.
    pub attempts: usize,
}

/// HTTP-style status recorded in the webhook audit for an outcome.
pub fn response_status(outcome: &Result<AssistantReply, GhlError>) -> u16 {
    match outcome {
        Ok(_) => 200,
        Err(GhlError::NotFound { .. }) => 404,
        Err(GhlError::NoActiveProvider { .. } | GhlError::DuplicateCredential { .. }) => 409,
        Err(GhlError::ModuleDisabled | GhlError::AllProvidersExhausted { .. }) => 503,
        Err(e) if e.is_retryable() => 503,
        Err(_) => 500,
    }
}
