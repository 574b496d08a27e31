// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound conversation handling for the GHL assistant.
//!
//! The [`Assistant`] turns one inbound event into one reply:
//! - Resolves the tenant by location id
//! - Keeps the conversation's session and append-only context log
//! - Dispatches the recent context through the [`ProviderSelector`]
//! - Writes one webhook audit row per event, whatever the outcome

pub mod context;
pub mod event;

use std::sync::Arc;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use ghl_config::AssistantConfig;
use ghl_core::traits::NewWebhookLog;
use ghl_core::types::{ChatRole, Client, ContextEntry};
use ghl_core::{ClientRepository, GhlError, SessionRepository, WebhookRepository};
use ghl_router::{DispatchRequest, ProviderSelector};
use tracing::{debug, error, info, warn};

pub use event::{AssistantReply, InboundEvent, response_status};

use crate::context::{assemble_messages, memory_window, request_options};

/// Handles inbound conversation events for every tenant.
pub struct Assistant {
    config: AssistantConfig,
    clients: Arc<dyn ClientRepository>,
    sessions: Arc<dyn SessionRepository>,
    webhooks: Arc<dyn WebhookRepository>,
    selector: Arc<ProviderSelector>,
}

impl Assistant {
    pub fn new(
        config: AssistantConfig,
        clients: Arc<dyn ClientRepository>,
        sessions: Arc<dyn SessionRepository>,
        webhooks: Arc<dyn WebhookRepository>,
        selector: Arc<ProviderSelector>,
    ) -> Self {
        info!(
            enabled = config.enabled,
            memory_window = config.memory_window,
            "assistant initialized"
        );
        Self {
            config,
            clients,
            sessions,
            webhooks,
            selector,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Answers one inbound message.
    ///
    /// Exactly one webhook log row is written per call. Its status is 200 on
    /// success and otherwise derived from the error by [`response_status`].
    pub async fn handle(&self, event: InboundEvent) -> Result<AssistantReply, GhlError> {
        let started = Instant::now();
        let mut client_id = None;
        let outcome = self.process(&event, &mut client_id).await;
        let status = response_status(&outcome);

        match &outcome {
            Ok(reply) => info!(
                client_id = %reply.client_id,
                session_id = %reply.session_id,
                provider = %reply.provider_type,
                attempts = reply.attempts,
                duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "inbound message answered"
            ),
            Err(e) => warn!(
                location_id = %event.location_id,
                conversation_id = %event.conversation_id,
                status,
                error = %e,
                "inbound message not answered"
            ),
        }

        let audit = NewWebhookLog {
            client_id,
            event_type: Some(event.event_type.clone()),
            payload: event.payload(),
            response_status: Some(status),
            error_message: outcome.as_ref().err().map(|e| e.to_string()),
        };
        if let Err(e) = self.webhooks.insert_webhook_log(audit).await {
            error!(location_id = %event.location_id, error = %e, "failed to write webhook log");
        }

        outcome
    }

    async fn process(
        &self,
        event: &InboundEvent,
        client_id: &mut Option<String>,
    ) -> Result<AssistantReply, GhlError> {
        if !self.config.enabled {
            return Err(GhlError::ModuleDisabled);
        }

        let client = self.resolve_client(&event.location_id).await?;
        *client_id = Some(client.id.clone());

        let session = self
            .sessions
            .get_or_create_session(
                &client.id,
                &event.conversation_id,
                event.contact_id.as_deref(),
                &event.metadata,
            )
            .await?;

        let user_entry = context_entry(ChatRole::User, &event.message);
        self.sessions.append_context(&session.id, &user_entry).await?;
        let mut log = session.context;
        log.push(user_entry);

        let window = memory_window(&client, self.config.memory_window);
        let messages = assemble_messages(&client, &log, window);
        debug!(
            session_id = %session.id,
            window,
            messages = messages.len(),
            "prompt assembled"
        );

        let request = DispatchRequest::new(client.id.clone(), messages)
            .with_session(session.id.clone())
            .with_options(request_options(&client));
        let outcome = self.selector.chat(&request).await?;

        self.sessions
            .append_context(
                &session.id,
                &context_entry(ChatRole::Assistant, &outcome.response.content),
            )
            .await?;

        Ok(AssistantReply {
            client_id: client.id,
            session_id: session.id,
            content: outcome.response.content,
            provider_type: outcome.provider_type,
            model: outcome.response.model,
            usage: outcome.response.usage,
            attempts: outcome.attempts,
        })
    }

    /// Only active tenants are served.
    async fn resolve_client(&self, location_id: &str) -> Result<Client, GhlError> {
        match self.clients.find_client_by_location(location_id).await? {
            Some(client) if client.is_active => Ok(client),
            _ => Err(GhlError::NotFound {
                entity: "client",
                id: location_id.to_string(),
            }),
        }
    }
}

fn context_entry(role: ChatRole, content: &str) -> ContextEntry {
    ContextEntry {
        role,
        content: content.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
