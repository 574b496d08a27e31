// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for one inbound message.
//!
//! The prompt is the client's optional system prompt followed by the most
//! recent entries of the session's context log.

use ghl_core::types::{ChatMessage, ChatOptions, ChatRole, Client, ContextEntry};

/// Client setting holding a per-tenant system prompt.
pub const SYSTEM_PROMPT_KEY: &str = "systemPrompt";

/// Number of context entries sent with each request: the client's
/// `memoryWindow` setting, else the configured default. Never zero.
pub fn memory_window(client: &Client, default_window: usize) -> usize {
    client
        .settings
        .memory_window
        .unwrap_or(default_window)
        .max(1)
}

/// The tenant's system prompt, if one is configured and non-blank.
pub fn system_prompt(client: &Client) -> Option<&str> {
    client
        .settings
        .extra
        .get(SYSTEM_PROMPT_KEY)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Builds the message list from the last `window` context entries.
///
/// System entries stored in the log are skipped; the tenant prompt is always
/// taken from current settings.
pub fn assemble_messages(
    client: &Client,
    context: &[ContextEntry],
    window: usize,
) -> Vec<ChatMessage> {
    let start = context.len().saturating_sub(window);
    let mut messages = Vec::with_capacity(window + 1);
    if let Some(prompt) = system_prompt(client) {
        messages.push(ChatMessage::system(prompt));
    }
    messages.extend(
        context[start..]
            .iter()
            .filter(|entry| entry.role != ChatRole::System)
            .map(|entry| ChatMessage::new(entry.role, entry.content.clone())),
    );
    messages
}

/// Client settings become request options; unset fields fall through to the
/// credential's model configuration.
pub fn request_options(client: &Client) -> ChatOptions {
    ChatOptions {
        max_tokens: client.settings.max_tokens,
        temperature: client.settings.temperature,
        ..ChatOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghl_core::types::ClientSettings;

    fn client(settings: ClientSettings) -> Client {
        Client {
            id: "c1".into(),
            location_id: "loc-1".into(),
            company_name: None,
            subscription_tier: "starter".into(),
            is_active: true,
            settings,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    fn entry(role: ChatRole, content: &str) -> ContextEntry {
        ContextEntry {
            role,
            content: content.into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn window_keeps_most_recent_entries() {
        let log: Vec<_> = (0..6)
            .map(|i| {
                let role = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
                entry(role, &format!("m{i}"))
            })
            .collect();
        let messages = assemble_messages(&client(ClientSettings::default()), &log, 3);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5"]);
    }

    #[test]
    fn system_prompt_leads_and_is_not_counted() {
        let mut settings = ClientSettings::default();
        settings
            .extra
            .insert(SYSTEM_PROMPT_KEY.into(), serde_json::json!("You sell roofs."));
        let log = vec![entry(ChatRole::User, "hi"), entry(ChatRole::Assistant, "hello")];
        let messages = assemble_messages(&client(settings), &log, 1);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("You sell roofs."));
        assert_eq!(messages[1], ChatMessage::assistant("hello"));
    }

    #[test]
    fn client_window_overrides_default() {
        let settings = ClientSettings {
            memory_window: Some(4),
            ..Default::default()
        };
        assert_eq!(memory_window(&client(settings), 10), 4);
        let zero = ClientSettings {
            memory_window: Some(0),
            ..Default::default()
        };
        assert_eq!(memory_window(&client(zero), 10), 1);
        assert_eq!(memory_window(&client(ClientSettings::default()), 10), 10);
    }

    #[test]
    fn settings_map_to_options() {
        let settings = ClientSettings {
            max_tokens: Some(300),
            temperature: Some(0.4),
            ..Default::default()
        };
        let options = request_options(&client(settings));
        assert_eq!(options.max_tokens, Some(300));
        assert_eq!(options.temperature, Some(0.4));
        assert_eq!(options.top_p, None);
    }
}
