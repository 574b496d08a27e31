// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghl chat`: one message to a tenant's providers, from the terminal.
//!
//! Without `--conversation` the message is dispatched directly through the
//! selector. With it, the message takes the same path as an inbound webhook
//! event and lands in that conversation's session.

use std::io::Write;

use clap::Args;
use futures::StreamExt;
use ghl_agent::InboundEvent;
use ghl_agent::context::{request_options, system_prompt};
use ghl_core::types::{ChatMessage, Client, StreamEventType, TokenUsage};
use ghl_core::GhlError;
use ghl_router::DispatchRequest;

use crate::app::App;

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Client id or location id.
    #[arg(long)]
    pub client: String,
    /// Print the reply as it is generated.
    #[arg(long)]
    pub stream: bool,
    /// Conversation id; keeps history in that conversation's session.
    #[arg(long, conflicts_with = "stream")]
    pub conversation: Option<String>,
    pub message: String,
}

pub async fn run(app: &App, args: ChatArgs) -> Result<(), GhlError> {
    let client = app.resolve_client(&args.client).await?;

    if let Some(conversation_id) = args.conversation {
        let reply = app
            .assistant
            .handle(InboundEvent::message(
                client.location_id.clone(),
                conversation_id,
                args.message,
            ))
            .await?;
        println!("{}", reply.content);
        eprintln!(
            "[{} {} attempts={} {}]",
            reply.provider_type,
            reply.model,
            reply.attempts,
            usage_note(reply.usage.as_ref())
        );
        return Ok(());
    }

    let request = direct_request(&client, args.message);
    if args.stream {
        stream_reply(app, &request).await
    } else {
        let outcome = app.selector.chat(&request).await?;
        println!("{}", outcome.response.content);
        eprintln!(
            "[{} {} attempts={} {}]",
            outcome.provider_type,
            outcome.response.model,
            outcome.attempts,
            usage_note(outcome.response.usage.as_ref())
        );
        Ok(())
    }
}

fn direct_request(client: &Client, message: String) -> DispatchRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(prompt) = system_prompt(client) {
        messages.push(ChatMessage::system(prompt));
    }
    messages.push(ChatMessage::user(message));
    DispatchRequest::new(client.id.clone(), messages).with_options(request_options(client))
}

async fn stream_reply(app: &App, request: &DispatchRequest) -> Result<(), GhlError> {
    let selected = app.selector.stream_chat(request).await?;
    let provider = selected.provider_type;
    let model = selected.model;
    let attempts = selected.attempts;
    let mut stream = selected.stream;
    let mut usage = None;
    let mut stdout = std::io::stdout();

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                println!();
                return Err(e);
            }
        };
        match chunk.event_type {
            StreamEventType::Delta => {
                if let Some(text) = chunk.text {
                    print!("{text}");
                    let _ = stdout.flush();
                }
            }
            StreamEventType::Usage => usage = chunk.usage,
            StreamEventType::Stop => break,
        }
    }
    println!();
    eprintln!(
        "[{provider} {model} attempts={attempts} {}]",
        usage_note(usage.as_ref())
    );
    Ok(())
}

fn usage_note(usage: Option<&TokenUsage>) -> String {
    match usage {
        Some(u) => format!(
            "tokens in={} out={} total={}",
            u.input_tokens, u.output_tokens, u.total_tokens
        ),
        None => "usage unreported".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghl_core::types::ClientSettings;

    fn client(settings: ClientSettings) -> Client {
        Client {
            id: "c-1".into(),
            location_id: "loc-1".into(),
            company_name: None,
            subscription_tier: "starter".into(),
            is_active: true,
            settings,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn direct_request_carries_prompt_and_options() {
        let mut settings = ClientSettings {
            max_tokens: Some(200),
            ..ClientSettings::default()
        };
        settings
            .extra
            .insert("systemPrompt".into(), serde_json::json!("Be brief."));
        let request = direct_request(&client(settings), "hello".into());
        assert_eq!(request.client_id, "c-1");
        assert_eq!(
            request.messages,
            vec![ChatMessage::system("Be brief."), ChatMessage::user("hello")]
        );
        assert_eq!(request.options.max_tokens, Some(200));
        assert!(request.session_id.is_none());
    }

    #[test]
    fn usage_note_formats_totals() {
        assert_eq!(
            usage_note(Some(&TokenUsage::new(3, 4))),
            "tokens in=3 out=4 total=7"
        );
        assert_eq!(usage_note(None), "usage unreported");
    }
}
