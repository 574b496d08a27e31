// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message handling against a temp database and scripted vendors.

use ghl_agent::InboundEvent;
use ghl_core::error::DispatchErrorKind;
use ghl_core::types::{ChatMessage, ChatRole, ClientSettings};
use ghl_core::{ClientRepository, GhlError, ProviderType, SessionRepository};
use ghl_test_utils::{DEFAULT_REPLY, Scripted, TestHarness};

#[tokio::test]
async fn reply_is_stored_in_session_context() {
    let h = TestHarness::new().await.unwrap();
    let client = h.create_client("loc-ctx").await.unwrap();
    h.add_credential(&client.id, ProviderType::OpenAi, 1).await.unwrap();
    h.scripted(ProviderType::OpenAi)
        .push(Scripted::reply("We are open 8 to 5.", 12, 6))
        .await;

    let reply = h
        .send_message("loc-ctx", "conv-1", "When are you open?")
        .await
        .unwrap();
    assert_eq!(reply.client_id, client.id);
    assert_eq!(reply.content, "We are open 8 to 5.");
    assert_eq!(reply.provider_type, ProviderType::OpenAi);
    assert_eq!(reply.attempts, 1);

    let session = h
        .storage
        .get_session(&reply.session_id)
        .await
        .unwrap()
        .unwrap();
    let roles: Vec<_> = session.context.iter().map(|e| e.role).collect();
    assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
    assert_eq!(session.context[1].content, "We are open 8 to 5.");

    let usage = h.usage(&client.id).await.unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].session_id.as_deref(), Some(reply.session_id.as_str()));

    let logs = h.webhook_logs(Some(&client.id)).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].response_status, Some(200));
    assert_eq!(logs[0].event_type.as_deref(), Some("InboundMessage"));
}

#[tokio::test]
async fn same_conversation_reuses_session_and_windows_context() {
    let h = TestHarness::builder()
        .with_memory_window(3)
        .build()
        .await
        .unwrap();
    let client = h.create_client("loc-window").await.unwrap();
    h.add_credential(&client.id, ProviderType::Groq, 1).await.unwrap();

    let first = h.send_message("loc-window", "conv-7", "one").await.unwrap();
    let second = h.send_message("loc-window", "conv-7", "two").await.unwrap();
    assert_eq!(first.session_id, second.session_id);

    // Only the last three entries are sent.
    h.send_message("loc-window", "conv-7", "three").await.unwrap();
    let sent = h.scripted(ProviderType::Groq).last_messages().await;
    assert_eq!(
        sent,
        vec![
            ChatMessage::user("two"),
            ChatMessage::assistant(DEFAULT_REPLY),
            ChatMessage::user("three"),
        ]
    );

    let other = h.send_message("loc-window", "conv-8", "hi").await.unwrap();
    assert_ne!(other.session_id, first.session_id);
}

#[tokio::test]
async fn tenant_system_prompt_leads_the_conversation() {
    let h = TestHarness::new().await.unwrap();
    let mut settings = ClientSettings::default();
    settings.extra.insert(
        "systemPrompt".to_string(),
        serde_json::json!("You answer for a roofing company."),
    );
    let client = h.create_client_with("loc-prompt", settings).await.unwrap();
    h.add_credential(&client.id, ProviderType::Anthropic, 1).await.unwrap();

    h.send_message("loc-prompt", "conv-1", "Hello").await.unwrap();
    let sent = h.scripted(ProviderType::Anthropic).last_messages().await;
    assert_eq!(sent[0], ChatMessage::system("You answer for a roofing company."));
    assert_eq!(sent[1], ChatMessage::user("Hello"));
}

#[tokio::test]
async fn unknown_location_is_not_found_and_audited() {
    let h = TestHarness::new().await.unwrap();

    let err = h
        .send_message("loc-missing", "conv-1", "anyone there?")
        .await
        .unwrap_err();
    assert!(matches!(err, GhlError::NotFound { entity: "client", .. }));

    let logs = h.webhook_logs(None).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].client_id, None);
    assert_eq!(logs[0].response_status, Some(404));
    assert!(logs[0].error_message.is_some());
}

#[tokio::test]
async fn inactive_client_is_not_served() {
    let h = TestHarness::new().await.unwrap();
    let client = h.create_client("loc-paused").await.unwrap();
    h.add_credential(&client.id, ProviderType::OpenAi, 1).await.unwrap();
    h.storage.set_client_active(&client.id, false).await.unwrap();

    let err = h.send_message("loc-paused", "conv-1", "hi").await.unwrap_err();
    assert!(matches!(err, GhlError::NotFound { .. }));
    assert_eq!(h.scripted(ProviderType::OpenAi).calls(), 0);
}

#[tokio::test]
async fn disabled_module_rejects_without_dispatch() {
    let h = TestHarness::builder().disabled().build().await.unwrap();
    let client = h.create_client("loc-off").await.unwrap();
    h.add_credential(&client.id, ProviderType::OpenAi, 1).await.unwrap();

    let err = h.send_message("loc-off", "conv-1", "hi").await.unwrap_err();
    assert!(matches!(err, GhlError::ModuleDisabled));
    assert_eq!(h.scripted(ProviderType::OpenAi).calls(), 0);

    let logs = h.webhook_logs(None).await.unwrap();
    assert_eq!(logs[0].response_status, Some(503));
}

#[tokio::test]
async fn missing_credentials_audit_as_conflict() {
    let h = TestHarness::new().await.unwrap();
    let client = h.create_client("loc-nocreds").await.unwrap();

    let err = h.send_message("loc-nocreds", "conv-1", "hi").await.unwrap_err();
    assert!(matches!(err, GhlError::NoActiveProvider { .. }));

    let logs = h.webhook_logs(Some(&client.id)).await.unwrap();
    assert_eq!(logs[0].response_status, Some(409));

    // The user turn stays in the log even though nothing answered.
    let session = h
        .storage
        .find_session(&client.id, "conv-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.context.len(), 1);
}

#[tokio::test]
async fn exhausted_providers_audit_as_unavailable() {
    let h = TestHarness::new().await.unwrap();
    let client = h.create_client("loc-down").await.unwrap();
    h.add_credential(&client.id, ProviderType::OpenAi, 1).await.unwrap();
    h.scripted(ProviderType::OpenAi)
        .push(Scripted::Fail(DispatchErrorKind::UpstreamUnavailable))
        .await;

    let event = InboundEvent::message("loc-down", "conv-1", "hi").with_contact("contact-42");
    let err = h.assistant.handle(event).await.unwrap_err();
    assert!(matches!(err, GhlError::AllProvidersExhausted { attempts: 1, .. }));

    let logs = h.webhook_logs(Some(&client.id)).await.unwrap();
    assert_eq!(logs[0].response_status, Some(503));
    let payload = logs[0].payload.as_ref().unwrap();
    assert_eq!(payload["contactId"], "contact-42");
}
