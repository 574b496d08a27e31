// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API request/response types and SSE event types.

use serde::{Deserialize, Serialize};

// --- Request types ---

/// A request to the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    /// Model identifier (e.g., "claude-3-5-haiku-20241022").
    pub model: String,

    /// Conversation turns. Only "user" and "assistant" roles are allowed here.
    pub messages: Vec<ApiMessage>,

    /// System prompt, lifted out of the conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate. Required by the API.
    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Whether to stream the response.
    pub stream: bool,
}

/// A single message in the Anthropic conversation format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Role: "user" or "assistant".
    pub role: String,
    pub content: String,
}

// --- Response types ---

/// A full response from the Anthropic Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    /// Content blocks in the response.
    pub content: Vec<ResponseContentBlock>,
    /// Model that generated the response.
    pub model: String,
    /// Reason the generation stopped.
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub usage: ApiUsage,
}

/// A content block in a response. Only text is consumed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Token usage statistics from the API.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

// --- Error types ---

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Vendor error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Error type (e.g., "overloaded_error", "authentication_error").
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

// --- SSE event types ---

/// `message_start` event: initial metadata including input token usage.
#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageStart {
    pub message: SseMessageStartBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageStartBody {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub usage: ApiUsage,
}

/// `content_block_delta` event.
#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockDelta {
    pub index: usize,
    pub delta: SseDelta,
}

/// Delta payloads. Only text deltas carry user-visible content.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum SseDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// `message_delta` event: stop reason and cumulative output usage.
#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDelta {
    pub delta: SseMessageDeltaBody,
    #[serde(default)]
    pub usage: Option<SseDeltaUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Usage on `message_delta` reports output tokens only.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SseDeltaUsage {
    pub output_tokens: u32,
}

/// `error` event sent in place of further content.
#[derive(Debug, Clone, Deserialize)]
pub struct SseError {
    pub error: ApiErrorDetail,
}
