// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities, plus column codecs.
//!
//! The canonical types live in `ghl-core::types`; this module re-exports them
//! and converts JSON text and provider tags at the column boundary.

use std::str::FromStr;

use rusqlite::types::Type;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use ghl_core::types::{
    AvailableModel, Client, ClientSettings, ContextEntry, ConversationSession, Credential,
    EncryptedSecret, ModelConfig, ModelPricing, ProviderType, SessionMetadata, UsageLog,
    UsageSummary, WebhookLog,
};

/// Decodes a JSON text column.
pub(crate) fn json_column<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decodes a nullable JSON text column.
pub(crate) fn opt_json_column<T: DeserializeOwned>(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<T>> {
    raw.map(|s| json_column(idx, &s)).transpose()
}

/// Encodes a value for a JSON text column.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Decodes a provider tag column.
pub(crate) fn provider_column(idx: usize, raw: &str) -> rusqlite::Result<ProviderType> {
    ProviderType::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Converts an unsigned count for an INTEGER column.
pub(crate) fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Reads a non-negative INTEGER column.
pub(crate) fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_json_is_a_conversion_failure() {
        let err = json_column::<ClientSettings>(3, "{not json").unwrap_err();
        assert!(matches!(
            err,
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, _)
        ));
    }

    #[test]
    fn unknown_provider_tag_is_rejected() {
        assert!(provider_column(0, "mistral").is_err());
        assert_eq!(provider_column(0, "groq").unwrap(), ProviderType::Groq);
    }

    #[test]
    fn integer_conversions_clamp() {
        assert_eq!(to_sql_int(u64::MAX), i64::MAX);
        assert_eq!(from_sql_int(-5), 0);
        assert_eq!(from_sql_int(42), 42);
    }
}
