// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the GHL assistant.
//!
//! Every fallible operation in the workspace returns [`GhlError`]. Provider
//! failures carry a [`DispatchError`] whose [`DispatchErrorKind`] decides
//! whether the provider selector may fail over to the next credential.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::ProviderType;

/// The primary error type used across all GHL assistant crates.
#[derive(Debug, Error)]
pub enum GhlError {
    /// Configuration errors (missing or malformed master key, invalid TOML values).
    /// Fatal at startup, never recoverable per request.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The AEAD authentication tag did not verify: tampered ciphertext, wrong
    /// master key, or corrupted storage. Never retried.
    #[error("secret authentication failed: ciphertext, iv, or tag was tampered with or the master key is wrong")]
    AuthenticationFailure,

    /// Other cryptographic failures (RNG unavailable, cipher construction).
    #[error("vault error: {0}")]
    Vault(String),

    /// A credential for this (client, provider type) pair already exists.
    #[error("client {client_id} already has a {provider_type} credential")]
    DuplicateCredential {
        client_id: String,
        provider_type: ProviderType,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The client has no active provider credential to dispatch with.
    #[error("client {client_id} has no active AI provider configured")]
    NoActiveProvider { client_id: String },

    /// A single provider dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Every candidate failed with a retryable error.
    #[error("all {attempts} AI providers failed; last error: {last}")]
    AllProvidersExhausted { attempts: usize, last: DispatchError },

    /// The assistant module is switched off in configuration.
    #[error("the AI assistant module is disabled")]
    ModuleDisabled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GhlError {
    /// Returns true when the selector may try the next credential.
    pub fn is_retryable(&self) -> bool {
        match self {
            GhlError::Dispatch(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Shorthand for a dispatch error of the given kind.
    pub fn dispatch(kind: DispatchErrorKind, message: impl Into<String>) -> Self {
        GhlError::Dispatch(DispatchError::new(kind, message))
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GhlError::Storage {
            source: Box::new(err),
        }
    }
}

/// Shared classification for vendor failures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum DispatchErrorKind {
    /// The vendor rejected the API key.
    AuthRejected,
    /// The vendor throttled the request or the quota is exhausted.
    RateLimited,
    /// The request did not complete in time.
    Timeout,
    /// The vendor rejected the request itself (bad model, bad parameters).
    InvalidRequest,
    /// The vendor is down, overloaded, or unreachable.
    UpstreamUnavailable,
    /// Anything that does not fit the other kinds.
    Unknown,
    /// The connection dropped after the stream was opened. Chunks already
    /// delivered stay valid.
    StreamInterrupted,
}

impl DispatchErrorKind {
    /// Transient kinds that feed the selector's failover.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            DispatchErrorKind::RateLimited
                | DispatchErrorKind::Timeout
                | DispatchErrorKind::UpstreamUnavailable
        )
    }

    /// Classifies an HTTP status returned by a vendor API.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => DispatchErrorKind::AuthRejected,
            429 => DispatchErrorKind::RateLimited,
            408 | 504 => DispatchErrorKind::Timeout,
            400 | 404 | 409 | 413 | 422 => DispatchErrorKind::InvalidRequest,
            500..=599 => DispatchErrorKind::UpstreamUnavailable,
            _ => DispatchErrorKind::Unknown,
        }
    }
}

/// A normalized vendor failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DispatchError {
    /// Shared classification.
    pub kind: DispatchErrorKind,
    /// Human-readable detail, vendor message included when available.
    pub message: String,
    /// HTTP status if the failure came from a vendor response.
    pub status: Option<u16>,
}

impl DispatchError {
    pub fn new(kind: DispatchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Builds an error from a vendor HTTP status and response detail.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: DispatchErrorKind::from_http_status(status),
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
