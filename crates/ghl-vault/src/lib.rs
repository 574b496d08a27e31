// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope encryption and credential lifecycle for the GHL assistant.
//!
//! A single master key, loaded once at startup, seals every provider API key
//! with AES-256-GCM. The [`CredentialStore`] keeps secrets encrypted at rest
//! and opens them only at dispatch time.

pub mod cipher;
pub mod key;
pub mod prompt;
pub mod store;

pub use cipher::CipherBox;
pub use key::MasterKey;
pub use prompt::read_api_key;
pub use store::{mask_secret, CredentialStore};
