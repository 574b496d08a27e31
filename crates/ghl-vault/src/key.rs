// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The process-wide master encryption key.

use ghl_core::GhlError;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Name of the environment variable operators set the key through.
pub const MASTER_KEY_ENV_VAR: &str = "GHL_MASTER_ENCRYPTION_KEY";

/// 32 raw key bytes, wiped from memory on drop.
///
/// Debug output never includes the key.
pub struct MasterKey(Zeroizing<[u8; 32]>);

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

impl MasterKey {
    /// Parses a 64-character hex string. Upper and lower case are accepted.
    pub fn from_hex(hex_key: &str) -> Result<Self, GhlError> {
        let hex_key = hex_key.trim();
        if hex_key.len() != 64 {
            return Err(GhlError::Config(format!(
                "{MASTER_KEY_ENV_VAR} must be exactly 64 hex characters (32 bytes), got {} characters",
                hex_key.len()
            )));
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(hex_key, bytes.as_mut_slice()).map_err(|_| {
            GhlError::Config(format!(
                "{MASTER_KEY_ENV_VAR} must contain only hexadecimal characters"
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Parses an optional configured key, failing when it is absent.
    pub fn from_config(hex_key: Option<&str>) -> Result<Self, GhlError> {
        match hex_key {
            Some(key) if !key.trim().is_empty() => Self::from_hex(key),
            _ => Err(GhlError::Config(format!(
                "{MASTER_KEY_ENV_VAR} must be set to 64 hex characters (32 bytes); generate one with `ghl keygen`"
            ))),
        }
    }

    /// Draws a fresh key from the system CSPRNG.
    pub fn generate() -> Result<Self, GhlError> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        SystemRandom::new()
            .fill(bytes.as_mut_slice())
            .map_err(|_| GhlError::Vault("failed to generate random key".to_string()))?;
        Ok(Self(bytes))
    }

    /// Lowercase hex encoding, suitable for the configuration value.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0.as_slice()))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
