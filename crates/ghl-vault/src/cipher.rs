// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM envelope encryption for provider API keys.
//!
//! Each [`CipherBox::encrypt`] call draws a fresh random 16-byte IV from the
//! system CSPRNG. IV reuse under one key breaks GCM, so IVs are never derived
//! or cached. The output layout (hex ciphertext, 16-byte IV, 16-byte tag,
//! empty AAD) matches Node's `aes-256-gcm` cipher with a 16-byte IV.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use ghl_core::types::EncryptedSecret;
use ghl_core::GhlError;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::key::MasterKey;

/// Length of the initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// Length of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Encrypts and decrypts secrets under one master key.
///
/// Constructed once at startup and shared; holds no mutable state.
pub struct CipherBox {
    cipher: Aes256Gcm16,
    rng: SystemRandom,
}

impl std::fmt::Debug for CipherBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherBox").finish_non_exhaustive()
    }
}

impl CipherBox {
    pub fn new(key: &MasterKey) -> Result<Self, GhlError> {
        let cipher = Aes256Gcm16::new_from_slice(key.as_bytes())
            .map_err(|_| GhlError::Vault("failed to create AES-256-GCM cipher".to_string()))?;
        Ok(Self {
            cipher,
            rng: SystemRandom::new(),
        })
    }

    /// Validates the hex key and builds the cipher. Fails with
    /// [`GhlError::Config`] for a missing or malformed key.
    pub fn from_hex(hex_key: Option<&str>) -> Result<Self, GhlError> {
        Self::new(&MasterKey::from_config(hex_key)?)
    }

    /// Seals `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, GhlError> {
        let mut iv = [0u8; IV_LEN];
        self.rng
            .fill(&mut iv)
            .map_err(|_| GhlError::Vault("failed to generate random IV".to_string()))?;

        let mut buf = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buf)
            .map_err(|_| GhlError::Vault("AES-256-GCM encryption failed".to_string()))?;

        Ok(EncryptedSecret {
            ciphertext: hex::encode(&buf),
            iv: hex::encode(iv),
            tag: hex::encode(tag),
        })
    }

    /// Opens a sealed secret.
    ///
    /// Any malformed component or a tag that does not verify is
    /// [`GhlError::AuthenticationFailure`]; altered plaintext is never returned.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> Result<SecretString, GhlError> {
        let mut buf =
            Zeroizing::new(hex::decode(&secret.ciphertext).map_err(|_| GhlError::AuthenticationFailure)?);
        let iv = decode_fixed::<IV_LEN>(&secret.iv)?;
        let tag = decode_fixed::<TAG_LEN>(&secret.tag)?;

        self.cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&iv),
                b"",
                buf.as_mut_slice(),
                GenericArray::from_slice(&tag),
            )
            .map_err(|_| GhlError::AuthenticationFailure)?;

        // The tag verified, so the bytes are exactly what was sealed under this
        // key. Non-UTF-8 here means a writer stored a non-text secret, not
        // tampering or a wrong key.
        let plaintext = String::from_utf8(std::mem::take(&mut *buf))
            .map_err(|_| GhlError::Vault("decrypted secret is not valid UTF-8".to_string()))?;
        Ok(SecretString::from(plaintext))
    }
}

fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], GhlError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(value, &mut out).map_err(|_| GhlError::AuthenticationFailure)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use secrecy::ExposeSecret;
    use std::collections::HashSet;

    fn test_box() -> CipherBox {
        CipherBox::new(&MasterKey::from_hex(&"42".repeat(32)).unwrap()).unwrap()
    }

    fn flip_bit(hex_value: &str, bit: usize) -> String {
        let mut bytes = hex::decode(hex_value).unwrap();
        let idx = bit % (bytes.len() * 8);
        bytes[idx / 8] ^= 1 << (idx % 8);
        hex::encode(bytes)
    }

    #[test]
    fn round_trip() {
        let cipher = test_box();
        let sealed = cipher.encrypt("sk-live-abcdef0123456789").unwrap();
        assert_eq!(
            cipher.decrypt(&sealed).unwrap().expose_secret(),
            "sk-live-abcdef0123456789"
        );
    }

    #[test]
    fn layout_matches_16_byte_iv_and_tag() {
        let sealed = test_box().encrypt("hello").unwrap();
        assert_eq!(sealed.iv.len(), IV_LEN * 2);
        assert_eq!(sealed.tag.len(), TAG_LEN * 2);
        // GCM is a stream mode: ciphertext is as long as the plaintext.
        assert_eq!(sealed.ciphertext.len(), "hello".len() * 2);
        assert!(!sealed.ciphertext.contains("68656c6c6f"));
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let cipher = test_box();
        let sealed = cipher.encrypt("").unwrap();
        assert!(sealed.ciphertext.is_empty());
        assert_eq!(cipher.decrypt(&sealed).unwrap().expose_secret(), "");
    }

    #[test]
    fn ten_thousand_ivs_are_distinct() {
        let cipher = test_box();
        let ivs: HashSet<String> = (0..10_000)
            .map(|_| cipher.encrypt("same secret").unwrap().iv)
            .collect();
        assert_eq!(ivs.len(), 10_000);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = test_box().encrypt("secret").unwrap();
        let other = CipherBox::new(&MasterKey::from_hex(&"43".repeat(32)).unwrap()).unwrap();
        assert!(matches!(
            other.decrypt(&sealed),
            Err(GhlError::AuthenticationFailure)
        ));
    }

    #[test]
    fn malformed_components_fail_authentication() {
        let cipher = test_box();
        let sealed = cipher.encrypt("secret").unwrap();

        let bad_hex = EncryptedSecret {
            ciphertext: "not hex!".into(),
            ..sealed.clone()
        };
        let short_iv = EncryptedSecret {
            iv: sealed.iv[..24].to_string(),
            ..sealed.clone()
        };
        let missing_tag = EncryptedSecret {
            tag: String::new(),
            ..sealed.clone()
        };
        for broken in [bad_hex, short_iv, missing_tag] {
            assert!(matches!(
                cipher.decrypt(&broken),
                Err(GhlError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn authentic_non_utf8_plaintext_is_a_vault_error() {
        let cipher = test_box();
        let iv = [7u8; IV_LEN];
        let mut buf = vec![0xff, 0xfe, 0x00];
        let tag = cipher
            .cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buf)
            .unwrap();
        let sealed = EncryptedSecret {
            ciphertext: hex::encode(&buf),
            iv: hex::encode(iv),
            tag: hex::encode(tag),
        };
        match cipher.decrypt(&sealed) {
            Err(GhlError::Vault(msg)) => assert!(msg.contains("UTF-8")),
            other => panic!("expected Vault error, got {other:?}"),
        }
    }

    #[test]
    fn missing_key_fails_at_construction() {
        assert!(matches!(
            CipherBox::from_hex(None).unwrap_err(),
            GhlError::Config(_)
        ));
        assert!(matches!(
            CipherBox::from_hex(Some("1234")).unwrap_err(),
            GhlError::Config(_)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn decrypt_inverts_encrypt(plaintext in ".*") {
            let cipher = test_box();
            let sealed = cipher.encrypt(&plaintext).unwrap();
            let opened = cipher.decrypt(&sealed).unwrap();
            prop_assert_eq!(opened.expose_secret(), plaintext.as_str());
        }

        #[test]
        fn any_flipped_bit_is_detected(
            plaintext in ".{1,64}",
            part in 0usize..3,
            bit in any::<usize>(),
        ) {
            let cipher = test_box();
            let mut sealed = cipher.encrypt(&plaintext).unwrap();
            match part {
                0 => sealed.ciphertext = flip_bit(&sealed.ciphertext, bit),
                1 => sealed.iv = flip_bit(&sealed.iv, bit),
                _ => sealed.tag = flip_bit(&sealed.tag, bit),
            }
            prop_assert!(matches!(
                cipher.decrypt(&sealed),
                Err(GhlError::AuthenticationFailure)
            ));
        }
    }
}
