// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client half of credential transit: encrypt against a served public key.

use base64::Engine;
use rsa::pkcs8::DecodePublicKey;
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPublicKey};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SealError {
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("credential is {len} bytes; at most {limit} bytes fit in one RSA-OAEP block")]
    TooLong { len: usize, limit: usize },
    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// Largest plaintext a single RSA-OAEP/SHA-256 block holds for a modulus of
/// `modulus_len` bytes (190 for a 2048-bit key).
pub fn max_plaintext_len(modulus_len: usize) -> usize {
    modulus_len.saturating_sub(2 * <Sha256 as Digest>::output_size() + 2)
}

/// Encrypt `plaintext` for the holder of `public_key_pem` (SPKI PEM) and
/// return base64 ciphertext. No chunking: oversized input is rejected.
pub fn seal(plaintext: &str, public_key_pem: &str) -> Result<String, SealError> {
    let key = RsaPublicKey::from_public_key_pem(public_key_pem.trim())
        .map_err(|e| SealError::InvalidKey(e.to_string()))?;
    let limit = max_plaintext_len(key.size());
    if plaintext.len() > limit {
        return Err(SealError::TooLong { len: plaintext.len(), limit });
    }
    let ciphertext = key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| SealError::Encrypt(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(ciphertext))
}
