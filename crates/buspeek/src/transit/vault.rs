// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-lifetime RSA keypair.

use std::sync::Arc;

use base64::Engine;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use tokio::sync::OnceCell;

use super::Credential;

/// RSA modulus size for the process keypair.
pub const KEY_BITS: usize = 2048;

/// Opaque decryption failure.
///
/// Malformed input, a foreign key, bad padding and non-UTF-8 plaintext all
/// produce this same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("credential decryption failed")]
pub struct DecryptionError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("key generation failed: {0}")]
pub struct KeyGenError(String);

struct Keypair {
    private: RsaPrivateKey,
    public_pem: String,
}

impl Keypair {
    fn generate() -> Result<Self, KeyGenError> {
        let private =
            RsaPrivateKey::new(&mut OsRng, KEY_BITS).map_err(|e| KeyGenError(e.to_string()))?;
        let public_pem = RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyGenError(e.to_string()))?;
        Ok(Self { private, public_pem })
    }
}

/// Holds the keypair for the lifetime of the process.
///
/// The keypair is generated on first use. Concurrent first callers wait on
/// the same initialization and all observe the one keypair that wins; it is
/// never replaced afterwards. Nothing here is persisted.
#[derive(Default)]
pub struct KeyVault {
    keys: OnceCell<Arc<Keypair>>,
}

impl KeyVault {
    pub fn new() -> Self {
        Self::default()
    }

    async fn keypair(&self) -> Result<Arc<Keypair>, KeyGenError> {
        let keys = self
            .keys
            .get_or_try_init(|| async {
                tracing::info!(bits = KEY_BITS, "generating RSA key pair");
                let keypair = tokio::task::spawn_blocking(Keypair::generate)
                    .await
                    .map_err(|e| KeyGenError(e.to_string()))??;
                Ok::<_, KeyGenError>(Arc::new(keypair))
            })
            .await?;
        Ok(Arc::clone(keys))
    }

    /// SPKI PEM encoding of the public key.
    pub async fn public_key_pem(&self) -> Result<String, KeyGenError> {
        Ok(self.keypair().await?.public_pem.clone())
    }

    /// Decrypt a base64-encoded RSA-OAEP/SHA-256 ciphertext.
    pub async fn decrypt(&self, encoded: &str) -> Result<Credential, DecryptionError> {
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| DecryptionError)?;
        self.decrypt_bytes(ciphertext).await
    }

    /// Decrypt a raw RSA-OAEP/SHA-256 ciphertext.
    pub async fn decrypt_bytes(&self, ciphertext: Vec<u8>) -> Result<Credential, DecryptionError> {
        let keys = self.keypair().await.map_err(|e| {
            tracing::error!(err = %e, "no key pair available for decryption");
            DecryptionError
        })?;
        let plaintext = tokio::task::spawn_blocking(move || {
            keys.private.decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), &ciphertext)
        })
        .await
        .map_err(|_| DecryptionError)?
        .map_err(|_| DecryptionError)?;
        let text = String::from_utf8(plaintext).map_err(|_| DecryptionError)?;
        Ok(Credential::new(text))
    }
}

#[cfg(test)]
#[path = "vault_tests.rs"]
mod tests;
