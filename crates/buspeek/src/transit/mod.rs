// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral credential transit.
//!
//! The server holds one RSA keypair for its lifetime ([`KeyVault`]). Clients
//! fetch the public key and [`seal`] a connection string against it for every
//! request; the server decrypts it into a [`Credential`] that lives only for
//! that request. Padding is RSA-OAEP with SHA-256 for both hash and MGF1.

pub mod seal;
pub mod vault;

use std::fmt;

pub use seal::{seal, SealError};
pub use vault::{DecryptionError, KeyGenError, KeyVault};

/// Request header carrying the base64 ciphertext of a connection string.
pub const CREDENTIAL_HEADER: &str = "x-servicebus-connectionstring";

/// A decrypted broker credential. Never logged; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
