// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service Bus connection string parsing.
//!
//! Format: `Endpoint=sb://<host>/;SharedAccessKeyName=<name>;SharedAccessKey=<key>`
//! with optional `EntityPath=<entity>`, or `SharedAccessSignature=<sas>` in place
//! of the key pair. Keys are matched case-insensitively.

use std::fmt;
use std::str::FromStr;

use super::BrokerError;

/// A parsed connection string. The secret parts are redacted from `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    endpoint: String,
    namespace: String,
    key_name: Option<String>,
    key: Option<String>,
    signature: Option<String>,
    entity_path: Option<String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, BrokerError> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;
        let mut signature = None;
        let mut entity_path = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = segment.split_once('=').ok_or_else(|| {
                BrokerError::InvalidConnectionString("segment without '='".to_owned())
            })?;
            let value = value.trim().to_owned();
            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value),
                "sharedaccesskeyname" => key_name = Some(value),
                "sharedaccesskey" => key = Some(value),
                "sharedaccesssignature" => signature = Some(value),
                "entitypath" => entity_path = Some(value),
                // Unknown keys (e.g. TransportType) are tolerated.
                _ => {}
            }
        }

        let endpoint = endpoint
            .ok_or_else(|| BrokerError::InvalidConnectionString("missing Endpoint".to_owned()))?;
        let namespace = endpoint_host(&endpoint).ok_or_else(|| {
            BrokerError::InvalidConnectionString("Endpoint has no host".to_owned())
        })?;

        let has_key_pair = key_name.is_some() && key.is_some();
        if !has_key_pair && signature.is_none() {
            return Err(BrokerError::InvalidConnectionString(
                "expected SharedAccessKeyName and SharedAccessKey, or SharedAccessSignature"
                    .to_owned(),
            ));
        }

        Ok(Self { endpoint, namespace, key_name, key, signature, entity_path })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fully-qualified namespace host, e.g. `orders.servicebus.windows.net`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key_name(&self) -> Option<&str> {
        self.key_name.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn entity_path(&self) -> Option<&str> {
        self.entity_path.as_deref()
    }
}

impl FromStr for ConnectionString {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("key_name", &self.key_name)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("signature", &self.signature.as_ref().map(|_| "<redacted>"))
            .field("entity_path", &self.entity_path)
            .finish()
    }
}

/// Extract the host from `scheme://host[:port][/path]`.
fn endpoint_host(endpoint: &str) -> Option<String> {
    let (_, rest) = endpoint.split_once("://")?;
    let host = rest.split(['/', ':']).next().unwrap_or_default().trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

#[cfg(test)]
#[path = "connection_string_tests.rs"]
mod tests;
