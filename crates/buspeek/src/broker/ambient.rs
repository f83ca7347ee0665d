// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ambient broker configuration: an ordered provider chain.
//!
//! Used whenever a request carries no credential of its own. Providers are
//! tried in order and the first one with a non-empty value wins, even if its
//! value turns out to be invalid.

use super::{BrokerError, BrokerTarget, ConnectionString};

pub const CONNECTION_STRING_VAR: &str = "SERVICE_BUS_CONNECTION_STRING";
pub const ALT_CONNECTION_STRING_VAR: &str = "ConnectionStrings__ServiceBusConnection";
pub const NAMESPACE_VAR: &str = "SERVICE_BUS_NAMESPACE";

/// One source of ambient broker location.
pub trait AmbientProvider: Send + Sync {
    /// Label for logs (never the value itself).
    fn source(&self) -> &str;

    /// `None` when this provider has nothing configured.
    fn resolve(&self) -> Option<Result<BrokerTarget, BrokerError>>;
}

/// A configured connection string.
pub struct ConnectionStringProvider {
    source: String,
    value: Option<String>,
}

impl ConnectionStringProvider {
    pub fn new(source: impl Into<String>, value: Option<String>) -> Self {
        Self { source: source.into(), value: non_empty(value) }
    }
}

impl AmbientProvider for ConnectionStringProvider {
    fn source(&self) -> &str {
        &self.source
    }

    fn resolve(&self) -> Option<Result<BrokerTarget, BrokerError>> {
        let raw = self.value.as_deref()?;
        Some(ConnectionString::parse(raw).map(BrokerTarget::ConnectionString))
    }
}

/// A bare namespace, authenticated by the process identity.
pub struct NamespaceProvider {
    source: String,
    value: Option<String>,
}

impl NamespaceProvider {
    pub fn new(source: impl Into<String>, value: Option<String>) -> Self {
        Self { source: source.into(), value: non_empty(value) }
    }
}

impl AmbientProvider for NamespaceProvider {
    fn source(&self) -> &str {
        &self.source
    }

    fn resolve(&self) -> Option<Result<BrokerTarget, BrokerError>> {
        let namespace = self.value.clone()?;
        Some(Ok(BrokerTarget::Namespace { namespace }))
    }
}

/// Ordered provider chain; first present provider wins.
pub struct AmbientChain {
    providers: Vec<Box<dyn AmbientProvider>>,
}

impl AmbientChain {
    pub fn new(providers: Vec<Box<dyn AmbientProvider>>) -> Self {
        Self { providers }
    }

    /// The standard three-source chain: connection string, alternate-named
    /// connection string, bare namespace.
    pub fn standard(
        connection_string: Option<String>,
        alt_connection_string: Option<String>,
        namespace: Option<String>,
    ) -> Self {
        let providers: Vec<Box<dyn AmbientProvider>> = vec![
            Box::new(ConnectionStringProvider::new(CONNECTION_STRING_VAR, connection_string)),
            Box::new(ConnectionStringProvider::new(
                ALT_CONNECTION_STRING_VAR,
                alt_connection_string,
            )),
            Box::new(NamespaceProvider::new(NAMESPACE_VAR, namespace)),
        ];
        Self::new(providers)
    }

    /// Resolve the ambient target.
    pub fn resolve(&self) -> Result<BrokerTarget, BrokerError> {
        for provider in &self.providers {
            if let Some(result) = provider.resolve() {
                tracing::debug!(source = provider.source(), "ambient broker configuration selected");
                return result;
            }
        }
        Err(BrokerError::NotConfigured)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "ambient_tests.rs"]
mod tests;
