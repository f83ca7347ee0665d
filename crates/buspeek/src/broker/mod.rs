// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker collaborator contract.
//!
//! The peek engine never talks to a broker SDK directly. It goes through the
//! object-safe traits below, which a concrete backend implements. The crate
//! ships [`memory::MemoryBroker`]; a wire backend plugs in the same way.

pub mod ambient;
pub mod connection_string;
pub mod memory;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use connection_string::ConnectionString;

/// Boxed `Send` future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A message as reported by the broker, before projection into
/// [`crate::message::Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerMessage {
    #[serde(default)]
    pub message_id: Option<String>,
    pub sequence_number: i64,
    #[serde(default)]
    pub enqueued_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub application_properties: HashMap<String, serde_json::Value>,
}

/// Runtime properties of a queue from the administrative API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRuntimeProperties {
    pub active_message_count: u64,
}

/// Where a broker client should connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerTarget {
    /// Explicit connection string (request-supplied or configured).
    ConnectionString(ConnectionString),
    /// Bare namespace, authenticated with the ambient identity.
    Namespace { namespace: String },
}

impl BrokerTarget {
    /// Fully-qualified or bare namespace this target points at.
    pub fn namespace(&self) -> &str {
        match self {
            Self::ConnectionString(cs) => cs.namespace(),
            Self::Namespace { namespace } => namespace,
        }
    }
}

/// Failures from client construction, peek, or admin calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error(
        "no Service Bus configuration found; set SERVICE_BUS_CONNECTION_STRING, \
         ConnectionStrings__ServiceBusConnection, or SERVICE_BUS_NAMESPACE"
    )]
    NotConfigured,
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),
    #[error("messaging entity not found: {0}")]
    EntityNotFound(String),
    #[error("broker transport error: {0}")]
    Transport(String),
    #[error("broker call timed out after {0:?}")]
    Timeout(Duration),
}

/// Builds broker clients for a target.
pub trait BrokerConnector: Send + Sync + 'static {
    /// Open a messaging client.
    fn connect<'a>(
        &'a self,
        target: &'a BrokerTarget,
    ) -> BoxFuture<'a, Result<Arc<dyn BrokerClient>, BrokerError>>;

    /// Open an administrative client.
    fn admin<'a>(
        &'a self,
        target: &'a BrokerTarget,
    ) -> BoxFuture<'a, Result<Box<dyn AdminClient>, BrokerError>>;
}

/// A connected messaging client.
pub trait BrokerClient: Send + Sync {
    /// Create a peek-capable receiver for `entity`.
    fn receiver<'a>(
        &'a self,
        entity: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn Receiver>, BrokerError>>;

    /// Close the underlying connection. Idempotent.
    fn close(&self) -> BoxFuture<'_, Result<(), BrokerError>>;
}

/// Per-entity receiver. Peeking never changes lock or delivery state.
pub trait Receiver: Send {
    /// Peek up to `max` messages with sequence number >= `from_sequence`, or
    /// from the oldest retained message when `from_sequence` is `None`.
    /// Results are in ascending sequence order.
    fn peek(
        &mut self,
        max: usize,
        from_sequence: Option<i64>,
    ) -> BoxFuture<'_, Result<Vec<BrokerMessage>, BrokerError>>;

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), BrokerError>>;
}

/// Administrative client for runtime property lookups.
pub trait AdminClient: Send + Sync {
    fn queue_runtime_properties<'a>(
        &'a self,
        queue: &'a str,
    ) -> BoxFuture<'a, Result<QueueRuntimeProperties, BrokerError>>;
}
