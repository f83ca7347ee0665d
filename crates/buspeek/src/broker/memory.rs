// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker backend.
//!
//! Holds namespaces of entities, each an append-only log with broker-assigned
//! sequence numbers. Peek semantics match the wire broker: up to `max`
//! messages from a starting sequence number, ascending, never consumed.
//! Loadable from a JSON fixture for local runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;

use super::{
    AdminClient, BoxFuture, BrokerClient, BrokerConnector, BrokerError, BrokerMessage,
    BrokerTarget, QueueRuntimeProperties, Receiver,
};

/// A message to enqueue. The broker assigns the sequence number.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    #[serde(default)]
    pub message_id: Option<String>,
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

impl NewMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self { body: serde_json::Value::String(body.into()), ..Self::default() }
    }
}

/// Fixture file layout: `{ "namespaces": { "<ns>": { "<entity>": [NewMessage...] } } }`.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub namespaces: HashMap<String, HashMap<String, Vec<NewMessage>>>,
}

#[derive(Default)]
struct EntityLog {
    last_sequence: i64,
    messages: Vec<BrokerMessage>,
}

type Namespace = Arc<RwLock<HashMap<String, EntityLog>>>;

/// In-memory [`BrokerConnector`].
#[derive(Default)]
pub struct MemoryBroker {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let broker = Self::new();
        for (namespace, entities) in fixture.namespaces {
            for (entity, messages) in entities {
                broker.create_entity(&namespace, &entity);
                for message in messages {
                    broker.enqueue_unchecked(&namespace, &entity, message);
                }
            }
        }
        broker
    }

    pub fn load_fixture(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&contents)?;
        Ok(Self::from_fixture(fixture))
    }

    /// Create an empty entity (and its namespace). No-op if it exists.
    pub fn create_entity(&self, namespace: &str, entity: &str) {
        let ns = {
            let mut namespaces = self.namespaces.write();
            Arc::clone(namespaces.entry(namespace_key(namespace).to_owned()).or_default())
        };
        ns.write().entry(entity.to_owned()).or_default();
    }

    /// Append a message and return its sequence number.
    pub fn enqueue(
        &self,
        namespace: &str,
        entity: &str,
        message: NewMessage,
    ) -> Result<i64, BrokerError> {
        let ns = self.namespace(namespace)?;
        let mut entities = ns.write();
        let log = entities
            .get_mut(entity)
            .ok_or_else(|| BrokerError::EntityNotFound(entity.to_owned()))?;
        Ok(append(log, message))
    }

    fn enqueue_unchecked(&self, namespace: &str, entity: &str, message: NewMessage) {
        self.create_entity(namespace, entity);
        if let Ok(ns) = self.namespace(namespace) {
            if let Some(log) = ns.write().get_mut(entity) {
                append(log, message);
            }
        }
    }

    fn namespace(&self, namespace: &str) -> Result<Namespace, BrokerError> {
        self.namespaces
            .read()
            .get(namespace_key(namespace))
            .cloned()
            .ok_or_else(|| BrokerError::NamespaceNotFound(namespace.to_owned()))
    }
}

fn append(log: &mut EntityLog, message: NewMessage) -> i64 {
    log.last_sequence += 1;
    let sequence_number = log.last_sequence;
    log.messages.push(BrokerMessage {
        message_id: message.message_id.or_else(|| Some(uuid::Uuid::new_v4().to_string())),
        sequence_number,
        enqueued_time: Some(message.enqueued_time.unwrap_or_else(Utc::now)),
        subject: message.subject,
        correlation_id: message.correlation_id,
        body: message.body,
        application_properties: message.application_properties,
    });
    sequence_number
}

/// `orders.servicebus.windows.net` and `orders` name the same namespace.
fn namespace_key(namespace: &str) -> &str {
    namespace.split('.').next().unwrap_or(namespace)
}

impl BrokerConnector for MemoryBroker {
    fn connect<'a>(
        &'a self,
        target: &'a BrokerTarget,
    ) -> BoxFuture<'a, Result<Arc<dyn BrokerClient>, BrokerError>> {
        Box::pin(async move {
            let namespace = self.namespace(target.namespace())?;
            let client: Arc<dyn BrokerClient> =
                Arc::new(MemoryClient { namespace, closed: Arc::new(AtomicBool::new(false)) });
            Ok(client)
        })
    }

    fn admin<'a>(
        &'a self,
        target: &'a BrokerTarget,
    ) -> BoxFuture<'a, Result<Box<dyn AdminClient>, BrokerError>> {
        Box::pin(async move {
            let namespace = self.namespace(target.namespace())?;
            let admin: Box<dyn AdminClient> = Box::new(MemoryAdmin { namespace });
            Ok(admin)
        })
    }
}

struct MemoryClient {
    namespace: Namespace,
    closed: Arc<AtomicBool>,
}

impl BrokerClient for MemoryClient {
    fn receiver<'a>(
        &'a self,
        entity: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn Receiver>, BrokerError>> {
        Box::pin(async move {
            if self.closed.load(Ordering::Acquire) {
                return Err(BrokerError::Transport("client is closed".to_owned()));
            }
            if !self.namespace.read().contains_key(entity) {
                return Err(BrokerError::EntityNotFound(entity.to_owned()));
            }
            let receiver: Box<dyn Receiver> = Box::new(MemoryReceiver {
                namespace: Arc::clone(&self.namespace),
                entity: entity.to_owned(),
                client_closed: Arc::clone(&self.closed),
            });
            Ok(receiver)
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            self.closed.store(true, Ordering::Release);
            Ok(())
        })
    }
}

struct MemoryReceiver {
    namespace: Namespace,
    entity: String,
    client_closed: Arc<AtomicBool>,
}

impl Receiver for MemoryReceiver {
    fn peek(
        &mut self,
        max: usize,
        from_sequence: Option<i64>,
    ) -> BoxFuture<'_, Result<Vec<BrokerMessage>, BrokerError>> {
        Box::pin(async move {
            if self.client_closed.load(Ordering::Acquire) {
                return Err(BrokerError::Transport("client is closed".to_owned()));
            }
            let entities = self.namespace.read();
            let log = entities
                .get(&self.entity)
                .ok_or_else(|| BrokerError::EntityNotFound(self.entity.clone()))?;
            let from = from_sequence.unwrap_or(i64::MIN);
            let start = log.messages.partition_point(|m| m.sequence_number < from);
            Ok(log.messages[start..].iter().take(max).cloned().collect())
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), BrokerError>> {
        Box::pin(async move { Ok(()) })
    }
}

struct MemoryAdmin {
    namespace: Namespace,
}

impl AdminClient for MemoryAdmin {
    fn queue_runtime_properties<'a>(
        &'a self,
        queue: &'a str,
    ) -> BoxFuture<'a, Result<QueueRuntimeProperties, BrokerError>> {
        Box::pin(async move {
            let entities = self.namespace.read();
            let log =
                entities.get(queue).ok_or_else(|| BrokerError::EntityNotFound(queue.to_owned()))?;
            Ok(QueueRuntimeProperties { active_message_count: log.messages.len() as u64 })
        })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
