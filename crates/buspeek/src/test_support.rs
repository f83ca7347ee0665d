// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call-counting broker stubs for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::broker::{
    AdminClient, BoxFuture, BrokerClient, BrokerConnector, BrokerError, BrokerMessage,
    BrokerTarget, QueueRuntimeProperties, Receiver,
};

pub fn message(sequence_number: i64) -> BrokerMessage {
    BrokerMessage {
        message_id: Some(format!("msg-{sequence_number}")),
        sequence_number,
        enqueued_time: None,
        subject: None,
        correlation_id: None,
        body: serde_json::Value::String(format!("body {sequence_number}")),
        application_properties: Default::default(),
    }
}

/// Serve a forward peek over an ascending backlog of sequence numbers.
pub fn peek_backlog(backlog: &[i64], max: usize, from: Option<i64>) -> Vec<BrokerMessage> {
    let from = from.unwrap_or(i64::MIN);
    backlog.iter().copied().filter(|&seq| seq >= from).take(max).map(message).collect()
}

/// Every call into the stub, by kind.
#[derive(Debug, Default)]
pub struct Calls {
    pub connects: AtomicUsize,
    pub admins: AtomicUsize,
    pub receivers: AtomicUsize,
    pub peeks: AtomicUsize,
    pub receiver_closes: AtomicUsize,
    pub client_closes: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Total broker interactions of any kind.
    pub fn total(&self) -> usize {
        [
            &self.connects,
            &self.admins,
            &self.receivers,
            &self.peeks,
            &self.receiver_closes,
            &self.client_closes,
        ]
        .iter()
        .map(|c| Self::get(c))
        .sum()
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// Failure injected at a specific step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    Connect,
    Receiver,
    Peek,
    /// Peek never completes within any reasonable deadline.
    Hang,
    /// Connect never completes.
    HangConnect,
    /// Receiver creation never completes.
    HangReceiver,
    /// Admin client construction never completes.
    HangAdmin,
    Admin,
    Properties,
}

async fn stall() {
    tokio::time::sleep(Duration::from_secs(3600)).await;
}

pub struct StubBroker {
    pub backlog: Arc<Vec<i64>>,
    pub calls: Arc<Calls>,
    pub fault: Fault,
}

impl StubBroker {
    pub fn new(backlog: Vec<i64>) -> Self {
        Self { backlog: Arc::new(backlog), calls: Arc::new(Calls::default()), fault: Fault::None }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }
}

impl BrokerConnector for StubBroker {
    fn connect<'a>(
        &'a self,
        _target: &'a BrokerTarget,
    ) -> BoxFuture<'a, Result<Arc<dyn BrokerClient>, BrokerError>> {
        Box::pin(async move {
            bump(&self.calls.connects);
            if self.fault == Fault::HangConnect {
                stall().await;
            }
            if self.fault == Fault::Connect {
                return Err(BrokerError::Transport("connect refused".into()));
            }
            let client: Arc<dyn BrokerClient> = Arc::new(StubClient {
                backlog: Arc::clone(&self.backlog),
                calls: Arc::clone(&self.calls),
                fault: self.fault,
            });
            Ok(client)
        })
    }

    fn admin<'a>(
        &'a self,
        _target: &'a BrokerTarget,
    ) -> BoxFuture<'a, Result<Box<dyn AdminClient>, BrokerError>> {
        Box::pin(async move {
            bump(&self.calls.admins);
            if self.fault == Fault::HangAdmin {
                stall().await;
            }
            if self.fault == Fault::Admin {
                return Err(BrokerError::Transport("admin unreachable".into()));
            }
            let admin: Box<dyn AdminClient> =
                Box::new(StubAdmin { active: self.backlog.len() as u64, fault: self.fault });
            Ok(admin)
        })
    }
}

struct StubClient {
    backlog: Arc<Vec<i64>>,
    calls: Arc<Calls>,
    fault: Fault,
}

impl BrokerClient for StubClient {
    fn receiver<'a>(
        &'a self,
        entity: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn Receiver>, BrokerError>> {
        Box::pin(async move {
            bump(&self.calls.receivers);
            if self.fault == Fault::HangReceiver {
                stall().await;
            }
            if self.fault == Fault::Receiver {
                return Err(BrokerError::EntityNotFound(entity.to_owned()));
            }
            let receiver: Box<dyn Receiver> = Box::new(StubReceiver {
                backlog: Arc::clone(&self.backlog),
                calls: Arc::clone(&self.calls),
                fault: self.fault,
            });
            Ok(receiver)
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            bump(&self.calls.client_closes);
            Ok(())
        })
    }
}

struct StubReceiver {
    backlog: Arc<Vec<i64>>,
    calls: Arc<Calls>,
    fault: Fault,
}

impl Receiver for StubReceiver {
    fn peek(
        &mut self,
        max: usize,
        from_sequence: Option<i64>,
    ) -> BoxFuture<'_, Result<Vec<BrokerMessage>, BrokerError>> {
        Box::pin(async move {
            bump(&self.calls.peeks);
            match self.fault {
                Fault::Peek => Err(BrokerError::Transport("link detached".into())),
                Fault::Hang => {
                    stall().await;
                    Err(BrokerError::Transport("unreachable".into()))
                }
                _ => Ok(peek_backlog(&self.backlog, max, from_sequence)),
            }
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), BrokerError>> {
        Box::pin(async move {
            bump(&self.calls.receiver_closes);
            Ok(())
        })
    }
}

struct StubAdmin {
    active: u64,
    fault: Fault,
}

impl AdminClient for StubAdmin {
    fn queue_runtime_properties<'a>(
        &'a self,
        queue: &'a str,
    ) -> BoxFuture<'a, Result<QueueRuntimeProperties, BrokerError>> {
        Box::pin(async move {
            if self.fault == Fault::Properties {
                return Err(BrokerError::EntityNotFound(queue.to_owned()));
            }
            Ok(QueueRuntimeProperties { active_message_count: self.active })
        })
    }
}
