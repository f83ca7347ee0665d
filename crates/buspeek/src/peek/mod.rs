// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peek-pagination engine.
//!
//! Reads pages of messages from an entity without consuming them, either
//! forward from a cursor or as the most recent N. Requests without a
//! credential share one lazily-built ambient client; requests with a
//! credential get a private client that is closed before the call returns.

pub mod scan;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::broker::ambient::AmbientChain;
use crate::broker::{
    BrokerClient, BrokerConnector, BrokerError, BrokerMessage, BrokerTarget, ConnectionString,
    Receiver,
};
use crate::message::{Message, QueueCount};
use crate::transit::Credential;

/// Tunables for latest-mode scans and broker call deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeekLimits {
    /// Upper bound on one latest-mode batch.
    pub batch_size: usize,
    /// Maximum messages accumulated by one latest-mode scan.
    pub scan_ceiling: usize,
    /// Deadline for a whole page or count lookup.
    pub timeout: Duration,
}

impl Default for PeekLimits {
    fn default() -> Self {
        Self { batch_size: 100, scan_ceiling: 5000, timeout: Duration::from_secs(30) }
    }
}

/// Page ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeekMode {
    /// Ascending from the cursor (or the oldest message).
    #[default]
    Forward,
    /// Newest first, by sequence number.
    Latest,
}

/// Parameters of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub entity: String,
    pub count: i64,
    pub cursor: Option<i64>,
    pub mode: PeekMode,
}

/// Broker client for one request.
enum ClientLease {
    Shared(Arc<dyn BrokerClient>),
    Private(Arc<dyn BrokerClient>),
}

impl ClientLease {
    fn client(&self) -> &dyn BrokerClient {
        match self {
            Self::Shared(c) | Self::Private(c) => c.as_ref(),
        }
    }

    /// Close the client if it belongs to this request.
    async fn release(self) {
        if let Self::Private(client) = self {
            if let Err(e) = client.close().await {
                warn!(err = %e, "failed to close request broker client");
            }
        }
    }
}

pub struct PeekEngine {
    connector: Arc<dyn BrokerConnector>,
    ambient: AmbientChain,
    shared: OnceCell<Arc<dyn BrokerClient>>,
    limits: PeekLimits,
}

impl PeekEngine {
    pub fn new(
        connector: Arc<dyn BrokerConnector>,
        ambient: AmbientChain,
        limits: PeekLimits,
    ) -> Self {
        Self { connector, ambient, shared: OnceCell::new(), limits }
    }

    pub fn limits(&self) -> &PeekLimits {
        &self.limits
    }

    /// Peek one page from `request.entity`.
    ///
    /// A non-positive count returns an empty page without touching the
    /// broker. In latest mode the cursor is ignored.
    pub async fn peek_page(
        &self,
        request: &PageRequest,
        credential: Option<&Credential>,
    ) -> Result<Vec<Message>, BrokerError> {
        let count = match usize::try_from(request.count) {
            Ok(n) if n > 0 => n,
            _ => return Ok(Vec::new()),
        };
        if request.mode == PeekMode::Latest && request.cursor.is_some() {
            debug!(entity = %request.entity, "cursor ignored in latest mode");
        }

        let messages = self.run_page(request, credential, count).await?;
        debug!(
            entity = %request.entity,
            mode = ?request.mode,
            returned = messages.len(),
            "peeked page"
        );
        Ok(messages.into_iter().map(Message::from).collect())
    }

    /// Active message count, or [`QueueCount::Unavailable`] on any failure.
    pub async fn queue_count(&self, queue: &str, credential: Option<&Credential>) -> QueueCount {
        match self.fetch_queue_count(queue, credential).await {
            Ok(n) => QueueCount::Available(n),
            Err(e) => {
                warn!(queue, err = %e, "queue count unavailable");
                QueueCount::Unavailable
            }
        }
    }

    async fn fetch_queue_count(
        &self,
        queue: &str,
        credential: Option<&Credential>,
    ) -> Result<u64, BrokerError> {
        let target = match credential {
            Some(credential) => credential_target(credential)?,
            None => self.ambient.resolve()?,
        };
        let timeout = self.limits.timeout;
        let lookup = async {
            let admin = self.connector.admin(&target).await?;
            admin.queue_runtime_properties(queue).await
        };
        let properties = tokio::time::timeout(timeout, lookup)
            .await
            .map_err(|_| BrokerError::Timeout(timeout))??;
        Ok(properties.active_message_count)
    }

    /// Connect, open a receiver and scan, all under one deadline. The
    /// receiver and any private client are released on every path.
    async fn run_page(
        &self,
        request: &PageRequest,
        credential: Option<&Credential>,
        count: usize,
    ) -> Result<Vec<BrokerMessage>, BrokerError> {
        let timeout = self.limits.timeout;
        let mut lease: Option<ClientLease> = None;
        let mut receiver: Option<Box<dyn Receiver>> = None;

        let page = async {
            let client = lease.insert(self.lease(credential).await?).client();
            let receiver = &mut **receiver.insert(client.receiver(&request.entity).await?);
            match request.mode {
                PeekMode::Forward => scan::forward(receiver, count, request.cursor).await,
                PeekMode::Latest => scan::latest(receiver, count, &self.limits).await,
            }
        };
        let result = match tokio::time::timeout(timeout, page).await {
            Ok(result) => result,
            Err(_) => {
                warn!(entity = %request.entity, ?timeout, "peek timed out");
                Err(BrokerError::Timeout(timeout))
            }
        };

        if let Some(receiver) = receiver {
            if let Err(e) = receiver.close().await {
                warn!(entity = %request.entity, err = %e, "failed to close receiver");
            }
        }
        if let Some(lease) = lease {
            lease.release().await;
        }
        result
    }

    async fn lease(&self, credential: Option<&Credential>) -> Result<ClientLease, BrokerError> {
        match credential {
            Some(credential) => {
                let target = credential_target(credential)?;
                let client = self.connector.connect(&target).await?;
                Ok(ClientLease::Private(client))
            }
            None => Ok(ClientLease::Shared(self.shared_client().await?)),
        }
    }

    /// The ambient client, built on first use. A failed build is retried by
    /// the next caller.
    async fn shared_client(&self) -> Result<Arc<dyn BrokerClient>, BrokerError> {
        let client = self
            .shared
            .get_or_try_init(|| async {
                let target = self.ambient.resolve()?;
                info!(namespace = target.namespace(), "connecting shared broker client");
                self.connector.connect(&target).await
            })
            .await?;
        Ok(Arc::clone(client))
    }
}

fn credential_target(credential: &Credential) -> Result<BrokerTarget, BrokerError> {
    ConnectionString::parse(credential.expose()).map(BrokerTarget::ConnectionString)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
