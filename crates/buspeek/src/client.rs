// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for a buspeek server.
//!
//! Connection strings never travel in the clear: each one is sealed against
//! the server's public key and sent in the credential header.

use reqwest::{Client, RequestBuilder, Url};
use tokio::sync::OnceCell;

use crate::error::ErrorResponse;
use crate::message::{Message, QueueCount};
use crate::transit::{seal, CREDENTIAL_HEADER};
use crate::transport::http::{CountResponse, PublicKeyResponse};

/// Parameters for [`PeekClient::fetch_messages`].
#[derive(Debug, Clone, Default)]
pub struct MessagesRequest {
    pub entity_path: String,
    pub count: Option<i64>,
    pub from_sequence_number: Option<i64>,
    pub latest: bool,
    pub connection_string: Option<String>,
}

impl MessagesRequest {
    pub fn new(entity_path: impl Into<String>) -> Self {
        Self { entity_path: entity_path.into(), ..Self::default() }
    }

    pub fn count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn from_sequence_number(mut self, seq: i64) -> Self {
        self.from_sequence_number = Some(seq);
        self
    }

    pub fn latest(mut self) -> Self {
        self.latest = true;
        self
    }

    pub fn connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }
}

pub struct PeekClient {
    base_url: String,
    client: Client,
    public_key: OnceCell<String>,
}

impl PeekClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client, public_key: OnceCell::new() }
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    /// Server public key (SPKI PEM), fetched on first use.
    pub async fn public_key(&self) -> anyhow::Result<&str> {
        let pem = self
            .public_key
            .get_or_try_init(|| async {
                let resp = self.client.get(self.url("/publicKey")?).send().await?;
                let body: PublicKeyResponse = resp.error_for_status()?.json().await?;
                Ok::<_, anyhow::Error>(body.public_key)
            })
            .await?;
        Ok(pem)
    }

    async fn with_credential(
        &self,
        req: RequestBuilder,
        connection_string: Option<&str>,
    ) -> anyhow::Result<RequestBuilder> {
        match connection_string {
            Some(cs) if !cs.is_empty() => {
                let sealed = seal(cs, self.public_key().await?)?;
                Ok(req.header(CREDENTIAL_HEADER, sealed))
            }
            _ => Ok(req),
        }
    }

    /// Peek one page. A non-2xx reply becomes an error carrying the server's
    /// detail, or its summary, or the status text.
    pub async fn fetch_messages(&self, request: &MessagesRequest) -> anyhow::Result<Vec<Message>> {
        let mut url = self.url("/messages")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("entityPath", &request.entity_path);
            pairs.append_pair("count", &request.count.unwrap_or(10).to_string());
            if let Some(seq) = request.from_sequence_number {
                pairs.append_pair("fromSequenceNumber", &seq.to_string());
            }
            if request.latest {
                pairs.append_pair("latest", "true");
            }
        }

        let req = self
            .with_credential(self.client.get(url), request.connection_string.as_deref())
            .await?;
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorResponse>().await {
                Ok(body) => body.detail.unwrap_or(body.error),
                Err(_) => status.canonical_reason().unwrap_or("request failed").to_owned(),
            };
            anyhow::bail!("{message}");
        }
        Ok(resp.json().await?)
    }

    /// Active message count; [`QueueCount::Unavailable`] on any failure.
    pub async fn fetch_queue_count(
        &self,
        queue: &str,
        connection_string: Option<&str>,
    ) -> QueueCount {
        match self.try_fetch_queue_count(queue, connection_string).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(queue, err = %e, "queue count request failed");
                QueueCount::Unavailable
            }
        }
    }

    async fn try_fetch_queue_count(
        &self,
        queue: &str,
        connection_string: Option<&str>,
    ) -> anyhow::Result<QueueCount> {
        let mut url = self.url("/queues")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base url cannot carry a path"))?
            .push(queue)
            .push("count");
        let req = self.with_credential(self.client.get(url), connection_string).await?;
        let body: CountResponse = req.send().await?.error_for_status()?.json().await?;
        Ok(body.count)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
