// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buspeek: read-only peek service for message broker queues.

pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod peek;
pub mod state;
pub mod transit;
pub mod transport;

#[cfg(test)]
pub mod test_support;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::broker::memory::MemoryBroker;
use crate::broker::BrokerConnector;
use crate::config::Config;
use crate::peek::PeekEngine;
use crate::state::AppState;
use crate::transit::KeyVault;
use crate::transport::build_router;

/// Assemble the router over `connector` with the limits and ambient
/// configuration from `config`.
pub fn build_app(
    config: &Config,
    connector: Arc<dyn BrokerConnector>,
    vault: Arc<KeyVault>,
) -> Router {
    let engine = PeekEngine::new(connector, config.ambient_chain(), config.peek_limits());
    build_router(Arc::new(AppState::new(engine, vault)))
}

/// Run the server until ctrl-c.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let broker = match config.fixture {
        Some(ref path) => {
            let broker = MemoryBroker::load_fixture(path)
                .with_context(|| format!("loading fixture {}", path.display()))?;
            tracing::info!(path = %path.display(), "loaded broker fixture");
            broker
        }
        None => MemoryBroker::new(),
    };

    let router = build_app(&config, Arc::new(broker), Arc::new(KeyVault::new()));
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("buspeek listening on {addr}");

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
            shutdown.cancel();
        });
    }

    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}
