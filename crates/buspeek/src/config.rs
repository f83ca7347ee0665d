// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::broker::ambient::{
    AmbientChain, ALT_CONNECTION_STRING_VAR, CONNECTION_STRING_VAR, NAMESPACE_VAR,
};
use crate::peek::PeekLimits;

/// Configuration for the buspeek server.
#[derive(Debug, Clone, Parser)]
#[command(name = "buspeek", version, about = "Read-only peek service for message broker queues")]
pub struct Config {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "BUSPEEK_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "BUSPEEK_PORT")]
    pub port: u16,

    /// JSON fixture seeding the in-memory broker.
    #[arg(long, env = "BUSPEEK_FIXTURE")]
    pub fixture: Option<PathBuf>,

    /// Ambient broker connection string.
    #[arg(long, env = CONNECTION_STRING_VAR, hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Fallback connection string, read when the primary is unset.
    #[arg(long, env = ALT_CONNECTION_STRING_VAR, hide_env_values = true)]
    pub alt_connection_string: Option<String>,

    /// Broker namespace for ambient identity, used when no connection string is set.
    #[arg(long, env = NAMESPACE_VAR)]
    pub namespace: Option<String>,

    /// Largest single batch requested during a latest-mode scan.
    #[arg(long, default_value_t = 100, env = "BUSPEEK_LATEST_BATCH_SIZE")]
    pub latest_batch_size: usize,

    /// Maximum messages scanned for one latest-mode page.
    #[arg(long, default_value_t = 5000, env = "BUSPEEK_LATEST_SCAN_CEILING")]
    pub latest_scan_ceiling: usize,

    /// Deadline for one page or count lookup, in milliseconds.
    #[arg(long, default_value_t = 30000, env = "BUSPEEK_PEEK_TIMEOUT_MS")]
    pub peek_timeout_ms: u64,

    /// Log format (json or text).
    #[arg(long, env = "BUSPEEK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BUSPEEK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.latest_batch_size == 0 {
            anyhow::bail!("--latest-batch-size must be at least 1");
        }
        if self.latest_scan_ceiling == 0 {
            anyhow::bail!("--latest-scan-ceiling must be at least 1");
        }
        if self.peek_timeout_ms == 0 {
            anyhow::bail!("--peek-timeout-ms must be at least 1");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("unknown log format: {other} (expected json or text)"),
        }
        Ok(())
    }

    pub fn peek_timeout(&self) -> Duration {
        Duration::from_millis(self.peek_timeout_ms)
    }

    pub fn peek_limits(&self) -> PeekLimits {
        PeekLimits {
            batch_size: self.latest_batch_size,
            scan_ceiling: self.latest_scan_ceiling,
            timeout: self.peek_timeout(),
        }
    }

    /// Provider chain for requests that carry no credential.
    pub fn ambient_chain(&self) -> AmbientChain {
        AmbientChain::standard(
            self.connection_string.clone(),
            self.alt_connection_string.clone(),
            self.namespace.clone(),
        )
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
