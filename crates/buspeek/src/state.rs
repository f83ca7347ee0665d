// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::peek::PeekEngine;
use crate::transit::KeyVault;

/// Shared server state.
pub struct AppState {
    pub engine: PeekEngine,
    /// Process-wide keypair for credential transit.
    pub vault: Arc<KeyVault>,
}

impl AppState {
    pub fn new(engine: PeekEngine, vault: Arc<KeyVault>) -> Self {
        Self { engine, vault }
    }
}
