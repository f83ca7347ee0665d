// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Page assembly over a single receiver.

use tracing::debug;

use crate::broker::{BrokerError, BrokerMessage, Receiver};

use super::PeekLimits;

/// Forward page: a straight pass-through of the broker's peek primitive.
pub async fn forward(
    receiver: &mut dyn Receiver,
    count: usize,
    cursor: Option<i64>,
) -> Result<Vec<BrokerMessage>, BrokerError> {
    receiver.peek(count, cursor).await
}

/// Latest page: the `count` highest sequence numbers in the backlog.
///
/// The broker can only peek forward, so this walks the backlog from the
/// oldest message in batches, accumulating until the backlog runs out or
/// `scan_ceiling` messages have been collected, then keeps the newest
/// `count`. With a backlog larger than the ceiling the result is the newest
/// messages of the scanned window, not of the whole backlog.
pub async fn latest(
    receiver: &mut dyn Receiver,
    count: usize,
    limits: &PeekLimits,
) -> Result<Vec<BrokerMessage>, BrokerError> {
    let batch_size = count.min(limits.batch_size).max(1);
    let mut scanned: Vec<BrokerMessage> = Vec::new();
    let mut from = None;
    let mut batches = 0usize;

    while scanned.len() < limits.scan_ceiling {
        let want = batch_size.min(limits.scan_ceiling - scanned.len());
        let batch = receiver.peek(want, from).await?;
        batches += 1;
        let next = match batch.last() {
            Some(last) => last.sequence_number.checked_add(1),
            None => break,
        };
        scanned.extend(batch);
        match next {
            Some(next) => from = Some(next),
            None => break,
        }
    }

    debug!(batches, scanned = scanned.len(), "latest scan finished");
    scanned.sort_unstable_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
    scanned.truncate(count);
    Ok(scanned)
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
