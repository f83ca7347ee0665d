// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire projections returned to the presentation layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::broker::BrokerMessage;

/// Read-only projection of a peeked broker message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub sequence_number: i64,
    pub enqueued_time: DateTime<Utc>,
    #[serde(default, serialize_with = "empty_if_none", deserialize_with = "none_if_empty")]
    pub subject: Option<String>,
    #[serde(default, serialize_with = "empty_if_none", deserialize_with = "none_if_empty")]
    pub correlation_id: Option<String>,
    pub body: String,
    #[serde(default)]
    pub application_properties: HashMap<String, serde_json::Value>,
}

impl From<BrokerMessage> for Message {
    fn from(m: BrokerMessage) -> Self {
        let body = match m.body {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            message_id: m.message_id.unwrap_or_default(),
            sequence_number: m.sequence_number,
            enqueued_time: m.enqueued_time.unwrap_or_else(Utc::now),
            subject: m.subject,
            correlation_id: m.correlation_id,
            body,
            application_properties: m.application_properties,
        }
    }
}

fn empty_if_none<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value.as_deref().unwrap_or_default())
}

fn none_if_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Sentinel sent in place of a count that could not be fetched.
pub const COUNT_UNAVAILABLE: &str = "N/A";

/// Best-effort active message count.
///
/// Serializes as a bare number, or `"N/A"` when unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CountRepr", into = "CountRepr")]
pub enum QueueCount {
    Available(u64),
    Unavailable,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CountRepr {
    Number(u64),
    Text(String),
}

impl From<CountRepr> for QueueCount {
    fn from(repr: CountRepr) -> Self {
        match repr {
            CountRepr::Number(n) => Self::Available(n),
            CountRepr::Text(_) => Self::Unavailable,
        }
    }
}

impl From<QueueCount> for CountRepr {
    fn from(count: QueueCount) -> Self {
        match count {
            QueueCount::Available(n) => Self::Number(n),
            QueueCount::Unavailable => Self::Text(COUNT_UNAVAILABLE.to_owned()),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
