// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ErrorCode;
use crate::message::QueueCount;
use crate::peek::{PageRequest, PeekMode};
use crate::state::AppState;
use crate::transit::{Credential, DecryptionError, KeyVault, CREDENTIAL_HEADER};

/// Default page size when `count` is absent.
pub const DEFAULT_COUNT: i64 = 10;

/// Request rejected before the broker is contacted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Entity name (queue/topic) is required")]
    MissingEntityPath,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    #[serde(default)]
    pub entity_path: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub from_sequence_number: Option<i64>,
    #[serde(default)]
    pub latest: Option<String>,
}

impl MessagesQuery {
    pub fn into_page_request(self) -> Result<PageRequest, ValidationError> {
        let entity = match self.entity_path {
            Some(path) if !path.trim().is_empty() => path,
            _ => return Err(ValidationError::MissingEntityPath),
        };
        let mode = match self.latest.as_deref() {
            Some("true") => PeekMode::Latest,
            _ => PeekMode::Forward,
        };
        Ok(PageRequest {
            entity,
            count: self.count.unwrap_or(DEFAULT_COUNT),
            cursor: self.from_sequence_number,
            mode,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: QueueCount,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned() })
}

/// `GET /publicKey`: the transit public key as SPKI PEM.
pub async fn public_key(State(s): State<Arc<AppState>>) -> Response {
    match s.vault.public_key_pem().await {
        Ok(public_key) => Json(PublicKeyResponse { public_key }).into_response(),
        Err(e) => {
            tracing::error!(err = %e, "public key unavailable");
            ErrorCode::Internal
                .to_http_response("Failed to load public key", Some(e.to_string()))
                .into_response()
        }
    }
}

/// `GET /messages`: one page of peeked messages.
pub async fn messages(
    State(s): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Response {
    let request = match query
        .map_err(|e| ValidationError::InvalidQuery(e.body_text()))
        .and_then(|Query(q)| q.into_page_request())
    {
        Ok(request) => request,
        Err(e) => {
            return ErrorCode::BadRequest.to_http_response(e.to_string(), None).into_response()
        }
    };

    let credential = match request_credential(&s.vault, &headers).await {
        Ok(credential) => credential,
        Err(e) => {
            warn!(entity = %request.entity, "rejecting undecryptable credential header");
            return ErrorCode::InvalidCredential
                .to_http_response("Invalid connection string encryption", Some(e.to_string()))
                .into_response();
        }
    };

    match s.engine.peek_page(&request, credential.as_ref()).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            warn!(entity = %request.entity, err = %e, "peek failed");
            ErrorCode::BrokerError
                .to_http_response("Failed to fetch messages", Some(e.to_string()))
                .into_response()
        }
    }
}

/// `GET /queues/{name}/count`: always 200, `"N/A"` when unknown.
pub async fn queue_count(
    State(s): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let count = match request_credential(&s.vault, &headers).await {
        Ok(credential) => s.engine.queue_count(&name, credential.as_ref()).await,
        Err(_) => {
            warn!(queue = %name, "credential header did not decrypt; count unavailable");
            QueueCount::Unavailable
        }
    };
    Json(CountResponse { count })
}

/// Decrypt the credential header if the request carries one.
///
/// An absent or blank header means "use ambient configuration". A present
/// header that does not decrypt is an error, never a fallback.
pub async fn request_credential(
    vault: &KeyVault,
    headers: &HeaderMap,
) -> Result<Option<Credential>, DecryptionError> {
    let Some(value) = headers.get(CREDENTIAL_HEADER) else {
        return Ok(None);
    };
    let encoded = value.to_str().map_err(|_| DecryptionError)?;
    if encoded.trim().is_empty() {
        return Ok(None);
    }
    vault.decrypt(encoded).await.map(Some)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
