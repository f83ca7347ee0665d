// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Missing or malformed request parameter; the broker was not contacted.
    BadRequest,
    /// The credential header did not decrypt.
    InvalidCredential,
    /// Client construction or peek failed.
    BrokerError,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::InvalidCredential => 400,
            Self::BrokerError => 500,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::BrokerError => "BROKER_ERROR",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_error_response(
        &self,
        error: impl Into<String>,
        detail: Option<String>,
    ) -> ErrorResponse {
        ErrorResponse { error: error.into(), code: self.as_str().to_owned(), detail }
    }

    pub fn to_http_response(
        &self,
        error: impl Into<String>,
        detail: Option<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_error_response(error, detail)))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error envelope: short summary, machine-readable code, optional cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
