// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error type with machine-readable kinds.
//!
//! Every user-visible failure carries a `kind` (stable, machine-readable)
//! and a `message` (human-readable). Internal details — stack traces,
//! storage paths, I/O errors — are logged but never returned to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::crypto::CryptoError;
use crate::storage::StorageError;

/// Machine-readable error kinds, mirroring the recovery protocol's error
/// taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller is not the owner/delegate/scheduler the operation requires
    Authorization,
    /// Operation attempted against an incompatible locker/request state
    InvalidState,
    /// Wrong password or corrupted ciphertext
    DecryptionFailed,
    /// Referenced locker or request does not exist
    NotFound,
    /// Malformed input
    BadRequest,
    /// Unexpected server-side failure
    Internal,
}

impl ErrorKind {
    fn code(self) -> &'static str {
        match self {
            ErrorKind::Authorization => "authorization",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::DecryptionFailed => "decryption_failed",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Internal => "internal",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::DecryptionFailed | ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status(),
            kind,
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(entity) => Self::not_found(format!("{entity} not found")),
            StorageError::AlreadyExists(entity) => {
                Self::invalid_state(format!("{entity} already exists"))
            }
            StorageError::InvalidState { resource, current } => Self::invalid_state(format!(
                "{resource} is in state '{current}', which conflicts with this operation"
            )),
            StorageError::PermissionDenied { .. } => {
                Self::authorization("You are not authorized for this locker")
            }
            other => {
                // Storage internals stay in the logs.
                tracing::error!(error = %other, "Storage operation failed");
                Self::internal("Storage operation failed")
            }
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        match e {
            // The generic message is the contract: do not reveal whether the
            // password was wrong or the blob corrupt.
            CryptoError::Decryption => {
                Self::new(ErrorKind::DecryptionFailed, "incorrect master password")
            }
            CryptoError::InvalidKey => Self::bad_request("invalid vault key encoding"),
            CryptoError::Encryption(msg) => {
                tracing::error!(error = %msg, "Encryption failure");
                Self::internal("Encryption failure")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.kind.code().to_string(),
        });
        (self.status, body).into_response()
    }
}
