// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Covers bearer-token verification for user endpoints and shared-secret
/// verification for the internal scheduler endpoint. Authentication failures
/// never cause partial state changes — they are raised before any mutation.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Token audience is invalid
    InvalidAudience,
    /// Token is not yet valid
    TokenNotYetValid,
    /// JWKS fetch failed
    JwksFetchError(String),
    /// No matching key in JWKS
    NoMatchingKey,
    /// No `x-internal-secret` header on an internal endpoint
    MissingInternalSecret,
    /// The `x-internal-secret` header did not match the server secret,
    /// or no secret is configured
    InvalidInternalSecret,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::JwksFetchError(_) => "jwks_fetch_error",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::MissingInternalSecret => "missing_internal_secret",
            AuthError::InvalidInternalSecret => "invalid_internal_secret",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::InvalidIssuer
            | AuthError::InvalidAudience
            | AuthError::TokenNotYetValid
            | AuthError::NoMatchingKey
            | AuthError::MissingInternalSecret
            | AuthError::InvalidInternalSecret => StatusCode::UNAUTHORIZED,
            AuthError::JwksFetchError(_) | AuthError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::JwksFetchError(msg) => write!(f, "Failed to fetch JWKS: {msg}"),
            AuthError::NoMatchingKey => write!(f, "No matching key found in JWKS"),
            AuthError::MissingInternalSecret => {
                write!(f, "x-internal-secret header is required")
            }
            AuthError::InvalidInternalSecret => write!(f, "Internal secret is invalid"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
