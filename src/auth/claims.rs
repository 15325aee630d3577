// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims extracted from an identity-provider JWT.
///
/// The provider issues standard OIDC claims; the `sub` claim is the
/// canonical user id and the only identity the service ever trusts — a
/// client-supplied user id is always cross-checked against it.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    /// Subject — the canonical user identifier
    pub sub: String,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Not before timestamp (optional)
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Issuer (the identity provider's URL)
    #[serde(default)]
    pub iss: String,

    /// Audience (optional, application-specific)
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    /// Session ID (provider-specific)
    #[serde(default)]
    pub sid: Option<String>,
}

/// Authenticated user information extracted from a verified JWT.
///
/// This is the primary type used throughout the application to represent
/// the authenticated caller making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (token `sub` claim)
    pub user_id: String,

    /// Session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Original issuer (used for validation, not serialized)
    #[serde(skip)]
    pub issuer: String,

    /// Token expiration (Unix timestamp, used for validation, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from verified claims.
    pub fn from_claims(claims: IdentityClaims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> IdentityClaims {
        IdentityClaims {
            sub: "user_123".to_string(),
            iat: 1700000000,
            exp: 1700003600,
            nbf: None,
            iss: "https://auth.example.com".to_string(),
            aud: Some(serde_json::json!("locker-api")),
            sid: Some("sess_abc".to_string()),
        }
    }

    #[test]
    fn from_claims_extracts_user_id() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
    }

    #[test]
    fn from_claims_carries_session_and_issuer() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.session_id.as_deref(), Some("sess_abc"));
        assert_eq!(user.issuer, "https://auth.example.com");
        assert_eq!(user.expires_at, 1700003600);
    }

    #[test]
    fn claims_deserialize_with_missing_optionals() {
        let claims: IdentityClaims =
            serde_json::from_str(r#"{"sub":"user_9"}"#).expect("deserialize");
        assert_eq!(claims.sub, "user_9");
        assert!(claims.sid.is_none());
        assert_eq!(claims.exp, 0);
    }
}
