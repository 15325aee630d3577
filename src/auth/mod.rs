// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the Legacy Locker API.
//!
//! ## Auth Flow
//!
//! 1. The frontend authenticates the user with the identity provider
//! 2. The frontend sends `Authorization: Bearer <JWT>`
//! 3. This service:
//!    - Fetches the provider's JWKS via HTTPS
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Extracts `sub` → canonical `user_id`
//!
//! The authenticated `user_id` is the only identity the recovery handlers
//! trust: a client-supplied user id (e.g., in the acknowledgment body) is
//! always cross-checked against it.
//!
//! ## Internal endpoints
//!
//! The grace period expiry scan is not a user endpoint; it is authorized by
//! a shared-secret header presented by the trusted scheduler (see
//! [`extractor::InternalAuth`]).
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - JWT verification uses HTTPS-only JWKS fetching
//! - JWKS is cached with TTL for performance
//! - Clock skew tolerance is 60 seconds
//! - The internal secret comparison is constant-time

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{Auth, InternalAuth};
pub use jwks::JwksManager;
