// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state for Axum handlers.

use std::sync::Arc;

use crate::auth::JwksManager;
use crate::notify::Mailer;
use crate::storage::EncryptedStorage;

/// Authentication configuration.
///
/// With a JWKS manager present, bearer tokens are verified against the
/// identity provider's keys (production mode); without one, tokens are only
/// structurally decoded (development mode).
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// JWKS manager (production JWT verification)
    pub jwks: Option<JwksManager>,
    /// Expected token issuer
    pub issuer: Option<String>,
    /// Expected token audience
    pub audience: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    /// Encrypted locker/request/profile store
    pub storage: Arc<EncryptedStorage>,
    /// JWT verification configuration
    pub auth_config: AuthConfig,
    /// Outbound notification sender
    pub mailer: Arc<Mailer>,
    /// Shared secret authorizing the scheduler's internal endpoints.
    /// `None` disables the internal surface entirely.
    pub internal_secret: Option<String>,
}

impl AppState {
    pub fn new(storage: EncryptedStorage) -> Self {
        Self {
            storage: Arc::new(storage),
            auth_config: AuthConfig::default(),
            mailer: Arc::new(Mailer::disabled()),
            internal_secret: None,
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_mailer(mut self, mailer: Mailer) -> Self {
        self.mailer = Arc::new(mailer);
        self
    }

    pub fn with_internal_secret(mut self, secret: impl Into<String>) -> Self {
        self.internal_secret = Some(secret.into());
        self
    }

    /// Build a state over initialized storage rooted at `dir`.
    ///
    /// Used by handler tests; pairs the state with the storage handle so
    /// tests can seed and inspect entities directly.
    #[cfg(test)]
    pub fn for_tests(dir: &std::path::Path) -> (Self, Arc<EncryptedStorage>) {
        let paths = crate::storage::StoragePaths::new(dir);
        let mut storage = EncryptedStorage::new(paths);
        storage.initialize().expect("Failed to initialize storage");
        let state = Self::new(storage);
        let storage = state.storage.clone();
        (state, storage)
    }
}
