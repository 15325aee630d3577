// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The symmetric vault key: generation and portable serialization.

use base64ct::{Base64, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;

/// AES-256-GCM key length in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit vault key suitable for AES-256-GCM.
///
/// Generated once per owner at vault setup. Never persisted raw — only as a
/// password wrap produced by [`super::wrap_vault_key`]. Key bytes are
/// zeroized when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey([u8; KEY_LEN]);

impl VaultKey {
    /// Generate a fresh vault key from the system CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encryption` if the system random source fails.
    pub fn generate() -> Result<Self, CryptoError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill(&mut bytes)
            .map_err(|_| CryptoError::Encryption("system RNG unavailable".to_string()))?;
        Ok(Self(bytes))
    }

    /// Wrap existing key bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` unless exactly 32 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(arr))
    }

    /// Serialize to a portable base64 string for storage or transfer.
    pub fn export(&self) -> String {
        Base64::encode_string(&self.0)
    }

    /// Deserialize a key previously produced by [`VaultKey::export`].
    ///
    /// `import(export(k))` is operationally identical to `k` under all
    /// subsequent encrypt/decrypt operations.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` on malformed base64 or a decoded
    /// length other than 32 bytes.
    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = Base64::decode_vec(encoded).map_err(|_| CryptoError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    /// Expose the raw key bytes for an encryption operation.
    pub(crate) fn expose(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

// Keep key bytes out of logs and panic messages.
impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VaultKey(***)")
    }
}
