// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Key Encryption Module
//!
//! Client-compatible cryptographic routines for the Legacy Locker vault:
//!
//! - [`VaultKey`] — a 256-bit AES-GCM vault key (generate / export / import)
//! - [`wrap_vault_key`] / [`unwrap_vault_key`] — password-based wrapping of
//!   the vault key (PBKDF2-HMAC-SHA256 + AES-256-GCM)
//! - [`encrypt_with_vault_key`] / [`decrypt_with_vault_key`] — direct content
//!   encryption under the vault key
//!
//! ## Envelope model
//!
//! The vault key encrypts vault contents; the vault key itself is only ever
//! persisted wrapped under a key derived from the owner's master password
//! (or, for the delegate escrow wrap, a recovery code). Raw key bytes exist
//! in transient memory only and are zeroized on drop.
//!
//! ## Failure semantics
//!
//! Every decryption failure — malformed base64, truncated framing, tag
//! mismatch, wrong password — surfaces as the same generic
//! [`CryptoError::Decryption`]. The module deliberately does not reveal
//! which failure mode occurred.

pub mod password;
pub mod vault_key;

pub use password::{
    decrypt_with_vault_key, encrypt_with_vault_key, unwrap_vault_key, validate_wrap_framing,
    wrap_vault_key,
};
pub use vault_key::VaultKey;

/// Errors from vault key operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Key material has the wrong length or is not valid base64.
    #[error("invalid vault key encoding")]
    InvalidKey,

    /// Random generation or encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Generic decryption failure. The message is fixed so callers cannot
    /// distinguish a wrong password from corrupt ciphertext.
    #[error("incorrect master password")]
    Decryption,
}
