// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password-based wrapping of the vault key and direct content encryption.
//!
//! Two envelope framings, both base64:
//!
//! - password wrap: `salt (16) || iv (12) || ciphertext+tag`
//! - vault-key content: `iv (12) || ciphertext+tag`
//!
//! The password wrap derives a 256-bit key-encryption key with
//! PBKDF2-HMAC-SHA256 over a random per-wrap salt, then seals the exported
//! vault key with AES-256-GCM under a random per-wrap IV. Salt and IV are
//! never reused across calls, so wrapping the same key with the same
//! password twice yields different blobs that both unwrap correctly.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::aead;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use super::vault_key::{VaultKey, KEY_LEN};
use super::CryptoError;

/// PBKDF2 iteration count for password-derived keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes for password wraps.
pub const SALT_LEN: usize = 16;

/// AES-GCM IV length in bytes (96 bits).
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Wrap the vault key under a password-derived key.
///
/// Returns `base64(salt || iv || ciphertext+tag)`. Fresh salt and IV per
/// call.
///
/// # Errors
///
/// Returns `CryptoError::Encryption` if random generation or sealing fails.
pub fn wrap_vault_key(key: &VaultKey, password: &str) -> Result<String, CryptoError> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| CryptoError::Encryption("system RNG unavailable".to_string()))?;

    let mut kek = derive_kek(password, &salt);
    let sealed = seal(key.export().as_bytes(), &kek, &rng);
    kek.zeroize();
    let (iv, ciphertext) = sealed?;

    let mut framed = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    framed.extend_from_slice(&salt);
    framed.extend_from_slice(&iv);
    framed.extend_from_slice(&ciphertext);
    Ok(Base64::encode_string(&framed))
}

/// Unwrap a vault key previously produced by [`wrap_vault_key`].
///
/// # Errors
///
/// Returns `CryptoError::Decryption` for any failure — wrong password,
/// corrupt ciphertext, or malformed framing. The error carries no detail
/// about which occurred.
pub fn unwrap_vault_key(blob: &str, password: &str) -> Result<VaultKey, CryptoError> {
    let framed = Base64::decode_vec(blob).map_err(|_| CryptoError::Decryption)?;
    if framed.len() < SALT_LEN + IV_LEN + TAG_LEN {
        return Err(CryptoError::Decryption);
    }

    let (salt, rest) = framed.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    let mut kek = derive_kek(password, salt);
    let opened = open(ciphertext, iv, &kek);
    kek.zeroize();

    let mut exported = opened?;
    let parsed = std::str::from_utf8(&exported)
        .map_err(|_| CryptoError::Decryption)
        .and_then(|s| VaultKey::import(s).map_err(|_| CryptoError::Decryption));
    exported.zeroize();
    parsed
}

/// Encrypt vault content directly under the vault key.
///
/// Returns `base64(iv || ciphertext+tag)` with a fresh IV per call.
///
/// # Errors
///
/// Returns `CryptoError::Encryption` if random generation or sealing fails.
pub fn encrypt_with_vault_key(plaintext: &[u8], key: &VaultKey) -> Result<String, CryptoError> {
    let rng = SystemRandom::new();
    let (iv, ciphertext) = seal(plaintext, key.expose(), &rng)?;

    let mut framed = Vec::with_capacity(IV_LEN + ciphertext.len());
    framed.extend_from_slice(&iv);
    framed.extend_from_slice(&ciphertext);
    Ok(Base64::encode_string(&framed))
}

/// Decrypt vault content previously produced by [`encrypt_with_vault_key`].
///
/// # Errors
///
/// Returns `CryptoError::Decryption` on any failure (wrong key, tampered
/// data, malformed framing).
pub fn decrypt_with_vault_key(blob: &str, key: &VaultKey) -> Result<Vec<u8>, CryptoError> {
    let framed = Base64::decode_vec(blob).map_err(|_| CryptoError::Decryption)?;
    if framed.len() < IV_LEN + TAG_LEN {
        return Err(CryptoError::Decryption);
    }

    let (iv, ciphertext) = framed.split_at(IV_LEN);
    open(ciphertext, iv, key.expose())
}

/// Validate the framing of a password wrap without attempting decryption.
///
/// Used at locker setup to reject blobs that could never unwrap —
/// truncated framing or invalid base64 — before they are persisted. This
/// inspects lengths only; it cannot (and must not) tell whether the blob
/// will decrypt.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` on malformed input.
pub fn validate_wrap_framing(blob: &str) -> Result<(), CryptoError> {
    let framed = Base64::decode_vec(blob).map_err(|_| CryptoError::InvalidKey)?;
    if framed.len() < SALT_LEN + IV_LEN + TAG_LEN {
        return Err(CryptoError::InvalidKey);
    }
    Ok(())
}

/// Derive a 256-bit key-encryption key from a password and salt.
fn derive_kek(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut kek = [0u8; KEY_LEN];
    // PBKDF2_ITERATIONS is a non-zero constant.
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).expect("iteration count is non-zero");
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password.as_bytes(),
        &mut kek,
    );
    kek
}

/// AES-256-GCM seal with a fresh random IV. Returns `(iv, ciphertext+tag)`.
fn seal(
    plaintext: &[u8],
    key: &[u8; KEY_LEN],
    rng: &SystemRandom,
) -> Result<([u8; IV_LEN], Vec<u8>), CryptoError> {
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".to_string()))?;
    let sealing_key = aead::LessSafeKey::new(unbound);

    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut iv)
        .map_err(|_| CryptoError::Encryption("system RNG unavailable".to_string()))?;
    let nonce = aead::Nonce::assume_unique_for_key(iv);

    let mut in_out = plaintext.to_vec();
    if sealing_key
        .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "AES-256-GCM encryption failed".to_string(),
        ));
    }

    Ok((iv, in_out))
}

/// AES-256-GCM open. `ciphertext` must include the trailing tag.
fn open(ciphertext: &[u8], iv: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>, CryptoError> {
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::Decryption)?;
    let opening_key = aead::LessSafeKey::new(unbound);

    let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CryptoError::Decryption)?;
    let nonce = aead::Nonce::assume_unique_for_key(iv);

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Decryption)?;

    Ok(plaintext.to_vec())
}
