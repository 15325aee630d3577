// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted filesystem operations backing the locker store.
//!
//! ## Security Note
//!
//! This module uses **standard filesystem I/O**. The deployment platform
//! mounts the data root as an encrypted volume and handles encryption
//! transparently for everything under it.
//!
//! **DO NOT**:
//! - Implement any storage crypto in this module (vault key wrapping lives
//!   in `crate::crypto` and operates on client-supplied blobs only)
//! - Write locker data outside the configured data root
//!
//! The Rust application treats the data root as a normal filesystem; the
//! platform ensures confidentiality and integrity at rest.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for locker storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Entity not found
    NotFound(String),
    /// Entity already exists
    AlreadyExists(String),
    /// Storage not initialized
    NotInitialized,
    /// Integrity violation (file tampered or corrupted)
    /// Note: detected by the encrypted mount, not by Rust code
    IntegrityViolation(String),
    /// Permission denied (owner/delegate check failed)
    PermissionDenied { user_id: String, resource: String },
    /// A status precondition did not hold for a conditional update
    InvalidState { resource: String, current: String },
    /// Generic serialization error
    SerializationError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::NotFound(entity) => write!(f, "Not found: {entity}"),
            StorageError::AlreadyExists(entity) => write!(f, "Already exists: {entity}"),
            StorageError::NotInitialized => write!(f, "Storage not initialized"),
            StorageError::IntegrityViolation(msg) => write!(f, "Integrity violation: {msg}"),
            StorageError::PermissionDenied { user_id, resource } => {
                write!(f, "Permission denied: user {user_id} cannot access {resource}")
            }
            StorageError::InvalidState { resource, current } => {
                write!(
                    f,
                    "{resource} is in state '{current}', which conflicts with this operation"
                )
            }
            StorageError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        // The encrypted mount signals integrity failures as I/O errors
        let msg = e.to_string();
        if msg.contains("Authentication") || msg.contains("integrity") || msg.contains("tamper") {
            StorageError::IntegrityViolation(msg)
        } else if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(msg)
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage manager over the encrypted data root.
///
/// All operations use standard filesystem I/O; the platform handles
/// encryption for files under the mount point.
#[derive(Debug, Clone)]
pub struct EncryptedStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl EncryptedStorage {
    /// Create a new EncryptedStorage instance.
    ///
    /// Does NOT initialize the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Initialize the storage directory structure.
    ///
    /// Creates all required directories under the data root.
    /// Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [
            self.paths.lockers_dir(),
            self.paths.recovery_dir(),
            self.paths.profiles_dir(),
            self.paths.audit_dir(),
        ];

        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Check if the encrypted filesystem is available and working.
    ///
    /// Performs a write-read-delete test to verify the filesystem is
    /// properly mounted and writable.
    pub fn health_check(&self) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::IntegrityViolation(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    // ========== Generic JSON Operations ==========

    /// Read a JSON file and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(value)
    }

    /// Write a JSON file (atomic write via rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Check if a file exists.
    ///
    /// Uses `File::open()` instead of `Path::exists()` because encrypted
    /// mounts can fail `stat()` calls on encrypted files while
    /// `open()` + `read()` works correctly.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        File::open(path.as_ref()).is_ok()
    }

    /// Delete a file.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// List all files in a directory matching an extension, returning stems.
    pub fn list_files(&self, dir: impl AsRef<Path>, extension: &str) -> StorageResult<Vec<String>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == extension {
                        if let Some(stem) = path.file_stem() {
                            if let Some(id) = stem.to_str() {
                                ids.push(id.to_string());
                            }
                        }
                    }
                }
            }
        }
        Ok(ids)
    }

    // ========== Raw File Operations (audit JSONL) ==========

    /// Write raw bytes to a file.
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}
