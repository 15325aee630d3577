// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for encrypted storage layout.

use std::path::{Path, PathBuf};

/// Base directory for all encrypted persistent storage.
/// This MUST be mounted as an encrypted volume in the deployment manifest.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities for the encrypted filesystem.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all encrypted data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Locker Paths ==========

    /// Directory containing all lockers.
    pub fn lockers_dir(&self) -> PathBuf {
        self.root.join("lockers")
    }

    /// Path to a specific locker file.
    pub fn locker(&self, locker_id: &str) -> PathBuf {
        self.lockers_dir().join(format!("{locker_id}.json"))
    }

    // ========== Recovery Request Paths ==========

    /// Directory containing all recovery requests.
    pub fn recovery_dir(&self) -> PathBuf {
        self.root.join("recovery")
    }

    /// Path to a specific recovery request file.
    pub fn recovery_request(&self, request_id: &str) -> PathBuf {
        self.recovery_dir().join(format!("{request_id}.json"))
    }

    // ========== Profile Paths ==========

    /// Directory containing all user profiles.
    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    /// Path to a specific profile file (keyed by user id).
    pub fn profile(&self, user_id: &str) -> PathBuf {
        self.profiles_dir().join(format!("{user_id}.json"))
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
