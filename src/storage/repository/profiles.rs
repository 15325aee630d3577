// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile repository for encrypted storage.
//!
//! The identity provider is the source of truth for user identity; this
//! store caches the email and display name the notification sender needs,
//! keyed by user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{EncryptedStorage, StorageError, StorageResult};

/// Profile stored on the encrypted filesystem.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredProfile {
    /// Canonical user ID (token subject)
    pub user_id: String,
    /// Email address used for recovery notifications
    pub email: String,
    /// Name used in notification copy
    pub display_name: String,
    /// When the profile was last written
    pub updated_at: DateTime<Utc>,
}

/// Repository for profile operations on encrypted storage.
pub struct ProfileRepository<'a> {
    storage: &'a EncryptedStorage,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new ProfileRepository.
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self { storage }
    }

    /// Get a profile by user ID.
    pub fn get(&self, user_id: &str) -> StorageResult<StoredProfile> {
        let path = self.storage.paths().profile(user_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Profile {user_id}")));
        }
        self.storage.read_json(path)
    }

    /// Create or replace a profile.
    pub fn upsert(&self, profile: &StoredProfile) -> StorageResult<()> {
        self.storage
            .write_json(self.storage.paths().profile(&profile.user_id), profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{EncryptedStorage, StoragePaths};
    use std::env;
    use std::fs;

    fn test_storage() -> EncryptedStorage {
        let test_dir =
            env::temp_dir().join(format!("test-profile-repo-{}", uuid::Uuid::new_v4()));
        let paths = StoragePaths::new(&test_dir);
        let mut storage = EncryptedStorage::new(paths);
        storage.initialize().expect("Failed to initialize");
        storage
    }

    fn cleanup(storage: &EncryptedStorage) {
        let _ = fs::remove_dir_all(storage.paths().root());
    }

    #[test]
    fn upsert_and_get_profile() {
        let storage = test_storage();
        let repo = ProfileRepository::new(&storage);

        let profile = StoredProfile {
            user_id: "user_1".to_string(),
            email: "owner@example.com".to_string(),
            display_name: "Olive Owner".to_string(),
            updated_at: Utc::now(),
        };
        repo.upsert(&profile).unwrap();

        let loaded = repo.get("user_1").unwrap();
        assert_eq!(loaded.email, "owner@example.com");
        assert_eq!(loaded.display_name, "Olive Owner");

        cleanup(&storage);
    }

    #[test]
    fn upsert_replaces_existing() {
        let storage = test_storage();
        let repo = ProfileRepository::new(&storage);

        let mut profile = StoredProfile {
            user_id: "user_1".to_string(),
            email: "old@example.com".to_string(),
            display_name: "Old Name".to_string(),
            updated_at: Utc::now(),
        };
        repo.upsert(&profile).unwrap();

        profile.email = "new@example.com".to_string();
        repo.upsert(&profile).unwrap();

        assert_eq!(repo.get("user_1").unwrap().email, "new@example.com");

        cleanup(&storage);
    }

    #[test]
    fn missing_profile_is_not_found() {
        let storage = test_storage();
        let repo = ProfileRepository::new(&storage);

        let result = repo.get("ghost");
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        cleanup(&storage);
    }
}
