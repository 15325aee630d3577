// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recovery request repository for encrypted storage.
//!
//! One row per delegate-initiated recovery attempt, stored as a separate
//! JSON file under `/data/recovery/`. Requests are never deleted — resolved
//! rows remain as an audit trail. The invariant that at most one request per
//! locker is active at a time is enforced here, in
//! [`RecoveryRequestRepository::create_active`]; the file store has no
//! uniqueness constraints, so this create path is the authoritative guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{EncryptedStorage, StorageError, StorageResult};

/// Status of a recovery request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Acknowledged,
    Approved,
    Rejected,
    GracePeriodExpired,
}

impl RequestStatus {
    /// Whether the request still occupies the locker's single active slot.
    ///
    /// `GracePeriodExpired` counts as active: the handoff is still in
    /// flight until the delegate acknowledges.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::GracePeriodExpired
        )
    }

    /// Wire name, as serialized (used in error messages).
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Acknowledged => "acknowledged",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::GracePeriodExpired => "grace_period_expired",
        }
    }
}

/// Recovery request stored on the encrypted filesystem.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredRecoveryRequest {
    /// Unique request identifier (UUID)
    pub id: String,
    /// The locker this request targets
    pub locker_id: String,
    /// The requesting delegate's user ID
    pub delegate_user_id: String,
    /// The locker owner's user ID (denormalized for response authorization)
    pub owner_user_id: String,
    /// Delegate's stated relationship to the owner
    pub relationship: String,
    /// Why access is being requested
    pub reason: String,
    /// Optional supporting documentation link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    /// Current status
    pub status: RequestStatus,
    /// When the request was submitted
    pub requested_at: DateTime<Utc>,
    /// When the owner's response window closes
    pub grace_period_ends_at: DateTime<Utc>,
    /// When the owner responded or the delegate acknowledged (if ever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

/// Repository for recovery request operations on encrypted storage.
pub struct RecoveryRequestRepository<'a> {
    storage: &'a EncryptedStorage,
}

impl<'a> RecoveryRequestRepository<'a> {
    /// Create a new RecoveryRequestRepository.
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self { storage }
    }

    /// Check if a request exists.
    pub fn exists(&self, request_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().recovery_request(request_id))
    }

    /// Get a request by ID.
    pub fn get(&self, request_id: &str) -> StorageResult<StoredRecoveryRequest> {
        let path = self.storage.paths().recovery_request(request_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Recovery request {request_id}"
            )));
        }
        self.storage.read_json(path)
    }

    /// Find the active request for a locker, if any.
    pub fn active_for_locker(
        &self,
        locker_id: &str,
    ) -> StorageResult<Option<StoredRecoveryRequest>> {
        for request in self.list_by_locker(locker_id)? {
            if request.status.is_active() {
                return Ok(Some(request));
            }
        }
        Ok(None)
    }

    /// List every request ever made against a locker.
    pub fn list_by_locker(&self, locker_id: &str) -> StorageResult<Vec<StoredRecoveryRequest>> {
        let request_ids = self
            .storage
            .list_files(self.storage.paths().recovery_dir(), "json")?;

        let mut requests = Vec::new();
        for id in request_ids {
            if let Ok(request) = self.get(&id) {
                if request.locker_id == locker_id {
                    requests.push(request);
                }
            }
        }

        Ok(requests)
    }

    /// Insert a new active request, enforcing the at-most-one-active
    /// invariant for the target locker.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidState` naming the outstanding request's
    /// status if one is already active; `StorageError::AlreadyExists` on an
    /// ID collision.
    pub fn create_active(&self, request: &StoredRecoveryRequest) -> StorageResult<()> {
        let request_id = &request.id;

        if self.exists(request_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Recovery request {request_id}"
            )));
        }

        if let Some(outstanding) = self.active_for_locker(&request.locker_id)? {
            return Err(StorageError::InvalidState {
                resource: format!("Recovery request {}", outstanding.id),
                current: outstanding.status.as_str().to_string(),
            });
        }

        self.storage
            .write_json(self.storage.paths().recovery_request(request_id), request)
    }

    /// Update an existing request.
    pub fn update(&self, request: &StoredRecoveryRequest) -> StorageResult<()> {
        let request_id = &request.id;

        if !self.exists(request_id) {
            return Err(StorageError::NotFound(format!(
                "Recovery request {request_id}"
            )));
        }

        self.storage
            .write_json(self.storage.paths().recovery_request(request_id), request)
    }

    /// Conditionally transition a request's status, stamping `responded_at`.
    ///
    /// Applies the write only if the current status still equals `expected`;
    /// a late-arriving duplicate transition observes
    /// `StorageError::InvalidState` instead of silently re-applying.
    ///
    /// Returns the request as written.
    pub fn transition_status(
        &self,
        request_id: &str,
        expected: RequestStatus,
        new: RequestStatus,
    ) -> StorageResult<StoredRecoveryRequest> {
        let mut request = self.get(request_id)?;

        if request.status != expected {
            return Err(StorageError::InvalidState {
                resource: format!("Recovery request {request_id}"),
                current: request.status.as_str().to_string(),
            });
        }

        request.status = new;
        request.responded_at = Some(Utc::now());
        self.update(&request)?;
        Ok(request)
    }

    /// Transition every request for a locker that sits in `expected` to
    /// `new`, stamping `responded_at`. Returns the number moved.
    pub fn transition_all_for_locker(
        &self,
        locker_id: &str,
        expected: RequestStatus,
        new: RequestStatus,
    ) -> StorageResult<usize> {
        let mut moved = 0;
        for request in self.list_by_locker(locker_id)? {
            if request.status == expected {
                self.transition_status(&request.id, expected, new)?;
                moved += 1;
            }
        }
        Ok(moved)
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
            env::temp_dir().join(format!("test-recovery-repo-{}", uuid::Uuid::new_v4()));
        let paths = StoragePaths::new(&test_dir);
        let mut storage = EncryptedStorage::new(paths);
        storage.initialize().expect("Failed to initialize");
        storage
    }

    fn cleanup(storage: &EncryptedStorage) {
        let _ = fs::remove_dir_all(storage.paths().root());
    }

    fn test_request(id: &str, locker_id: &str) -> StoredRecoveryRequest {
        let now = Utc::now();
        StoredRecoveryRequest {
            id: id.to_string(),
            locker_id: locker_id.to_string(),
            delegate_user_id: "delegate_1".to_string(),
            owner_user_id: "owner_1".to_string(),
            relationship: "spouse".to_string(),
            reason: "owner is unreachable".to_string(),
            documentation_url: None,
            status: RequestStatus::Pending,
            requested_at: now,
            grace_period_ends_at: now + chrono::Duration::days(14),
            responded_at: None,
        }
    }

    #[test]
    fn create_and_get_request() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        let request = test_request("req-1", "locker-1");
        repo.create_active(&request).unwrap();

        let loaded = repo.get("req-1").unwrap();
        assert_eq!(loaded.id, "req-1");
        assert_eq!(loaded.status, RequestStatus::Pending);
        assert_eq!(loaded.reason, "owner is unreachable");

        cleanup(&storage);
    }

    #[test]
    fn second_active_request_rejected() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        repo.create_active(&test_request("req-1", "locker-1")).unwrap();

        let result = repo.create_active(&test_request("req-2", "locker-1"));
        assert!(matches!(result, Err(StorageError::InvalidState { .. })));

        cleanup(&storage);
    }

    #[test]
    fn new_request_allowed_after_previous_resolved() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        repo.create_active(&test_request("req-1", "locker-1")).unwrap();
        repo.transition_status("req-1", RequestStatus::Pending, RequestStatus::Rejected)
            .unwrap();

        // The slot is free again once the previous request is terminal.
        repo.create_active(&test_request("req-2", "locker-1")).unwrap();

        cleanup(&storage);
    }

    #[test]
    fn active_request_on_other_locker_does_not_block() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        repo.create_active(&test_request("req-1", "locker-1")).unwrap();
        repo.create_active(&test_request("req-2", "locker-2")).unwrap();

        cleanup(&storage);
    }

    #[test]
    fn grace_period_expired_still_occupies_active_slot() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        repo.create_active(&test_request("req-1", "locker-1")).unwrap();
        repo.transition_status(
            "req-1",
            RequestStatus::Pending,
            RequestStatus::GracePeriodExpired,
        )
        .unwrap();

        let result = repo.create_active(&test_request("req-2", "locker-1"));
        assert!(matches!(result, Err(StorageError::InvalidState { .. })));

        cleanup(&storage);
    }

    #[test]
    fn transition_stamps_responded_at() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        repo.create_active(&test_request("req-1", "locker-1")).unwrap();
        let updated = repo
            .transition_status("req-1", RequestStatus::Pending, RequestStatus::Approved)
            .unwrap();

        assert_eq!(updated.status, RequestStatus::Approved);
        assert!(updated.responded_at.is_some());

        cleanup(&storage);
    }

    #[test]
    fn double_transition_rejected() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        repo.create_active(&test_request("req-1", "locker-1")).unwrap();
        repo.transition_status("req-1", RequestStatus::Pending, RequestStatus::Approved)
            .unwrap();

        // Responding again to a terminal request must be rejected,
        // not silently overwritten.
        let result =
            repo.transition_status("req-1", RequestStatus::Pending, RequestStatus::Rejected);
        assert!(matches!(result, Err(StorageError::InvalidState { .. })));

        let loaded = repo.get("req-1").unwrap();
        assert_eq!(loaded.status, RequestStatus::Approved);

        cleanup(&storage);
    }

    #[test]
    fn transition_all_moves_only_matching_rows() {
        let storage = test_storage();
        let repo = RecoveryRequestRepository::new(&storage);

        repo.create_active(&test_request("req-1", "locker-1")).unwrap();
        repo.transition_status(
            "req-1",
            RequestStatus::Pending,
            RequestStatus::GracePeriodExpired,
        )
        .unwrap();

        // Resolved history row on the same locker must be untouched.
        let mut resolved = test_request("req-0", "locker-1");
        resolved.status = RequestStatus::Rejected;
        storage
            .write_json(storage.paths().recovery_request("req-0"), &resolved)
            .unwrap();

        let moved = repo
            .transition_all_for_locker(
                "locker-1",
                RequestStatus::GracePeriodExpired,
                RequestStatus::Acknowledged,
            )
            .unwrap();

        assert_eq!(moved, 1);
        assert_eq!(repo.get("req-1").unwrap().status, RequestStatus::Acknowledged);
        assert_eq!(repo.get("req-0").unwrap().status, RequestStatus::Rejected);

        cleanup(&storage);
    }
}
