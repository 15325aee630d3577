// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Locker repository for encrypted storage.
//!
//! One locker per owner. Each locker is stored as a separate JSON file
//! under `/data/lockers/`. The `recovery_status` field is the state-machine
//! anchor: it is only mutated through [`LockerRepository::transition_status`]
//! (or at creation), so every transition carries a status precondition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::ownership::{DelegatedResource, OwnedResource};

use super::super::{EncryptedStorage, StorageError, StorageResult};

/// Recovery status of a locker.
///
/// `none → pending → (approved | rejected | grace_period_expired) →
/// delegate_acknowledged`. `GracePeriodActive` is an accepted alias for the
/// awaiting-owner phase; new submissions stamp `Pending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    None,
    Pending,
    GracePeriodActive,
    GracePeriodExpired,
    DelegateAcknowledged,
    Approved,
    Rejected,
}

impl RecoveryStatus {
    /// Whether a recovery flow is currently in flight for the locker.
    ///
    /// Covers every phase from submission through acknowledgment; only
    /// `None`, `Approved`, and `Rejected` allow a new submission.
    pub fn recovery_in_flight(self) -> bool {
        matches!(
            self,
            RecoveryStatus::Pending
                | RecoveryStatus::GracePeriodActive
                | RecoveryStatus::GracePeriodExpired
                | RecoveryStatus::DelegateAcknowledged
        )
    }

    /// Whether the locker is awaiting an owner response (sweep filter).
    pub fn awaiting_owner(self) -> bool {
        matches!(
            self,
            RecoveryStatus::Pending | RecoveryStatus::GracePeriodActive
        )
    }

    /// Wire name, as serialized (used in error messages).
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryStatus::None => "none",
            RecoveryStatus::Pending => "pending",
            RecoveryStatus::GracePeriodActive => "grace_period_active",
            RecoveryStatus::GracePeriodExpired => "grace_period_expired",
            RecoveryStatus::DelegateAcknowledged => "delegate_acknowledged",
            RecoveryStatus::Approved => "approved",
            RecoveryStatus::Rejected => "rejected",
        }
    }
}

/// Locker stored on the encrypted filesystem.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredLocker {
    /// Unique locker identifier (UUID)
    pub id: String,
    /// Owner's user ID
    pub user_id: String,
    /// Designated recovery delegate's user ID (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_user_id: Option<String>,
    /// Current recovery status
    pub recovery_status: RecoveryStatus,
    /// When the active recovery was requested (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_requested_at: Option<DateTime<Utc>>,
    /// Owner-configurable grace period in days
    pub recovery_grace_period_days: i64,
    /// The vault key wrapped under the owner's master password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_vault_key: Option<String>,
    /// Escrowed second wrap of the vault key for the delegate
    /// (released only after acknowledgment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_key_wrap: Option<String>,
    /// When the locker was created
    pub created_at: DateTime<Utc>,
    /// When the locker was last modified
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for StoredLocker {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }
}

impl DelegatedResource for StoredLocker {
    fn delegate_user_id(&self) -> Option<&str> {
        self.delegate_user_id.as_deref()
    }
}

/// Repository for locker operations on encrypted storage.
pub struct LockerRepository<'a> {
    storage: &'a EncryptedStorage,
}

impl<'a> LockerRepository<'a> {
    /// Create a new LockerRepository.
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self { storage }
    }

    /// Check if a locker exists.
    pub fn exists(&self, locker_id: &str) -> bool {
        self.storage.exists(self.storage.paths().locker(locker_id))
    }

    /// Get a locker by ID.
    pub fn get(&self, locker_id: &str) -> StorageResult<StoredLocker> {
        let path = self.storage.paths().locker(locker_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Locker {locker_id}")));
        }
        self.storage.read_json(path)
    }

    /// Get the locker owned by a user.
    pub fn get_by_owner(&self, user_id: &str) -> StorageResult<StoredLocker> {
        let locker_ids = self
            .storage
            .list_files(self.storage.paths().lockers_dir(), "json")?;

        for id in locker_ids {
            if let Ok(locker) = self.get(&id) {
                if locker.user_id == user_id {
                    return Ok(locker);
                }
            }
        }

        Err(StorageError::NotFound(format!(
            "Locker owned by {user_id}"
        )))
    }

    /// Create a new locker.
    ///
    /// Enforces one locker per owner.
    pub fn create(&self, locker: &StoredLocker) -> StorageResult<()> {
        let locker_id = &locker.id;

        if self.exists(locker_id) {
            return Err(StorageError::AlreadyExists(format!("Locker {locker_id}")));
        }

        if self.get_by_owner(&locker.user_id).is_ok() {
            return Err(StorageError::AlreadyExists(format!(
                "Locker for owner {}",
                locker.user_id
            )));
        }

        self.storage
            .write_json(self.storage.paths().locker(locker_id), locker)
    }

    /// Update an existing locker.
    pub fn update(&self, locker: &StoredLocker) -> StorageResult<()> {
        let locker_id = &locker.id;

        if !self.exists(locker_id) {
            return Err(StorageError::NotFound(format!("Locker {locker_id}")));
        }

        self.storage
            .write_json(self.storage.paths().locker(locker_id), locker)
    }

    /// Conditionally transition `recovery_status`, stamping `updated_at`.
    ///
    /// Re-reads the locker and applies the write only if the current status
    /// still equals `expected` — the file-store equivalent of
    /// `UPDATE ... WHERE status = expected`. A losing concurrent caller
    /// observes `StorageError::InvalidState` instead of double-applying.
    ///
    /// Returns the locker as written.
    pub fn transition_status(
        &self,
        locker_id: &str,
        expected: RecoveryStatus,
        new: RecoveryStatus,
    ) -> StorageResult<StoredLocker> {
        let mut locker = self.get(locker_id)?;

        if locker.recovery_status != expected {
            return Err(StorageError::InvalidState {
                resource: format!("Locker {locker_id}"),
                current: locker.recovery_status.as_str().to_string(),
            });
        }

        locker.recovery_status = new;
        locker.updated_at = Utc::now();
        self.update(&locker)?;
        Ok(locker)
    }

    /// Conditionally move the locker into the `Pending` recovery phase,
    /// stamping `recovery_requested_at`.
    ///
    /// Fails with `StorageError::InvalidState` if a recovery is already in
    /// flight, so two concurrent submissions cannot both succeed.
    pub fn begin_recovery(
        &self,
        locker_id: &str,
        requested_at: DateTime<Utc>,
    ) -> StorageResult<StoredLocker> {
        let mut locker = self.get(locker_id)?;

        if locker.recovery_status.recovery_in_flight() {
            return Err(StorageError::InvalidState {
                resource: format!("Locker {locker_id}"),
                current: locker.recovery_status.as_str().to_string(),
            });
        }

        locker.recovery_status = RecoveryStatus::Pending;
        locker.recovery_requested_at = Some(requested_at);
        locker.updated_at = Utc::now();
        self.update(&locker)?;
        Ok(locker)
    }

    /// Conditionally transition a locker out of the awaiting-owner phase
    /// (`Pending` or its `GracePeriodActive` alias) into `new`.
    ///
    /// Used by the owner's response and by the expiry sweep; a concurrent
    /// caller that lost the race observes `StorageError::InvalidState` and
    /// must not re-run its side effects.
    pub fn transition_awaiting_owner(
        &self,
        locker_id: &str,
        new: RecoveryStatus,
    ) -> StorageResult<StoredLocker> {
        let mut locker = self.get(locker_id)?;

        if !locker.recovery_status.awaiting_owner() {
            return Err(StorageError::InvalidState {
                resource: format!("Locker {locker_id}"),
                current: locker.recovery_status.as_str().to_string(),
            });
        }

        locker.recovery_status = new;
        locker.updated_at = Utc::now();
        self.update(&locker)?;
        Ok(locker)
    }

    /// List all lockers awaiting an owner response whose grace period has
    /// elapsed (sweep candidates).
    pub fn list_expired_awaiting_owner(
        &self,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<StoredLocker>> {
        let locker_ids = self
            .storage
            .list_files(self.storage.paths().lockers_dir(), "json")?;

        let mut expired = Vec::new();
        for id in locker_ids {
            if let Ok(locker) = self.get(&id) {
                if !locker.recovery_status.awaiting_owner() {
                    continue;
                }
                let Some(requested_at) = locker.recovery_requested_at else {
                    continue;
                };
                let ends_at = requested_at + chrono::Duration::days(locker.recovery_grace_period_days);
                if ends_at <= now {
                    expired.push(locker);
                }
            }
        }

        Ok(expired)
    }
}
