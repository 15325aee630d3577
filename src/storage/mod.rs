// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encrypted Storage Module
//!
//! This module provides persistent storage over an **encrypted filesystem
//! mount**. All data is stored under the data root (`/data` by default),
//! which the deployment platform mounts as an encrypted volume.
//!
//! ## Security Model
//!
//! - Files are encrypted on the host filesystem by the platform
//! - The service performs plain JSON file I/O with atomic writes
//! - Vault key material is additionally wrapped client-side before it ever
//!   reaches this layer (see `crate::crypto`) — storage only ever sees
//!   ciphertext blobs
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   lockers/
//!     {locker_id}.json      # Locker row (owner, delegate, recovery status)
//!   recovery/
//!     {request_id}.json     # Recovery request rows (never deleted)
//!   profiles/
//!     {user_id}.json        # Email + display name cache for notifications
//!   audit/
//!     {date}/events.jsonl   # Daily audit logs
//! ```

pub mod audit;
pub mod encrypted_fs;
pub mod ownership;
pub mod paths;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use encrypted_fs::{EncryptedStorage, StorageError, StorageResult};
pub use ownership::{AccessEnforcer, DelegatedResource, OwnedResource};
pub use paths::StoragePaths;
pub use repository::{
    LockerRepository, ProfileRepository, RecoveryRequestRepository, RecoveryStatus, RequestStatus,
    StoredLocker, StoredProfile, StoredRecoveryRequest,
};
