// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to encrypted storage.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using the EncryptedStorage for all file operations. Status mutations go
//! through conditional `transition_status` methods so concurrent callers
//! cannot double-apply a transition.

pub mod lockers;
pub mod profiles;
pub mod recovery;

pub use lockers::{LockerRepository, RecoveryStatus, StoredLocker};
pub use profiles::{ProfileRepository, StoredProfile};
pub use recovery::{RecoveryRequestRepository, RequestStatus, StoredRecoveryRequest};
