// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner and delegate checks for storage-level authorization.
//!
//! The API handlers authorize by resource relation (owner, delegate); the
//! same checks are enforced here so a repository misuse cannot bypass them
//! (defense in depth alongside the data layer's row-level rules).

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;
}

/// Trait for resources with a designated recovery delegate.
pub trait DelegatedResource {
    /// Get the delegate's user ID, if one is designated.
    fn delegate_user_id(&self) -> Option<&str>;
}

/// Trait for enforcing owner/delegate relations on storage operations.
pub trait AccessEnforcer {
    /// Verify that the user owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` if the user is not the owner.
    fn verify_owner(&self, user: &AuthenticatedUser) -> StorageResult<()>;

    /// Verify that the user is the designated delegate for this resource.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` if no delegate is designated
    /// or the user is not the delegate.
    fn verify_delegate(&self, user: &AuthenticatedUser) -> StorageResult<()>;

    /// Verify that the user is either the owner or the delegate.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` otherwise.
    fn verify_owner_or_delegate(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        self.verify_owner(user)
            .or_else(|_| self.verify_delegate(user))
    }
}

impl<T: OwnedResource + DelegatedResource> AccessEnforcer for T {
    fn verify_owner(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: "locker".to_string(),
            })
        }
    }

    fn verify_delegate(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.delegate_user_id() == Some(user.user_id.as_str()) {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: "locker".to_string(),
            })
        }
    }
}
