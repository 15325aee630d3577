// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`, `Deserialize`, and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Lockers**: vault setup and views (owner vs. delegate)
//! - **Recovery**: delegate-initiated requests and the owner's response
//! - **Acknowledgment**: the delegate's final access confirmation
//! - **Profiles**: notification contact details

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{RecoveryStatus, RequestStatus, StoredLocker, StoredRecoveryRequest};

// =============================================================================
// Locker Models
// =============================================================================

/// Request to create a locker (vault setup).
///
/// The vault key is generated and wrapped client-side; the server only ever
/// receives ciphertext blobs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateLockerRequest {
    /// The vault key wrapped under the owner's master password.
    pub encrypted_vault_key: String,
    /// Optional escrowed second wrap of the vault key for the delegate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_key_wrap: Option<String>,
    /// Designated recovery delegate's user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_user_id: Option<String>,
    /// Grace period in days before an unanswered recovery request
    /// escalates. Defaults to 14.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_grace_period_days: Option<i64>,
}

/// Request to update locker settings (owner only).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateLockerSettingsRequest {
    /// New delegate user ID (null or omitted clears the delegate).
    #[serde(default)]
    pub delegate_user_id: Option<String>,
    /// New grace period in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_grace_period_days: Option<i64>,
    /// New escrowed delegate wrap (e.g., after rotating the recovery code).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_key_wrap: Option<String>,
}

/// A locker as returned to its owner or delegate.
///
/// `encrypted_vault_key` is present only in the owner's view;
/// `delegate_key_wrap` only in the delegate's view once the recovery
/// handoff has been acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct LockerView {
    /// Unique locker identifier.
    pub id: String,
    /// Owner's user ID.
    pub user_id: String,
    /// Designated recovery delegate's user ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_user_id: Option<String>,
    /// Current recovery status.
    pub recovery_status: RecoveryStatus,
    /// When the active recovery was requested (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_requested_at: Option<DateTime<Utc>>,
    /// Grace period in days.
    pub recovery_grace_period_days: i64,
    /// The owner's password-wrapped vault key (owner view only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_vault_key: Option<String>,
    /// The escrowed delegate wrap (delegate view, post-acknowledgment only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_key_wrap: Option<String>,
}

impl LockerView {
    /// The owner's view: includes the password-wrapped key, never the
    /// delegate escrow.
    pub fn for_owner(locker: &StoredLocker) -> Self {
        Self {
            id: locker.id.clone(),
            user_id: locker.user_id.clone(),
            delegate_user_id: locker.delegate_user_id.clone(),
            recovery_status: locker.recovery_status,
            recovery_requested_at: locker.recovery_requested_at,
            recovery_grace_period_days: locker.recovery_grace_period_days,
            encrypted_vault_key: locker.encrypted_vault_key.clone(),
            delegate_key_wrap: None,
        }
    }

    /// The delegate's view: the escrowed wrap is released only once the
    /// handoff has been acknowledged.
    pub fn for_delegate(locker: &StoredLocker) -> Self {
        let delegate_key_wrap =
            if locker.recovery_status == RecoveryStatus::DelegateAcknowledged {
                locker.delegate_key_wrap.clone()
            } else {
                None
            };
        Self {
            id: locker.id.clone(),
            user_id: locker.user_id.clone(),
            delegate_user_id: locker.delegate_user_id.clone(),
            recovery_status: locker.recovery_status,
            recovery_requested_at: locker.recovery_requested_at,
            recovery_grace_period_days: locker.recovery_grace_period_days,
            encrypted_vault_key: None,
            delegate_key_wrap,
        }
    }
}

// =============================================================================
// Recovery Models
// =============================================================================

/// Request by the delegate to begin vault recovery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitRecoveryRequest {
    /// Delegate's stated relationship to the owner.
    pub relationship: String,
    /// Why access is being requested.
    pub reason: String,
    /// Optional supporting documentation link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

/// The owner's decision on a recovery request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryDecision {
    Approve,
    Reject,
}

/// Request by the owner to respond to a recovery request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RespondRecoveryRequest {
    /// Approve or reject.
    pub decision: RecoveryDecision,
}

/// A recovery request as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RecoveryRequestView {
    /// Unique request identifier.
    pub id: String,
    /// The locker this request targets.
    pub locker_id: String,
    /// The requesting delegate's user ID.
    pub delegate_user_id: String,
    /// Current status.
    pub status: RequestStatus,
    /// When the request was submitted.
    pub requested_at: DateTime<Utc>,
    /// When the owner's response window closes.
    pub grace_period_ends_at: DateTime<Utc>,
    /// When the request was resolved (if ever).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl From<&StoredRecoveryRequest> for RecoveryRequestView {
    fn from(request: &StoredRecoveryRequest) -> Self {
        Self {
            id: request.id.clone(),
            locker_id: request.locker_id.clone(),
            delegate_user_id: request.delegate_user_id.clone(),
            status: request.status,
            requested_at: request.requested_at,
            grace_period_ends_at: request.grace_period_ends_at,
            responded_at: request.responded_at,
        }
    }
}

// =============================================================================
// Acknowledgment Models
// =============================================================================

/// Request by the delegate to confirm receipt of access.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AcknowledgeRequest {
    /// The delegate's own user ID; must match the authenticated caller.
    pub delegate_user_id: String,
}

/// Confirmation returned once the handoff completes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AcknowledgeResponse {
    /// Human-readable confirmation naming the owner.
    pub message: String,
    /// The escrowed delegate wrap of the vault key, released by the
    /// acknowledgment (absent if the owner never escrowed one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_key_wrap: Option<String>,
}

// =============================================================================
// Expiry Scan Models
// =============================================================================

/// Summary of one expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ScanSummary {
    /// Lockers whose grace period had elapsed and were escalated.
    pub processed: usize,
    /// Delegate notifications dispatched (at most one per locker).
    pub notified: usize,
}

// =============================================================================
// Profile Models
// =============================================================================

/// Request to upsert the caller's notification profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpsertProfileRequest {
    /// Email address for recovery notifications.
    pub email: String,
    /// Name used in notification copy.
    pub display_name: String,
}
