// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Grace period expiry sweep.
//!
//! Finds every locker still awaiting an owner response whose grace period
//! has elapsed and escalates it to the delegate. The sweep runs from two
//! triggers: the scheduler's internal HTTP endpoint (shared-secret
//! authorized) and the in-process background poller — both call
//! [`run_expiry_sweep`].
//!
//! ## Idempotency
//!
//! The status flip happens before the notification, through a conditional
//! transition out of the awaiting-owner phase. A locker that was already
//! escalated no longer matches the sweep filter, and a concurrent sweep
//! that loses the flip race skips the locker entirely — so each eligible
//! locker is notified at most once no matter how many sweeps run.

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    auth::InternalAuth,
    error::ApiError,
    models::ScanSummary,
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, AuditRepository, LockerRepository, ProfileRepository,
        RecoveryRequestRepository, RecoveryStatus, RequestStatus, StoredLocker,
    },
};

#[utoipa::path(
    post,
    path = "/internal/recovery/scan",
    tag = "Internal",
    responses(
        (status = 200, body = ScanSummary),
        (status = 401, description = "Missing or invalid scheduler secret")
    )
)]
pub async fn scan_expired(
    _auth: InternalAuth,
    State(state): State<AppState>,
) -> Result<Json<ScanSummary>, ApiError> {
    Ok(Json(run_expiry_sweep(&state).await))
}

/// Execute one sweep over every expired, still-awaiting locker.
pub async fn run_expiry_sweep(state: &AppState) -> ScanSummary {
    let lockers = LockerRepository::new(&state.storage);
    let now = Utc::now();

    let expired = match lockers.list_expired_awaiting_owner(now) {
        Ok(expired) => expired,
        Err(e) => {
            warn!(error = %e, "Expiry sweep: failed to list lockers");
            return ScanSummary {
                processed: 0,
                notified: 0,
            };
        }
    };

    if expired.is_empty() {
        return ScanSummary {
            processed: 0,
            notified: 0,
        };
    }

    info!(count = expired.len(), "Expiry sweep: escalating lockers");

    let mut summary = ScanSummary {
        processed: 0,
        notified: 0,
    };

    for locker in &expired {
        // Flip first: this is the idempotency gate. Losing the race means
        // another sweep owns this locker's escalation — skip it.
        match lockers.transition_awaiting_owner(&locker.id, RecoveryStatus::GracePeriodExpired) {
            Ok(_) => {}
            Err(e) => {
                info!(locker_id = %locker.id, error = %e, "Expiry sweep: locker already escalated");
                continue;
            }
        }

        let requests = RecoveryRequestRepository::new(&state.storage);
        if let Err(e) = requests.transition_all_for_locker(
            &locker.id,
            RequestStatus::Pending,
            RequestStatus::GracePeriodExpired,
        ) {
            warn!(locker_id = %locker.id, error = %e, "Expiry sweep: failed to move requests");
        }

        summary.processed += 1;

        let _ = AuditRepository::new(&state.storage).log(
            &AuditEvent::new(AuditEventType::GracePeriodExpired)
                .with_resource("locker", &locker.id),
        );

        if notify_delegate_of_access(state, locker).await {
            summary.notified += 1;
        }
    }

    info!(
        processed = summary.processed,
        notified = summary.notified,
        "Expiry sweep complete"
    );
    summary
}

/// Send the delegate their access notification. Returns whether a send was
/// dispatched successfully. The email references the locker and delegate,
/// never key material.
async fn notify_delegate_of_access(state: &AppState, locker: &StoredLocker) -> bool {
    let Some(ref delegate_id) = locker.delegate_user_id else {
        warn!(locker_id = %locker.id, "Expiry sweep: locker has no delegate to notify");
        return false;
    };

    let profiles = ProfileRepository::new(&state.storage);
    let Ok(delegate) = profiles.get(delegate_id) else {
        warn!(locker_id = %locker.id, delegate_id, "Expiry sweep: no delegate profile");
        return false;
    };
    let owner_name = profiles
        .get(&locker.user_id)
        .map(|p| p.display_name)
        .unwrap_or_else(|_| "the locker owner".to_string());

    match state
        .mailer
        .send_delegate_access_email(
            &delegate.email,
            &delegate.display_name,
            &owner_name,
            &locker.id,
        )
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(locker_id = %locker.id, error = %e, "Expiry sweep: failed to notify delegate");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoredRecoveryRequest;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_state() -> (AppState, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let (state, _storage) = AppState::for_tests(temp.path());
        (state, temp)
    }

    fn seed_profile(state: &AppState, user_id: &str, name: &str) {
        ProfileRepository::new(&state.storage)
            .upsert(&crate::storage::StoredProfile {
                user_id: user_id.to_string(),
                email: format!("{user_id}@example.com"),
                display_name: name.to_string(),
                updated_at: Utc::now(),
            })
            .expect("seed profile");
    }

    /// Seed a locker with a pending request whose grace period started
    /// `age_days` ago against a 14-day window.
    fn seed_pending(state: &AppState, locker_id: &str, age_days: i64) {
        let requested_at = Utc::now() - Duration::days(age_days);
        let locker = StoredLocker {
            id: locker_id.to_string(),
            user_id: format!("owner-of-{locker_id}"),
            delegate_user_id: Some(format!("delegate-of-{locker_id}")),
            recovery_status: RecoveryStatus::Pending,
            recovery_requested_at: Some(requested_at),
            recovery_grace_period_days: 14,
            encrypted_vault_key: Some("wrap".to_string()),
            delegate_key_wrap: None,
            created_at: requested_at,
            updated_at: requested_at,
        };
        LockerRepository::new(&state.storage)
            .create(&locker)
            .expect("seed locker");

        RecoveryRequestRepository::new(&state.storage)
            .create_active(&StoredRecoveryRequest {
                id: format!("req-{locker_id}"),
                locker_id: locker_id.to_string(),
                delegate_user_id: format!("delegate-of-{locker_id}"),
                owner_user_id: format!("owner-of-{locker_id}"),
                relationship: "friend".to_string(),
                reason: "unreachable".to_string(),
                documentation_url: None,
                status: RequestStatus::Pending,
                requested_at,
                grace_period_ends_at: requested_at + Duration::days(14),
                responded_at: None,
            })
            .expect("seed request");

        seed_profile(state, &format!("owner-of-{locker_id}"), "Owner");
        seed_profile(state, &format!("delegate-of-{locker_id}"), "Delegate");
    }

    #[tokio::test]
    async fn sweep_escalates_only_expired_lockers() {
        let (state, _temp) = test_state();
        seed_pending(&state, "l-old", 20);
        seed_pending(&state, "l-new", 3);

        let summary = run_expiry_sweep(&state).await;
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.notified, 1);

        let lockers = LockerRepository::new(&state.storage);
        assert_eq!(
            lockers.get("l-old").unwrap().recovery_status,
            RecoveryStatus::GracePeriodExpired
        );
        assert_eq!(
            lockers.get("l-new").unwrap().recovery_status,
            RecoveryStatus::Pending
        );

        let requests = RecoveryRequestRepository::new(&state.storage);
        assert_eq!(
            requests.get("req-l-old").unwrap().status,
            RequestStatus::GracePeriodExpired
        );
        assert_eq!(
            requests.get("req-l-new").unwrap().status,
            RequestStatus::Pending
        );
    }

    #[tokio::test]
    async fn repeated_sweeps_escalate_each_locker_once() {
        let (state, _temp) = test_state();
        seed_pending(&state, "l-old", 20);

        let first = run_expiry_sweep(&state).await;
        assert_eq!(first.processed, 1);
        assert_eq!(first.notified, 1);

        // Scenario: the scanner fires three times the same day. The locker
        // must be escalated (and its delegate notified) exactly once.
        for _ in 0..2 {
            let again = run_expiry_sweep(&state).await;
            assert_eq!(again.processed, 0);
            assert_eq!(again.notified, 0);
        }
    }

    #[tokio::test]
    async fn sweep_over_empty_store_is_a_noop() {
        let (state, _temp) = test_state();
        let summary = run_expiry_sweep(&state).await;
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.notified, 0);
    }

    #[tokio::test]
    async fn sweep_counts_processed_without_delegate_profile() {
        let (state, _temp) = test_state();
        seed_pending(&state, "l-old", 20);
        // Drop the delegate profile so notification cannot be addressed.
        state
            .storage
            .delete(state.storage.paths().profile("delegate-of-l-old"))
            .unwrap();

        let summary = run_expiry_sweep(&state).await;
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.notified, 0);

        // Still escalated: notification is best-effort.
        assert_eq!(
            LockerRepository::new(&state.storage)
                .get("l-old")
                .unwrap()
                .recovery_status,
            RecoveryStatus::GracePeriodExpired
        );
    }

    #[tokio::test]
    async fn scan_endpoint_returns_summary() {
        let (state, _temp) = test_state();
        seed_pending(&state, "l-old", 20);

        let Json(summary) = scan_expired(crate::auth::InternalAuth, State(state.clone()))
            .await
            .expect("scan succeeds");
        assert_eq!(summary.processed, 1);
    }
}
