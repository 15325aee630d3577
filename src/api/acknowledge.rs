// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Delegate acknowledgment — the final step of the recovery handoff.
//!
//! Converts a notified-but-unconfirmed recovery into full access: the
//! locker moves to `delegate_acknowledged`, expired request rows move to
//! `acknowledged`, and the escrowed delegate wrap of the vault key is
//! released in the response. Decryption of vault contents happens
//! client-side with the delegate's recovery code; the server never holds
//! plaintext key material.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    models::{AcknowledgeRequest, AcknowledgeResponse},
    state::AppState,
    storage::{
        AccessEnforcer, AuditEventType, LockerRepository, ProfileRepository,
        RecoveryRequestRepository, RecoveryStatus, RequestStatus,
    },
};

#[utoipa::path(
    post,
    path = "/v1/lockers/{locker_id}/acknowledge",
    params(("locker_id" = String, Path, description = "Locker ID")),
    request_body = AcknowledgeRequest,
    tag = "Recovery",
    responses(
        (status = 200, body = AcknowledgeResponse),
        (status = 403, description = "Caller is not the notified delegate"),
        (status = 409, description = "Locker is not awaiting acknowledgment")
    )
)]
pub async fn acknowledge_access(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(locker_id): Path<String>,
    Json(request): Json<AcknowledgeRequest>,
) -> Result<Json<AcknowledgeResponse>, ApiError> {
    // The body's delegate id must be the authenticated caller — a client
    // cannot acknowledge on someone else's behalf.
    if request.delegate_user_id != user.user_id {
        return Err(ApiError::authorization(
            "delegate_user_id does not match the authenticated caller",
        ));
    }

    let lockers = LockerRepository::new(&state.storage);
    let locker = lockers
        .get(&locker_id)
        .map_err(|_| ApiError::not_found("Locker not found"))?;

    if locker.verify_delegate(&user).is_err() {
        audit_log!(
            &state.storage,
            AuditEventType::PermissionDenied,
            user,
            "locker",
            &locker_id
        );
        return Err(ApiError::authorization(
            "You are not the designated delegate for this locker",
        ));
    }

    // Conditional flip: only a grace-period-expired locker can be
    // acknowledged, and only once.
    let locker = lockers.transition_status(
        &locker_id,
        RecoveryStatus::GracePeriodExpired,
        RecoveryStatus::DelegateAcknowledged,
    )?;

    RecoveryRequestRepository::new(&state.storage).transition_all_for_locker(
        &locker_id,
        RequestStatus::GracePeriodExpired,
        RequestStatus::Acknowledged,
    )?;

    audit_log!(
        &state.storage,
        AuditEventType::AccessAcknowledged,
        user,
        "locker",
        &locker_id
    );

    let owner_name = ProfileRepository::new(&state.storage)
        .get(&locker.user_id)
        .map(|p| p.display_name)
        .unwrap_or_else(|_| locker.user_id.clone());

    Ok(Json(AcknowledgeResponse {
        message: format!("You now have access to {owner_name}'s Legacy Locker"),
        delegate_key_wrap: locker.delegate_key_wrap,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StoredLocker, StoredRecoveryRequest};
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn test_state() -> (AppState, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let (state, _storage) = AppState::for_tests(temp.path());
        (state, temp)
    }

    fn mock_auth(user_id: &str) -> Auth {
        Auth(crate::auth::AuthenticatedUser {
            user_id: user_id.to_string(),
            session_id: None,
            issuer: "test".to_string(),
            expires_at: 0,
        })
    }

    /// Seed a locker that the expiry sweep has already escalated.
    fn seed_escalated(state: &AppState, locker_id: &str) {
        let requested_at = Utc::now() - Duration::days(20);
        LockerRepository::new(&state.storage)
            .create(&StoredLocker {
                id: locker_id.to_string(),
                user_id: "owner_1".to_string(),
                delegate_user_id: Some("delegate_1".to_string()),
                recovery_status: RecoveryStatus::GracePeriodExpired,
                recovery_requested_at: Some(requested_at),
                recovery_grace_period_days: 14,
                encrypted_vault_key: Some("owner-wrap".to_string()),
                delegate_key_wrap: Some("escrow-wrap".to_string()),
                created_at: requested_at,
                updated_at: requested_at,
            })
            .expect("seed locker");

        RecoveryRequestRepository::new(&state.storage)
            .create_active(&StoredRecoveryRequest {
                id: format!("req-{locker_id}"),
                locker_id: locker_id.to_string(),
                delegate_user_id: "delegate_1".to_string(),
                owner_user_id: "owner_1".to_string(),
                relationship: "spouse".to_string(),
                reason: "unreachable".to_string(),
                documentation_url: None,
                status: RequestStatus::GracePeriodExpired,
                requested_at,
                grace_period_ends_at: requested_at + Duration::days(14),
                responded_at: None,
            })
            .expect("seed request");
    }

    fn ack_body() -> AcknowledgeRequest {
        AcknowledgeRequest {
            delegate_user_id: "delegate_1".to_string(),
        }
    }

    #[tokio::test]
    async fn acknowledge_completes_the_handoff() {
        let (state, _temp) = test_state();
        seed_escalated(&state, "l-1");

        let Json(response) = acknowledge_access(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path("l-1".to_string()),
            Json(ack_body()),
        )
        .await
        .expect("acknowledge succeeds");

        // Confirmation names the owner (falls back to the user id when no
        // profile exists) and releases the escrowed wrap.
        assert!(response.message.contains("owner_1"));
        assert_eq!(response.delegate_key_wrap.as_deref(), Some("escrow-wrap"));

        let locker = LockerRepository::new(&state.storage).get("l-1").unwrap();
        assert_eq!(locker.recovery_status, RecoveryStatus::DelegateAcknowledged);

        let request = RecoveryRequestRepository::new(&state.storage)
            .get("req-l-1")
            .unwrap();
        assert_eq!(request.status, RequestStatus::Acknowledged);
        assert!(request.responded_at.is_some());
    }

    #[tokio::test]
    async fn acknowledge_rejects_mismatched_body_id() {
        let (state, _temp) = test_state();
        seed_escalated(&state, "l-1");

        let result = acknowledge_access(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path("l-1".to_string()),
            Json(AcknowledgeRequest {
                delegate_user_id: "delegate_2".to_string(),
            }),
        )
        .await;

        match result {
            Err(err) => assert_eq!(err.status, StatusCode::FORBIDDEN),
            Ok(_) => panic!("expected authorization error"),
        }
    }

    #[tokio::test]
    async fn acknowledge_rejects_non_delegate() {
        let (state, _temp) = test_state();
        seed_escalated(&state, "l-1");

        for caller in ["owner_1", "stranger_1"] {
            let result = acknowledge_access(
                mock_auth(caller),
                State(state.clone()),
                Path("l-1".to_string()),
                Json(AcknowledgeRequest {
                    delegate_user_id: caller.to_string(),
                }),
            )
            .await;

            match result {
                Err(err) => assert_eq!(err.status, StatusCode::FORBIDDEN),
                Ok(_) => panic!("expected authorization error for {caller}"),
            }
        }

        // No state change occurred.
        let locker = LockerRepository::new(&state.storage).get("l-1").unwrap();
        assert_eq!(locker.recovery_status, RecoveryStatus::GracePeriodExpired);
    }

    #[tokio::test]
    async fn acknowledge_requires_grace_period_expired() {
        let (state, _temp) = test_state();
        seed_escalated(&state, "l-1");

        // Wind the locker back to pending: acknowledgment must fail.
        let mut locker = LockerRepository::new(&state.storage).get("l-1").unwrap();
        locker.recovery_status = RecoveryStatus::Pending;
        LockerRepository::new(&state.storage).update(&locker).unwrap();

        let result = acknowledge_access(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path("l-1".to_string()),
            Json(ack_body()),
        )
        .await;

        match result {
            Err(err) => assert_eq!(err.status, StatusCode::CONFLICT),
            Ok(_) => panic!("expected conflict"),
        }
    }

    #[tokio::test]
    async fn double_acknowledge_is_rejected() {
        let (state, _temp) = test_state();
        seed_escalated(&state, "l-1");

        acknowledge_access(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path("l-1".to_string()),
            Json(ack_body()),
        )
        .await
        .expect("first acknowledge succeeds");

        let result = acknowledge_access(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path("l-1".to_string()),
            Json(ack_body()),
        )
        .await;

        match result {
            Err(err) => assert_eq!(err.status, StatusCode::CONFLICT),
            Ok(_) => panic!("expected conflict for double acknowledge"),
        }
    }

    #[tokio::test]
    async fn acknowledge_missing_locker_is_not_found() {
        let (state, _temp) = test_state();

        let result = acknowledge_access(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path("ghost".to_string()),
            Json(ack_body()),
        )
        .await;

        match result {
            Err(err) => assert_eq!(err.status, StatusCode::NOT_FOUND),
            Ok(_) => panic!("expected not found"),
        }
    }
}
