// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AcknowledgeRequest, AcknowledgeResponse, CreateLockerRequest, LockerView,
        RecoveryDecision, RecoveryRequestView, RespondRecoveryRequest, ScanSummary,
        SubmitRecoveryRequest, UpdateLockerSettingsRequest, UpsertProfileRequest,
    },
    state::AppState,
    storage::{RecoveryStatus, RequestStatus},
};

pub mod acknowledge;
pub mod expiry;
pub mod health;
pub mod lockers;
pub mod recovery;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/lockers", post(lockers::create_locker))
        .route("/lockers/me", get(lockers::get_my_locker))
        .route(
            "/lockers/me/settings",
            put(lockers::update_locker_settings),
        )
        .route("/lockers/{locker_id}", get(lockers::get_locker))
        .route(
            "/lockers/{locker_id}/recovery",
            post(recovery::submit_recovery),
        )
        .route(
            "/lockers/{locker_id}/acknowledge",
            post(acknowledge::acknowledge_access),
        )
        .route(
            "/recovery/{request_id}/respond",
            post(recovery::respond_recovery),
        )
        .route("/profile", put(lockers::upsert_profile));

    let internal_routes = Router::new().route("/recovery/scan", post(expiry::scan_expired));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .nest("/internal", internal_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        lockers::create_locker,
        lockers::get_my_locker,
        lockers::get_locker,
        lockers::update_locker_settings,
        lockers::upsert_profile,
        recovery::submit_recovery,
        recovery::respond_recovery,
        acknowledge::acknowledge_access,
        expiry::scan_expired
    ),
    components(
        schemas(
            LockerView,
            CreateLockerRequest,
            UpdateLockerSettingsRequest,
            SubmitRecoveryRequest,
            RespondRecoveryRequest,
            RecoveryDecision,
            RecoveryRequestView,
            RecoveryStatus,
            RequestStatus,
            AcknowledgeRequest,
            AcknowledgeResponse,
            ScanSummary,
            UpsertProfileRequest
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Lockers", description = "Legacy Locker setup and views"),
        (name = "Recovery", description = "Delegate recovery workflow"),
        (name = "Profiles", description = "Notification contact details"),
        (name = "Internal", description = "Scheduler-only endpoints")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;
    use crate::storage::{
        LockerRepository, ProfileRepository, RecoveryRequestRepository, RecoveryStatus,
        RequestStatus, StoredProfile,
    };
    use axum::extract::{Path, State};
    use axum::Json;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let temp = TempDir::new().expect("temp dir");
        let (state, _storage) = AppState::for_tests(temp.path());
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    fn mock_auth(user_id: &str) -> Auth {
        Auth(crate::auth::AuthenticatedUser {
            user_id: user_id.to_string(),
            session_id: None,
            issuer: "test".to_string(),
            expires_at: 0,
        })
    }

    /// Full handoff lifecycle: the delegate submits, the owner never
    /// responds, the grace period elapses, the sweep escalates once (even
    /// over repeated runs), and the delegate acknowledges to receive the
    /// escrowed key wrap.
    #[tokio::test]
    async fn unanswered_recovery_escalates_and_hands_off() {
        let temp = TempDir::new().expect("temp dir");
        let (state, storage) = AppState::for_tests(temp.path());

        for (user_id, name) in [("owner_1", "Olive Owner"), ("delegate_1", "Dana Delegate")] {
            ProfileRepository::new(&storage)
                .upsert(&StoredProfile {
                    user_id: user_id.to_string(),
                    email: format!("{user_id}@example.com"),
                    display_name: name.to_string(),
                    updated_at: Utc::now(),
                })
                .expect("seed profile");
        }

        let key = crate::crypto::VaultKey::generate().expect("generate");
        let escrow_wrap =
            crate::crypto::wrap_vault_key(&key, "delegate-recovery-code").expect("wrap");
        let Json(locker) = lockers::create_locker(
            mock_auth("owner_1"),
            State(state.clone()),
            Json(crate::models::CreateLockerRequest {
                encrypted_vault_key: crate::crypto::wrap_vault_key(&key, "owner-master-pw")
                    .expect("wrap"),
                delegate_key_wrap: Some(escrow_wrap.clone()),
                delegate_user_id: Some("delegate_1".to_string()),
                recovery_grace_period_days: Some(14),
            }),
        )
        .await
        .expect("create locker");

        let Json(submitted) = recovery::submit_recovery(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path(locker.id.clone()),
            Json(crate::models::SubmitRecoveryRequest {
                relationship: "spouse".to_string(),
                reason: "Owner is unreachable".to_string(),
                documentation_url: None,
            }),
        )
        .await
        .expect("submit recovery");

        // The owner never responds; wind the clock 15 days forward by
        // rewinding the stored timestamps.
        let lockers_repo = LockerRepository::new(&storage);
        let mut stored = lockers_repo.get(&locker.id).unwrap();
        stored.recovery_requested_at = Some(Utc::now() - Duration::days(15));
        lockers_repo.update(&stored).unwrap();

        let requests_repo = RecoveryRequestRepository::new(&storage);
        let mut stored_request = requests_repo.get(&submitted.id).unwrap();
        stored_request.grace_period_ends_at = Utc::now() - Duration::days(1);
        requests_repo.update(&stored_request).unwrap();

        // Scanner fires three times that day; exactly one escalation.
        let first = expiry::run_expiry_sweep(&state).await;
        assert_eq!(first.processed, 1);
        assert_eq!(first.notified, 1);
        for _ in 0..2 {
            let again = expiry::run_expiry_sweep(&state).await;
            assert_eq!(again.processed, 0);
            assert_eq!(again.notified, 0);
        }

        assert_eq!(
            lockers_repo.get(&locker.id).unwrap().recovery_status,
            RecoveryStatus::GracePeriodExpired
        );

        // The delegate confirms receipt and the escrowed wrap is released.
        let Json(ack) = acknowledge::acknowledge_access(
            mock_auth("delegate_1"),
            State(state.clone()),
            Path(locker.id.clone()),
            Json(crate::models::AcknowledgeRequest {
                delegate_user_id: "delegate_1".to_string(),
            }),
        )
        .await
        .expect("acknowledge");

        assert!(ack.message.contains("Olive Owner"));
        assert_eq!(ack.delegate_key_wrap, Some(escrow_wrap.clone()));

        assert_eq!(
            lockers_repo.get(&locker.id).unwrap().recovery_status,
            RecoveryStatus::DelegateAcknowledged
        );
        assert_eq!(
            requests_repo.get(&submitted.id).unwrap().status,
            RequestStatus::Acknowledged
        );

        // The released wrap unwraps with the delegate's recovery code, and
        // the recovered key decrypts what the original encrypted.
        let ciphertext =
            crate::crypto::encrypt_with_vault_key(b"bank account: 12345", &key).expect("encrypt");
        let recovered =
            crate::crypto::unwrap_vault_key(&ack.delegate_key_wrap.unwrap(), "delegate-recovery-code")
                .expect("unwrap with recovery code");
        let plaintext =
            crate::crypto::decrypt_with_vault_key(&ciphertext, &recovered).expect("decrypt");
        assert_eq!(plaintext, b"bank account: 12345");
    }
}
