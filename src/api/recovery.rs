// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recovery request submission and the owner's response.
//!
//! State machine: `none → pending → (approved | rejected |
//! grace_period_expired) → delegate_acknowledged`. Both handlers validate
//! authorization and state preconditions before any mutation, mutate through
//! conditional repository transitions, and only then dispatch notifications
//! (fire-and-forget — a failed send never rolls back the transition).

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use tracing::warn;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    models::{
        RecoveryDecision, RecoveryRequestView, RespondRecoveryRequest, SubmitRecoveryRequest,
    },
    state::AppState,
    storage::{
        AccessEnforcer, AuditEventType, LockerRepository, ProfileRepository,
        RecoveryRequestRepository, RecoveryStatus, RequestStatus, StoredProfile,
        StoredRecoveryRequest,
    },
};

#[utoipa::path(
    post,
    path = "/v1/lockers/{locker_id}/recovery",
    params(("locker_id" = String, Path, description = "Locker ID")),
    request_body = SubmitRecoveryRequest,
    tag = "Recovery",
    responses(
        (status = 200, body = RecoveryRequestView),
        (status = 403, description = "Caller is not the designated delegate"),
        (status = 409, description = "A recovery request is already outstanding")
    )
)]
pub async fn submit_recovery(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(locker_id): Path<String>,
    Json(request): Json<SubmitRecoveryRequest>,
) -> Result<Json<RecoveryRequestView>, ApiError> {
    let lockers = LockerRepository::new(&state.storage);
    let locker = lockers
        .get(&locker_id)
        .map_err(|_| ApiError::not_found("Locker not found"))?;

    // Only the designated delegate may open a recovery.
    if locker.verify_delegate(&user).is_err() {
        audit_log!(
            &state.storage,
            AuditEventType::PermissionDenied,
            user,
            "locker",
            &locker_id
        );
        return Err(ApiError::authorization(
            "Only the designated delegate can request recovery for this locker",
        ));
    }

    if locker.recovery_status.recovery_in_flight() {
        return Err(ApiError::invalid_state(format!(
            "A recovery is already '{}' for this locker",
            locker.recovery_status.as_str()
        )));
    }

    if request.reason.trim().is_empty() {
        return Err(ApiError::bad_request("reason is required"));
    }
    if let Some(ref doc_url) = request.documentation_url {
        url::Url::parse(doc_url)
            .map_err(|_| ApiError::bad_request("documentation_url is not a valid URL"))?;
    }

    let now = Utc::now();
    let stored = StoredRecoveryRequest {
        id: uuid::Uuid::new_v4().to_string(),
        locker_id: locker.id.clone(),
        delegate_user_id: user.user_id.clone(),
        owner_user_id: locker.user_id.clone(),
        relationship: request.relationship,
        reason: request.reason,
        documentation_url: request.documentation_url,
        status: RequestStatus::Pending,
        requested_at: now,
        grace_period_ends_at: now + Duration::days(locker.recovery_grace_period_days),
        responded_at: None,
    };

    // The create path enforces the at-most-one-active-request invariant;
    // begin_recovery re-checks the locker side of the same condition.
    let requests = RecoveryRequestRepository::new(&state.storage);
    requests.create_active(&stored)?;
    lockers.begin_recovery(&locker.id, now)?;

    audit_log!(
        &state.storage,
        AuditEventType::RecoveryRequested,
        user,
        "locker",
        &locker.id
    );

    notify_owner_of_request(&state, &stored, locker.recovery_grace_period_days);

    Ok(Json(RecoveryRequestView::from(&stored)))
}

#[utoipa::path(
    post,
    path = "/v1/recovery/{request_id}/respond",
    params(("request_id" = String, Path, description = "Recovery request ID")),
    request_body = RespondRecoveryRequest,
    tag = "Recovery",
    responses(
        (status = 200, body = RecoveryRequestView),
        (status = 403, description = "Caller is not the locker owner"),
        (status = 409, description = "Request already resolved")
    )
)]
pub async fn respond_recovery(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(request): Json<RespondRecoveryRequest>,
) -> Result<Json<RecoveryRequestView>, ApiError> {
    let requests = RecoveryRequestRepository::new(&state.storage);
    let recovery = requests
        .get(&request_id)
        .map_err(|_| ApiError::not_found("Recovery request not found"))?;

    if recovery.owner_user_id != user.user_id {
        audit_log!(
            &state.storage,
            AuditEventType::PermissionDenied,
            user,
            "recovery_request",
            &request_id
        );
        return Err(ApiError::authorization(
            "Only the locker owner can respond to this recovery request",
        ));
    }

    let (request_status, locker_status, event) = match request.decision {
        RecoveryDecision::Approve => (
            RequestStatus::Approved,
            RecoveryStatus::Approved,
            AuditEventType::RecoveryApproved,
        ),
        RecoveryDecision::Reject => (
            RequestStatus::Rejected,
            RecoveryStatus::Rejected,
            AuditEventType::RecoveryRejected,
        ),
    };

    // Conditional transitions: a second response to an already-resolved
    // request observes the conflict instead of overwriting it.
    let updated = requests.transition_status(&request_id, RequestStatus::Pending, request_status)?;
    LockerRepository::new(&state.storage)
        .transition_awaiting_owner(&updated.locker_id, locker_status)?;

    audit_log!(
        &state.storage,
        event,
        user,
        "recovery_request",
        &request_id
    );

    notify_delegate_of_decision(
        &state,
        &updated,
        request.decision == RecoveryDecision::Approve,
    );

    Ok(Json(RecoveryRequestView::from(&updated)))
}

/// Look up a notification profile, warning when absent.
fn profile_for(state: &AppState, user_id: &str, role: &str) -> Option<StoredProfile> {
    match ProfileRepository::new(&state.storage).get(user_id) {
        Ok(profile) => Some(profile),
        Err(_) => {
            warn!(user_id, role, "No notification profile; skipping email");
            None
        }
    }
}

/// Email the owner that their delegate opened a recovery request.
fn notify_owner_of_request(
    state: &AppState,
    request: &StoredRecoveryRequest,
    grace_period_days: i64,
) {
    let Some(owner) = profile_for(state, &request.owner_user_id, "owner") else {
        return;
    };
    let delegate_name = profile_for(state, &request.delegate_user_id, "delegate")
        .map(|p| p.display_name)
        .unwrap_or_else(|| "Your delegate".to_string());

    let mailer = state.mailer.clone();
    let reason = request.reason.clone();
    let request_id = request.id.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer
            .send_recovery_request_email(
                &owner.email,
                &owner.display_name,
                &delegate_name,
                grace_period_days,
                &reason,
            )
            .await
        {
            warn!(request_id = %request_id, error = %e, "Failed to send owner notification");
        }
    });
}

/// Email the delegate with the owner's decision.
fn notify_delegate_of_decision(state: &AppState, request: &StoredRecoveryRequest, approved: bool) {
    let Some(delegate) = profile_for(state, &request.delegate_user_id, "delegate") else {
        return;
    };
    let owner_name = profile_for(state, &request.owner_user_id, "owner")
        .map(|p| p.display_name)
        .unwrap_or_else(|| "The locker owner".to_string());

    let mailer = state.mailer.clone();
    let request_id = request.id.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer
            .send_recovery_decision_email(
                &delegate.email,
                &delegate.display_name,
                &owner_name,
                approved,
            )
            .await
        {
            warn!(request_id = %request_id, error = %e, "Failed to send delegate notification");
        }
    });
}
