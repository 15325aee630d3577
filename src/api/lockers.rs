// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Locker setup and views.
//!
//! The vault key never reaches this service in plaintext: the client
//! generates it, wraps it under the owner's master password (and optionally
//! under a delegate recovery code for escrow), and submits only the blobs.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    models::{CreateLockerRequest, LockerView, UpdateLockerSettingsRequest, UpsertProfileRequest},
    state::AppState,
    storage::{
        AccessEnforcer, AuditEventType, LockerRepository, ProfileRepository, StoredLocker,
        StoredProfile,
    },
};

/// Default grace period when the owner does not choose one.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 14;

/// Accepted grace period range in days.
const GRACE_PERIOD_RANGE: std::ops::RangeInclusive<i64> = 1..=365;

#[utoipa::path(
    post,
    path = "/v1/lockers",
    request_body = CreateLockerRequest,
    tag = "Lockers",
    responses(
        (status = 200, body = LockerView),
        (status = 409, description = "Caller already has a locker")
    )
)]
pub async fn create_locker(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateLockerRequest>,
) -> Result<Json<LockerView>, ApiError> {
    let grace_days = request
        .recovery_grace_period_days
        .unwrap_or(DEFAULT_GRACE_PERIOD_DAYS);
    if !GRACE_PERIOD_RANGE.contains(&grace_days) {
        return Err(ApiError::bad_request(
            "recovery_grace_period_days must be between 1 and 365",
        ));
    }

    // Reject blobs that could never unwrap before persisting them; the
    // server cannot decrypt, but it can check the envelope framing.
    crate::crypto::validate_wrap_framing(&request.encrypted_vault_key)?;
    if let Some(ref wrap) = request.delegate_key_wrap {
        crate::crypto::validate_wrap_framing(wrap)?;
    }

    let now = Utc::now();
    let locker = StoredLocker {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        delegate_user_id: request.delegate_user_id,
        recovery_status: crate::storage::RecoveryStatus::None,
        recovery_requested_at: None,
        recovery_grace_period_days: grace_days,
        encrypted_vault_key: Some(request.encrypted_vault_key),
        delegate_key_wrap: request.delegate_key_wrap,
        created_at: now,
        updated_at: now,
    };

    let repo = LockerRepository::new(&state.storage);
    repo.create(&locker).map_err(|e| match e {
        crate::storage::StorageError::AlreadyExists(_) => {
            ApiError::invalid_state("You already have a Legacy Locker")
        }
        other => other.into(),
    })?;

    audit_log!(
        &state.storage,
        AuditEventType::LockerCreated,
        user,
        "locker",
        &locker.id
    );

    Ok(Json(LockerView::for_owner(&locker)))
}

#[utoipa::path(
    get,
    path = "/v1/lockers/me",
    tag = "Lockers",
    responses((status = 200, body = LockerView), (status = 404))
)]
pub async fn get_my_locker(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<LockerView>, ApiError> {
    let repo = LockerRepository::new(&state.storage);
    let locker = repo
        .get_by_owner(&user.user_id)
        .map_err(|_| ApiError::not_found("You do not have a Legacy Locker yet"))?;

    Ok(Json(LockerView::for_owner(&locker)))
}

#[utoipa::path(
    get,
    path = "/v1/lockers/{locker_id}",
    params(("locker_id" = String, Path, description = "Locker ID")),
    tag = "Lockers",
    responses((status = 200, body = LockerView), (status = 403), (status = 404))
)]
pub async fn get_locker(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(locker_id): Path<String>,
) -> Result<Json<LockerView>, ApiError> {
    let repo = LockerRepository::new(&state.storage);
    let locker = repo
        .get(&locker_id)
        .map_err(|_| ApiError::not_found("Locker not found"))?;

    if locker.verify_owner(&user).is_ok() {
        return Ok(Json(LockerView::for_owner(&locker)));
    }

    if locker.verify_delegate(&user).is_ok() {
        return Ok(Json(LockerView::for_delegate(&locker)));
    }

    audit_log!(
        &state.storage,
        AuditEventType::PermissionDenied,
        user,
        "locker",
        &locker_id
    );
    Err(ApiError::authorization(
        "You are neither the owner nor the delegate of this locker",
    ))
}

#[utoipa::path(
    put,
    path = "/v1/lockers/me/settings",
    request_body = UpdateLockerSettingsRequest,
    tag = "Lockers",
    responses(
        (status = 200, body = LockerView),
        (status = 409, description = "A recovery is in flight")
    )
)]
pub async fn update_locker_settings(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdateLockerSettingsRequest>,
) -> Result<Json<LockerView>, ApiError> {
    let repo = LockerRepository::new(&state.storage);
    let mut locker = repo
        .get_by_owner(&user.user_id)
        .map_err(|_| ApiError::not_found("You do not have a Legacy Locker yet"))?;

    // Changing the delegate or the window mid-recovery would let an owner
    // undercut an in-flight request.
    if locker.recovery_status.recovery_in_flight() {
        return Err(ApiError::invalid_state(format!(
            "Locker settings cannot change while recovery is '{}'",
            locker.recovery_status.as_str()
        )));
    }

    if let Some(days) = request.recovery_grace_period_days {
        if !GRACE_PERIOD_RANGE.contains(&days) {
            return Err(ApiError::bad_request(
                "recovery_grace_period_days must be between 1 and 365",
            ));
        }
        locker.recovery_grace_period_days = days;
    }

    locker.delegate_user_id = request.delegate_user_id;
    if let Some(wrap) = request.delegate_key_wrap {
        crate::crypto::validate_wrap_framing(&wrap)?;
        locker.delegate_key_wrap = Some(wrap);
    }
    locker.updated_at = Utc::now();

    repo.update(&locker)?;

    audit_log!(
        &state.storage,
        AuditEventType::LockerSettingsUpdated,
        user,
        "locker",
        &locker.id
    );

    Ok(Json(LockerView::for_owner(&locker)))
}

#[utoipa::path(
    put,
    path = "/v1/profile",
    request_body = UpsertProfileRequest,
    tag = "Profiles",
    responses((status = 200))
)]
pub async fn upsert_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpsertProfileRequest>,
) -> Result<(), ApiError> {
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("email address is not valid"));
    }
    if request.display_name.trim().is_empty() {
        return Err(ApiError::bad_request("display_name is required"));
    }

    let repo = ProfileRepository::new(&state.storage);
    repo.upsert(&StoredProfile {
        user_id: user.user_id,
        email: request.email,
        display_name: request.display_name,
        updated_at: Utc::now(),
    })?;

    Ok(())
}
