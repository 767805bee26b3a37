use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    invites::CreateInviteResult,
    models::invite::{CreateInviteRequest, Invite},
    AppState,
};

/// Fetch an invite and make sure it belongs to the caller's organization.
async fn org_invite(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Invite> {
    let invite = state.invites.get_invite(id).await?;
    if invite.organization_id != auth.org_id {
        return Err(AppError::NotFound("Invite not found".into()));
    }
    Ok(invite)
}

pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Invite>>> {
    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }

    Ok(Json(state.invites.list_org_invites(auth.org_id).await?))
}

/// Validation and precondition failures come back as 4xx with a `code`.
/// Once the row is written the response is 200 and `success` says whether
/// the email went out.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateInviteRequest>,
) -> Result<Json<CreateInviteResult>> {
    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }

    let outcome = state
        .invites
        .create_invite(Some(auth.id), &req.email, &req.role, auth.org_id)
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn resend(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CreateInviteResult>> {
    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }
    org_invite(&state, &auth, id).await?;

    let outcome = state.invites.resend_invite_email(Some(auth.id), id).await?;
    Ok(Json(outcome.into()))
}

pub async fn revoke(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }
    org_invite(&state, &auth, id).await?;

    let ok = state.invites.revoke_invite(id).await;
    Ok(Json(serde_json::json!({ "ok": ok })))
}

pub async fn test_email(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>> {
    if !auth.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    state.mailer.test_configuration().await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
