use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, ErrorKind},
    utils::{Claims, is_valid_email},
};

use super::model::{
    CreateGroupRequest, Group, Invitation, InvitationInfo, MemberEntry, SendInvitationRequest,
    UpdateRulesRequest,
};

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    if req.name.trim().chars().count() < 2 {
        return Err(ErrorKind::GroupNameTooShort.into());
    }

    let group = Group::create(&state.pool, claims.sub, req.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[axum::debug_handler]
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Group>>, AppError> {
    let groups = Group::list_mine(&state.pool, claims.sub).await?;
    Ok(Json(groups))
}

#[axum::debug_handler]
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<InvitationInfo>>, AppError> {
    let invitations = Invitation::list_for_email(&state.pool, &claims.email).await?;
    Ok(Json(invitations))
}

#[axum::debug_handler]
pub async fn send_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    if !is_valid_email(&req.invitee_email) {
        return Err(ErrorKind::ValidationEmailInvalid.into());
    }

    let invitation =
        Invitation::send(&state.pool, claims.sub, req.group_id, &req.invitee_email).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

#[axum::debug_handler]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    Invitation::accept(&state.pool, id, claims.sub, &claims.email).await?;
    Ok(Json(json!({ "ok": true })))
}

#[axum::debug_handler]
pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MemberEntry>>, AppError> {
    let members = Group::list_members(&state.pool, id, claims.sub).await?;
    Ok(Json(members))
}

#[axum::debug_handler]
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    Group::delete(&state.pool, id, claims.sub).await?;
    Ok(Json(json!({ "ok": true })))
}

#[axum::debug_handler]
pub async fn get_rules(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rules = Group::rules(&state.pool, id, claims.sub).await?;
    Ok(Json(json!({ "rules": rules })))
}

#[axum::debug_handler]
pub async fn update_rules(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRulesRequest>,
) -> Result<Json<Group>, AppError> {
    let group = Group::update_rules(&state.pool, id, claims.sub, &req.rules).await?;
    Ok(Json(group))
}
