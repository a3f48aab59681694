use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, ErrorKind},
    utils::{Claims, generate_token, hash_password, is_valid_email, verify_password},
};

use super::model::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserProfile,
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if !is_valid_email(&req.email) {
        return Err(ErrorKind::ValidationEmailInvalid.into());
    }
    if req.password.chars().count() < 6 {
        return Err(ErrorKind::ValidationPasswordTooShort.into());
    }

    // Nunca revelar si falló el correo o la contraseña
    let user = User::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or(ErrorKind::AuthInvalidCredentials)?;

    let ok = verify_password(&req.password, &user.password_hash).map_err(|e| {
        tracing::error!("Password verification failed: {}", e);
        AppError::new(ErrorKind::ServerInternalError)
    })?;
    if !ok {
        return Err(ErrorKind::AuthInvalidCredentials.into());
    }

    let token = generate_token(user.id, &user.email, &state.config)
        .map_err(|_| ErrorKind::ServerInternalError)?;

    Ok(Json(AuthResponse {
        access_token: token,
        user: user.identity(),
    }))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if !is_valid_email(&req.email) {
        return Err(ErrorKind::ValidationEmailInvalid.into());
    }
    if req.password.chars().count() < 6 {
        return Err(ErrorKind::ValidationPasswordTooShort.into());
    }
    if req.name.trim().chars().count() < 2 {
        return Err(ErrorKind::ValidationNameTooShort.into());
    }

    if User::find_by_email(&state.pool, &req.email).await?.is_some() {
        return Err(ErrorKind::AuthEmailAlreadyRegistered.into());
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        AppError::new(ErrorKind::ServerInternalError)
    })?;

    let user = User::create(&state.pool, &req.email, &password_hash, req.name.trim()).await?;

    let token = generate_token(user.id, &user.email, &state.config)
        .map_err(|_| ErrorKind::ServerInternalError)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token: token,
            user: user.identity(),
        }),
    ))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = User::find_profile(&state.pool, claims.sub)
        .await?
        .ok_or(ErrorKind::ProfileUserNotFound)?;
    Ok(Json(profile))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    if let Some(name) = &req.name {
        if name.trim().chars().count() < 2 {
            return Err(ErrorKind::ProfileNameTooShort.into());
        }
    }

    let profile = User::update_profile(&state.pool, claims.sub, &req)
        .await?
        .ok_or(ErrorKind::ProfileUserNotFound)?;
    Ok(Json(profile))
}
