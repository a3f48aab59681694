use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState,
    error::{AppError, ErrorKind},
    utils::verify_token,
};

/// Bearer-token guard for the protected router. Verifies the JWT and makes
/// the caller's `Claims` available to handlers as a request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(AppError::new(ErrorKind::AuthUnauthenticated));
    };

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        AppError::new(ErrorKind::AuthUnauthenticated)
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
