use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

const MAX_ERROR_BODY: usize = 64 * 1024;

/// Stamps the request path into JSON error bodies (errors are built before
/// the URI is known) and logs server errors with their payload.
pub async fn error_context(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    let status = response.status();

    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    if status.is_server_error() {
        error!(
            "Server error - Status: {}, Path: {}, Body: {}",
            status,
            path,
            String::from_utf8_lossy(&bytes)
        );
    }

    let bytes = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut value) if value.get("statusCode").is_some() => {
            value["path"] = serde_json::Value::String(path);
            serde_json::to_vec(&value)
                .map(axum::body::Bytes::from)
                .unwrap_or(bytes)
        }
        _ => bytes,
    };

    // el body cambió de tamaño, hay que recalcular content-length
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
