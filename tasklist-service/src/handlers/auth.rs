use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use axum::response::{IntoResponse, Response};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::auth::LoginRequest;
use crate::dtos::ErrorResponse;
use crate::startup::AppState;

const INVALID_REQUEST_MESSAGE: &str = "Invalid request";

fn invalid_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: INVALID_REQUEST_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

/// Exchange a username and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Ok(Json(req)) = body else {
        tracing::warn!("Login body rejected");
        return Ok(invalid_request());
    };

    if req.validate().is_err() {
        tracing::warn!("Login request failed validation");
        return Ok(invalid_request());
    }

    let res = state.auth.login(req).await?;
    Ok((StatusCode::OK, Json(res)).into_response())
}
