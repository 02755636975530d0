use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;

use chirpy_auth::password::hash_password;
use chirpy_types::api::{UserRequest, UserResponse};
use chirpy_types::models::ValidationError;

use crate::auth::AppState;
use crate::error::{ApiError, not_found_as};
use crate::middleware::AuthUser;
use crate::run_blocking;

fn require_password(req: &UserRequest) -> Result<(), ApiError> {
    if req.password.is_empty() {
        return Err(ApiError::Validation(ValidationError::EmptyPassword.to_string()));
    }
    Ok(())
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<UserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    require_password(&req)?;

    let user = run_blocking(&state, move |state| {
        let password_hash = hash_password(&req.password)?;
        Ok(state.db.create_user(&req.email, &password_hash)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// PUT /api/users — the authenticated user changes their own email and password.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Json(req), _): WithRejection<Json<UserRequest>, ApiError>,
) -> Result<Json<UserResponse>, ApiError> {
    require_password(&req)?;

    let user = run_blocking(&state, move |state| {
        let password_hash = hash_password(&req.password)?;
        state
            .db
            .update_credentials(user_id, &req.email, &password_hash)
            .map_err(|e| not_found_as("user")(e.into()))
    })
    .await?;

    Ok(Json(UserResponse::from(user)))
}
