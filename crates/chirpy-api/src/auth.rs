use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use axum::{Json, extract::State, http::{HeaderMap, StatusCode}};
use axum_extra::extract::WithRejection;

use chirpy_auth::{SessionConfig, SessionManager};
use chirpy_db::Database;
use chirpy_types::api::{LoginResponse, TokenResponse, UserRequest};

use crate::error::{ApiError, not_found_as};
use crate::middleware::bearer_token;
use crate::run_blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: SessionManager,
    pub polka_key: String,
    /// Requests served under `/app/` since start or the last reset.
    pub file_hits: AtomicU64,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, jwt_secret: &str, polka_key: &str, config: SessionConfig) -> Self {
        Self {
            sessions: SessionManager::new(db.clone(), jwt_secret, config),
            db,
            polka_key: polka_key.to_string(),
            file_hits: AtomicU64::new(0),
        }
    }
}

/// POST /api/login — check credentials, return both tokens.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<UserRequest>, ApiError>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = run_blocking(&state, move |state| {
        state
            .sessions
            .login(&req.email, &req.password)
            .map_err(|e| not_found_as("user")(e.into()))
    })
    .await?;

    Ok(Json(LoginResponse {
        user: session.user.into(),
        token: session.access_token,
        refresh_token: session.refresh_token.token,
    }))
}

/// POST /api/refresh — trade the bearer refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = bearer_token(&headers)?.to_string();

    let access = run_blocking(&state, move |state| Ok(state.sessions.refresh(&token)?)).await?;

    Ok(Json(TokenResponse { token: access }))
}

/// POST /api/revoke — delete the bearer refresh token.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?.to_string();

    run_blocking(&state, move |state| {
        state
            .sessions
            .revoke(&token)
            .map_err(|e| not_found_as("refresh token")(e.into()))
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
