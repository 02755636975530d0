use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{info, warn};

use chirpy_types::api::CreateChirpRequest;
use chirpy_types::models::Chirp;

use crate::auth::AppState;
use crate::error::{ApiError, not_found_as};
use crate::middleware::AuthUser;
use crate::run_blocking;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Deserialize)]
pub struct ChirpQuery {
    pub author_id: Option<i64>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// GET /api/chirps?author_id=&sort=
pub async fn list_chirps(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ChirpQuery>, ApiError>,
) -> Result<Json<Vec<Chirp>>, ApiError> {
    let author_id = query.author_id;
    let mut chirps = run_blocking(&state, move |state| Ok(state.db.get_chirps(author_id)?)).await?;

    chirps.sort_by_key(|c| c.id);
    if query.sort == SortOrder::Desc {
        chirps.reverse();
    }

    Ok(Json(chirps))
}

/// GET /api/chirps/{chirp_id}
pub async fn get_chirp(
    State(state): State<AppState>,
    WithRejection(Path(chirp_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Chirp>, ApiError> {
    let chirp = run_blocking(&state, move |state| {
        state.db.get_chirp(chirp_id).map_err(|e| not_found_as("chirp")(e.into()))
    })
    .await?;

    Ok(Json(chirp))
}

/// POST /api/chirps
pub async fn create_chirp(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateChirpRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let chirp = run_blocking(&state, move |state| Ok(state.db.create_chirp(user_id, &req.body)?)).await?;

    Ok((StatusCode::CREATED, Json(chirp)))
}

/// DELETE /api/chirps/{chirp_id} — only the author may delete.
pub async fn delete_chirp(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Path(chirp_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    run_blocking(&state, move |state| {
        let chirp = state.db.get_chirp(chirp_id).map_err(|e| not_found_as("chirp")(e.into()))?;
        if chirp.user_id != user_id {
            warn!("User {} tried to delete chirp {} owned by {}", user_id, chirp.id, chirp.user_id);
            return Err(ApiError::Forbidden);
        }
        state.db.delete_chirp(chirp.id)?;
        Ok(())
    })
    .await?;

    info!("Deleted chirp {}", chirp_id);
    Ok(StatusCode::NO_CONTENT)
}
