pub mod auth;
pub mod chirps;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod users;
pub mod webhooks;

use std::path::Path;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;
use tracing::error;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

/// Run blocking store/session work off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
}

/// All routes. `file_root` is served under `/app/`.
pub fn router(state: AppState, file_root: &Path) -> Router {
    let public_routes = Router::new()
        .route("/api/healthz", get(metrics::health))
        .route("/api/users", post(users::create_user))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route("/api/chirps", get(chirps::list_chirps))
        .route("/api/chirps/{chirp_id}", get(chirps::get_chirp))
        .route("/api/polka/webhooks", post(webhooks::polka_webhook))
        .route("/api/reset", post(metrics::reset_metrics))
        .route("/admin/metrics", get(metrics::metrics_page));

    let protected_routes = Router::new()
        .route("/api/users", put(users::update_user))
        .route("/api/chirps", post(chirps::create_chirp))
        .route("/api/chirps/{chirp_id}", delete(chirps::delete_chirp))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    let file_routes = Router::new()
        .nest_service("/app", ServeDir::new(file_root))
        .layer(axum_middleware::from_fn_with_state(state.clone(), metrics::count_file_hits));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(file_routes)
        .with_state(state)
}
