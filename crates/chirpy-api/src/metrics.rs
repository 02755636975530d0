use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Html, Response},
};

use crate::auth::AppState;

/// Count every request that reaches the static file service.
pub async fn count_file_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.file_hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

/// GET /admin/metrics
pub async fn metrics_page(State(state): State<AppState>) -> Html<String> {
    let hits = state.file_hits.load(Ordering::Relaxed);
    Html(format!(
        "<html><body><h1>Welcome, Chirpy Admin</h1><p>Chirpy has been visited {} times!</p></body></html>",
        hits
    ))
}

/// POST /api/reset
pub async fn reset_metrics(State(state): State<AppState>) -> &'static str {
    state.file_hits.store(0, Ordering::Relaxed);
    "OK"
}

/// GET /api/healthz
pub async fn health() -> &'static str {
    "OK"
}
