use axum::{Json, extract::State, http::{HeaderMap, StatusCode}};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use chirpy_types::events::{WebhookEvent, WebhookPayload};

use crate::auth::AppState;
use crate::error::{ApiError, not_found_as};
use crate::middleware::{api_key_matches, authorization};
use crate::run_blocking;

/// POST /api/polka/webhooks — payment provider callbacks, authenticated with `ApiKey <key>`.
pub async fn polka_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(Json(payload), _): WithRejection<Json<WebhookPayload>, ApiError>,
) -> Result<StatusCode, ApiError> {
    let key = authorization(&headers, "ApiKey")?;
    if !api_key_matches(key, &state.polka_key) {
        warn!("Webhook called with a wrong API key");
        return Err(ApiError::Unauthorized);
    }

    let event = WebhookEvent::try_from(payload).map_err(|e| ApiError::Validation(e.to_string()))?;
    let (user_id, is_chirpy_red) = match event {
        WebhookEvent::UserUpgraded { user_id } => (user_id, true),
        WebhookEvent::UserDowngraded { user_id, .. } => (user_id, false),
        WebhookEvent::Ignored => return Ok(StatusCode::NO_CONTENT),
    };

    run_blocking(&state, move |state| {
        state
            .db
            .set_chirpy_red(user_id, is_chirpy_red)
            .map_err(|e| not_found_as("user")(e.into()))
    })
    .await?;

    info!("User {} Chirpy Red set to {}", user_id, is_chirpy_red);
    Ok(StatusCode::NO_CONTENT)
}
