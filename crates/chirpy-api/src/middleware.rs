use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::auth::AppState;
use crate::error::ApiError;

/// Id of the user behind a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Pull `<scheme> <value>` out of the Authorization header.
pub fn authorization<'a>(headers: &'a HeaderMap, scheme: &str) -> Result<&'a str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(scheme))
        .and_then(|v| v.strip_prefix(' '))
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    authorization(headers, "Bearer")
}

/// Compare a presented API key with the configured one. Both sides are hashed
/// first so the comparison always runs over 32 bytes.
pub fn api_key_matches(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    constant_time_eq(&presented, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

/// Verify the access token from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let user_id = state.sessions.verify_access(token)?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
