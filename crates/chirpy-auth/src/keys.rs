use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::AuthError;

/// Random bytes behind each refresh token (256 bits).
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate an opaque refresh token: 32 bytes from the OS RNG as lowercase hex.
pub fn generate_refresh_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Random(e.to_string()))?;
    Ok(hex::encode(bytes))
}
