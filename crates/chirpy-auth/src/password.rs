use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};

use crate::error::AuthError;

/// Well-formed Argon2id digest with the default cost parameters. It matches no
/// password; verifying against it costs the same as a real check.
const DUMMY_DIGEST: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$Y2hpcnB5LWR1bW15LXNsdA$a80sLduU/Ogw+HQs612lScx1uMJl2M5C3bSjwAx2C80";

/// Hash a password with Argon2id and a fresh salt. Returns a PHC string.
pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check `plaintext` against a stored digest.
///
/// A digest that doesn't parse still pays for one Argon2 verification (against
/// a throwaway hash) so it fails in about the same time as a wrong password.
pub fn verify_password(digest: &str, plaintext: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            if let Ok(dummy) = PasswordHash::new(DUMMY_DIGEST) {
                let _ = Argon2::default().verify_password(plaintext.as_bytes(), &dummy);
            }
            false
        }
    }
}
