use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use chirpy_db::{Database, StoreError};
use chirpy_types::api::Claims;
use chirpy_types::models::{RefreshToken, User};

use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;
use crate::keys::generate_refresh_token;
use crate::password::verify_password;

/// `iss` claim on every access token.
pub const ISSUER: &str = "chirpy";

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::seconds(3600),
            refresh_ttl: Duration::days(60),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: RefreshToken,
}

/// Issues and checks access tokens (stateless) and refresh tokens (stored
/// in the database, one per user).
pub struct SessionManager {
    db: Arc<Database>,
    secret: String,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, secret: impl Into<String>, config: SessionConfig) -> Self {
        Self::with_clock(db, secret, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Arc<Database>,
        secret: impl Into<String>,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            secret: secret.into(),
            config,
            clock,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // -- Access tokens --

    pub fn issue_access(&self, user_id: i64) -> Result<String, AuthError> {
        let now = self.clock.now();
        let claims = Claims {
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl).timestamp(),
            sub: user_id.to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Returns the user id carried by a valid, unexpired access token.
    pub fn verify_access(&self, token: &str) -> Result<i64, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked against our own clock below, without leeway
        validation.validate_exp = false;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            warn!("Rejected access token: {}", e);
            AuthError::Unauthorized
        })?;

        let claims = token_data.claims;
        if self.clock.now().timestamp() >= claims.exp {
            warn!("Rejected expired access token for subject {}", claims.sub);
            return Err(AuthError::Unauthorized);
        }

        claims.sub.parse().map_err(|_| AuthError::Unauthorized)
    }

    // -- Refresh tokens --

    /// Create and store a refresh token for `user_id`, superseding any earlier one.
    pub fn issue_refresh(&self, user_id: i64) -> Result<RefreshToken, AuthError> {
        let token = RefreshToken {
            user_id,
            token: generate_refresh_token()?,
            expires_at: self.clock.now() + self.config.refresh_ttl,
        };
        Ok(self.db.save_refresh_token(token)?)
    }

    /// Exchange a refresh token for a new access token. The refresh token
    /// itself is left untouched, expired or not.
    pub fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let stored = match self.db.get_refresh_token(token) {
            Ok(stored) => stored,
            Err(StoreError::NotFound) => return Err(AuthError::Unauthorized),
            Err(e) => return Err(e.into()),
        };

        if stored.is_expired(self.clock.now()) {
            warn!("Rejected expired refresh token for user {}", stored.user_id);
            return Err(AuthError::Unauthorized);
        }

        self.issue_access(stored.user_id)
    }

    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        if !self.db.delete_refresh_token(token)? {
            return Err(AuthError::NotFound);
        }
        info!("Revoked refresh token");
        Ok(())
    }

    // -- Login --

    /// Check credentials and start a new session, replacing the user's previous one.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.db.get_user_by_email(email).map_err(|e| match e {
            StoreError::NotFound => AuthError::NotFound,
            e => e.into(),
        })?;

        if !verify_password(&user.password_hash, password) {
            warn!("Failed login for user {}", user.id);
            return Err(AuthError::Unauthorized);
        }

        let access_token = self.issue_access(user.id)?;
        let refresh_token = self.issue_refresh(user.id)?;

        info!("User {} logged in", user.id);
        Ok(Session {
            user,
            access_token,
            refresh_token,
        })
    }
}
