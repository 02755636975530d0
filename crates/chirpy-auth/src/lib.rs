//! Chirpy authentication
//!
//! Two credentials protect every mutation:
//! - access tokens: HS256 JWTs, one hour by default, verified without storage
//! - refresh tokens: 32 random bytes as hex, 60 days by default, stored one per user
//!
//! Passwords are hashed with Argon2id and never leave this crate in plaintext.

pub mod clock;
pub mod error;
pub mod keys;
pub mod password;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use error::AuthError;
pub use session::{Session, SessionConfig, SessionManager};
