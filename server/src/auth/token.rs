//! HS256 bearer tokens.

use crate::types::{User, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Token failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// `exp` is in the past
    #[error("Token expired")]
    Expired,

    /// Bad signature, malformed token, wrong algorithm...
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token is valid but names a user that no longer exists
    #[error("Unknown token subject")]
    UnknownSubject,

    /// Could not sign
    #[error("Failed to issue token: {0}")]
    Encoding(String),
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    /// Admin flag at issue time
    pub admin: bool,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

impl Claims {
    /// The user this token was issued to
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }
}

/// Signs and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Issuer for `secret` whose tokens live for `ttl`
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    /// Sign a token for `user`, valid from now for the configured ttl.
    ///
    /// Expiry is checked against wall time by [`TokenIssuer::verify`], so
    /// tokens are stamped with wall time too.
    ///
    /// # Errors
    ///
    /// [`TokenError::Encoding`] if signing fails or the expiry overflows.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: *user.id.as_uuid(),
            admin: user.is_admin,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Check signature and expiry.
    ///
    /// # Errors
    ///
    /// [`TokenError::Expired`] or [`TokenError::Invalid`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}
