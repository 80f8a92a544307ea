//! JWT claim payloads for the two token kinds (RFC 7519).
//!
//! Access tokens carry denormalized profile fields so protected handlers
//! can identify the caller without a lookup. Refresh tokens carry only the
//! account id, minimizing the blast radius if one leaks.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AuthError};

/// Claims embedded in a short-lived access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (account id, ObjectId hex)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub fullname: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(
        user_id: ObjectId,
        email: String,
        username: String,
        fullname: String,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_hex(),
            email,
            username,
            fullname,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract the account id from the claims.
    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }
}

/// Claims embedded in a long-lived refresh token: account id only.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(user_id: ObjectId, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_hex(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }
}
