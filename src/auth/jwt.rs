//! Token issuance and verification.
//!
//! Both token kinds are HS256 JWTs signed with their own secret and
//! lifetime from `JwtSettings`. Issuance is a pure function of
//! (identity, current time, secret, lifetime); verification rejects any
//! token not signed with the exact expected secret and any token past its
//! expiry even when the signature is valid.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::users::User;

/// Why a token failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    /// Not a validly-signed artifact for this service
    Malformed,
    /// Signature valid, lifetime elapsed
    Expired,
    /// Wrong secret or tampered payload
    SignatureMismatch,
}

impl std::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationError::Malformed => write!(f, "malformed token"),
            VerificationError::Expired => write!(f, "expired token"),
            VerificationError::SignatureMismatch => write!(f, "token signature mismatch"),
        }
    }
}

impl std::error::Error for VerificationError {}

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Expired => AppError::Auth(AuthError::TokenExpired),
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    }
}

/// Issue a short-lived access token embedding the denormalized identity.
pub fn issue_access_token(user: &User, config: &JwtSettings) -> Result<String, AppError> {
    let claims = AccessClaims::new(
        user.id,
        user.email.clone(),
        user.username.clone(),
        user.fullname.clone(),
        config.access_token_expiry,
        config.issuer.clone(),
    );
    sign(&claims, &config.access_token_secret)
}

/// Issue a long-lived refresh token embedding the account id only.
pub fn issue_refresh_token(user_id: ObjectId, config: &JwtSettings) -> Result<String, AppError> {
    let claims = RefreshClaims::new(user_id, config.refresh_token_expiry, config.issuer.clone());
    sign(&claims, &config.refresh_token_secret)
}

/// Verify an access token and recover its claims.
pub fn verify_access_token(
    token: &str,
    config: &JwtSettings,
) -> Result<AccessClaims, VerificationError> {
    verify(token, &config.access_token_secret, &config.issuer)
}

/// Verify a refresh token and recover its claims.
pub fn verify_refresh_token(
    token: &str,
    config: &JwtSettings,
) -> Result<RefreshClaims, VerificationError> {
    verify(token, &config.refresh_token_secret, &config.issuer)
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))
}

fn verify<C: DeserializeOwned>(
    token: &str,
    secret: &str,
    issuer: &str,
) -> Result<C, VerificationError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);

    decode::<C>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerificationError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                VerificationError::SignatureMismatch
            }
            _ => VerificationError::Malformed,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config() -> JwtSettings {
        JwtSettings {
            access_token_secret: "access-secret-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_secret: "refresh-secret-at-least-32-characters-lo".to_string(),
            refresh_token_expiry: 864000,
            issuer: "videotube".to_string(),
        }
    }

    fn test_user() -> User {
        User {
            id: ObjectId::new(),
            username: "janed".to_string(),
            email: "jane@x.com".to_string(),
            fullname: "Jane Doe".to_string(),
            password_hash: "$2b$12$fakehash".to_string(),
            avatar: "https://media.test/avatar.png".to_string(),
            cover_image: None,
            refresh_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trip_recovers_identity() {
        let config = test_config();
        let user = test_user();

        let token = issue_access_token(&user, &config).expect("failed to issue token");
        let claims = verify_access_token(&token, &config).expect("failed to verify token");

        assert_eq!(claims.sub, user.id.to_hex());
        assert_eq!(claims.email, "jane@x.com");
        assert_eq!(claims.username, "janed");
        assert_eq!(claims.fullname, "Jane Doe");
        assert_eq!(claims.iss, "videotube");
    }

    #[test]
    fn refresh_token_round_trip_recovers_id() {
        let config = test_config();
        let id = ObjectId::new();

        let token = issue_refresh_token(id, &config).expect("failed to issue token");
        let claims = verify_refresh_token(&token, &config).expect("failed to verify token");

        assert_eq!(claims.user_id().unwrap(), id);
    }

    #[test]
    fn tampered_token_fails_signature_check() {
        let config = test_config();
        let token = issue_access_token(&test_user(), &config).expect("failed to issue token");

        // Flip the last signature character
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(
            verify_access_token(&tampered, &config).unwrap_err(),
            VerificationError::SignatureMismatch
        );
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let config = test_config();
        let token = issue_access_token(&test_user(), &config).expect("failed to issue token");

        let mut other = test_config();
        other.access_token_secret = "a-completely-different-signing-secret!!".to_string();

        assert_eq!(
            verify_access_token(&token, &other).unwrap_err(),
            VerificationError::SignatureMismatch
        );
    }

    #[test]
    fn access_secret_does_not_verify_refresh_tokens() {
        let config = test_config();
        let token = issue_refresh_token(ObjectId::new(), &config).expect("failed to issue token");

        // Verifying against the access secret must fail
        let result: Result<RefreshClaims, _> =
            super::verify(&token, &config.access_token_secret, &config.issuer);
        assert_eq!(result.unwrap_err(), VerificationError::SignatureMismatch);
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut config = test_config();
        // Beyond the default 60s decode leeway
        config.access_token_expiry = -120;

        let token = issue_access_token(&test_user(), &config).expect("failed to issue token");
        assert_eq!(
            verify_access_token(&token, &config).unwrap_err(),
            VerificationError::Expired
        );
    }

    #[test]
    fn garbage_token_is_malformed() {
        let config = test_config();
        assert_eq!(
            verify_access_token("not.a.jwt", &config).unwrap_err(),
            VerificationError::Malformed
        );
        assert_eq!(
            verify_access_token("", &config).unwrap_err(),
            VerificationError::Malformed
        );
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let config = test_config();
        let token = issue_access_token(&test_user(), &config).expect("failed to issue token");

        let mut other = test_config();
        other.issuer = "someone-else".to_string();

        assert!(verify_access_token(&token, &other).is_err());
    }

    #[test]
    fn expired_maps_to_expired_app_error() {
        let err: AppError = VerificationError::Expired.into();
        assert!(matches!(err, AppError::Auth(AuthError::TokenExpired)));
    }
}
