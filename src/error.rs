//! Unified error handling for the account backend.
//!
//! Domain-specific error types are kept separate and folded into one
//! `AppError` for control flow. `AppError` implements actix-web's
//! `ResponseError`, so every handler failure becomes a structured JSON
//! response with a stable `success: false` shape and a status code
//! matching the taxonomy: validation -> 400, conflict -> 409,
//! not-found -> 404, unauthorized -> 401, everything internal -> 500.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    MissingUpload(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::MissingUpload(field) => write!(f, "{} file is required", field),
        }
    }
}

impl StdError for ValidationError {}

/// Credential store errors
#[derive(Debug)]
pub enum StoreError {
    /// Unique index violation on username or email. The message must not
    /// reveal which of the two fields collided.
    Duplicate,
    NotFound(String),
    Query(String),
    Connection(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate => write!(f, "account already exists"),
            StoreError::NotFound(msg) => write!(f, "not found: {}", msg),
            StoreError::Query(msg) => write!(f, "store query error: {}", msg),
            StoreError::Connection(msg) => write!(f, "store connection error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

/// Authentication and session errors
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    MissingToken,
    /// Refresh token does not match the stored one: superseded by a newer
    /// login/refresh, or cleared by logout.
    RefreshTokenMismatch,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid credentials"),
            AuthError::TokenExpired => write!(f, "token has expired"),
            AuthError::TokenInvalid => write!(f, "invalid token"),
            AuthError::MissingToken => write!(f, "missing authentication token"),
            AuthError::RefreshTokenMismatch => {
                write!(f, "refresh token is expired or already used")
            }
        }
    }
}

impl StdError for AuthError {}

/// Media host errors
#[derive(Debug)]
pub enum MediaError {
    UploadFailed(String),
    LocalFile(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::UploadFailed(msg) => write!(f, "media upload failed: {}", msg),
            MediaError::LocalFile(msg) => write!(f, "local file error: {}", msg),
        }
    }
}

impl StdError for MediaError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Store(StoreError),
    Auth(AuthError),
    Media(MediaError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Media(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Media(err)
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match err.kind.as_ref() {
            // E11000: unique index violation on username or email.
            // Inserts report it as a write error, findAndModify as a
            // top-level command error.
            ErrorKind::Write(WriteFailure::WriteError(write_err))
                if write_err.code == 11000 =>
            {
                AppError::Store(StoreError::Duplicate)
            }
            ErrorKind::Command(command_err) if command_err.code == 11000 => {
                AppError::Store(StoreError::Duplicate)
            }
            ErrorKind::ServerSelection { .. } => {
                AppError::Store(StoreError::Connection(err.to_string()))
            }
            _ => AppError::Store(StoreError::Query(err.to_string())),
        }
    }
}

/// Stable JSON error body returned for every failed request
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Error code for client-side handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP status code
    pub status: u16,
    /// Unique error ID for log correlation
    pub error_id: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            success: false,
            code,
            message,
            status,
            error_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// Map the error to (status, code, user-visible message).
    ///
    /// Messages must not leak which unique field collided nor internal
    /// store/hasher details.
    fn response_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Store(e) => match e {
                StoreError::Duplicate => (
                    StatusCode::CONFLICT,
                    "ALREADY_EXISTS",
                    "User already exists".to_string(),
                ),
                StoreError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", "User not found".to_string())
                }
                StoreError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                ),
                StoreError::Query(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Internal server error".to_string(),
                ),
            },

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Invalid credentials".to_string(),
                ),
                AuthError::TokenExpired | AuthError::TokenInvalid => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid or expired token".to_string(),
                ),
                AuthError::MissingToken => (
                    StatusCode::UNAUTHORIZED,
                    "MISSING_TOKEN",
                    "Missing authentication token".to_string(),
                ),
                AuthError::RefreshTokenMismatch => (
                    StatusCode::UNAUTHORIZED,
                    "REFRESH_TOKEN_INVALID",
                    "Refresh token is expired or already used".to_string(),
                ),
            },

            // A rejected or failed upload is the client's problem; a local
            // spool failure is ours.
            AppError::Media(MediaError::UploadFailed(_)) => (
                StatusCode::BAD_REQUEST,
                "UPLOAD_FAILED",
                "File upload failed".to_string(),
            ),
            AppError::Media(MediaError::LocalFile(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Store(StoreError::Duplicate) => {
                tracing::warn!(error_id = error_id, "Duplicate account attempt");
            }
            AppError::Store(e) => {
                tracing::error!(error_id = error_id, error = %e, "Store error");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::Media(e @ MediaError::UploadFailed(_)) => {
                tracing::warn!(error_id = error_id, error = %e, "Media upload error");
            }
            AppError::Media(e @ MediaError::LocalFile(_)) => {
                tracing::error!(error_id = error_id, error = %e, "Media spool error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code, message) = self.response_parts();
        let body = ErrorResponse::new(error_id, message, code.to_string(), status.as_u16());

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.response_parts().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400() {
        let err = AppError::Validation(ValidationError::EmptyField("email".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn duplicate_maps_to_409_without_field_leak() {
        let err = AppError::Store(StoreError::Duplicate);
        let (status, _, message) = err.response_parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!message.to_lowercase().contains("email"));
        assert!(!message.to_lowercase().contains("username"));
    }

    #[test]
    fn auth_errors_map_to_401() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::TokenExpired,
            AuthError::TokenInvalid,
            AuthError::MissingToken,
            AuthError::RefreshTokenMismatch,
        ] {
            assert_eq!(AppError::Auth(err).status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn insert_duplicate_key_maps_to_conflict() {
        use mongodb::error::{ErrorKind, WriteError, WriteFailure};

        let write_err: WriteError = serde_json::from_value(serde_json::json!({
            "code": 11000,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error collection: videotube.users"
        }))
        .expect("failed to build write error");

        let err = mongodb::error::Error::from(ErrorKind::Write(WriteFailure::WriteError(
            write_err,
        )));
        let app_err = AppError::from(err);
        assert!(matches!(app_err, AppError::Store(StoreError::Duplicate)));
        assert_eq!(app_err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn find_and_modify_duplicate_key_maps_to_conflict() {
        use mongodb::error::{CommandError, ErrorKind};

        // findAndModify reports E11000 as a top-level command error
        let command_err: CommandError = serde_json::from_value(serde_json::json!({
            "code": 11000,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error collection: videotube.users"
        }))
        .expect("failed to build command error");

        let err = mongodb::error::Error::from(ErrorKind::Command(command_err));
        let app_err = AppError::from(err);
        assert!(matches!(app_err, AppError::Store(StoreError::Duplicate)));
        assert_eq!(app_err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn non_duplicate_command_error_maps_to_internal() {
        use mongodb::error::{CommandError, ErrorKind};

        let command_err: CommandError = serde_json::from_value(serde_json::json!({
            "code": 50,
            "codeName": "MaxTimeMSExpired",
            "errmsg": "operation exceeded time limit"
        }))
        .expect("failed to build command error");

        let err = mongodb::error::Error::from(ErrorKind::Command(command_err));
        let app_err = AppError::from(err);
        assert!(matches!(app_err, AppError::Store(StoreError::Query(_))));
    }

    #[test]
    fn store_query_errors_do_not_leak_details() {
        let err = AppError::Store(StoreError::Query("users.find: cursor exhausted".to_string()));
        let (status, _, message) = err.response_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("cursor"));
    }

    #[test]
    fn upload_failure_is_client_error_but_spool_failure_is_not() {
        let upload = AppError::Media(MediaError::UploadFailed("host down".to_string()));
        assert_eq!(upload.status_code(), StatusCode::BAD_REQUEST);

        let spool = AppError::Media(MediaError::LocalFile("disk full".to_string()));
        let (status, _, message) = spool.response_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("disk"));
    }

    #[test]
    fn error_response_body_shape() {
        let body = ErrorResponse::new(
            "id-1".to_string(),
            "User not found".to_string(),
            "NOT_FOUND".to_string(),
            404,
        );
        assert!(!body.success);
        assert_eq!(body.code, "NOT_FOUND");
        assert_eq!(body.status, 404);
    }
}
