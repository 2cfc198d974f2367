// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    #[error("File too large: limit is {0} bytes")]
    FileTooLarge(usize),

    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateKey(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Missing or invalid session")]
    MissingSession,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Identifier is neither an email nor a 10-digit mobile number")]
    InvalidIdentifier,

    #[error("No active OTP for this identifier")]
    OtpNotFound,

    #[error("OTP has expired")]
    OtpExpired,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Too many attempts, request a new OTP")]
    TooManyAttempts,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Cloudinary error: {0}")]
    CloudinaryError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Multipart(_)
            | AppError::UnsupportedFile(_)
            | AppError::FileTooLarge(_)
            | AppError::InvalidObjectId(_)
            | AppError::ValidationError(_)
            | AppError::InvalidIdentifier
            | AppError::OtpExpired
            | AppError::InvalidOtp => StatusCode::BAD_REQUEST,
            AppError::AuthError | AppError::MissingSession => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::OtpNotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateKey(_) => StatusCode::CONFLICT,
            AppError::TooManyAttempts | AppError::RateLimitExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::ExternalApi(_) | AppError::CloudinaryError(_) => StatusCode::BAD_GATEWAY,
            AppError::MongoDB(_)
            | AppError::ConfigurationError(_)
            | AppError::ServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MongoDB(_) => "DATABASE_ERROR",
            AppError::Multipart(_) => "INVALID_MULTIPART",
            AppError::UnsupportedFile(_) => "UNSUPPORTED_FILE",
            AppError::FileTooLarge(_) => "FILE_TOO_LARGE",
            AppError::InvalidObjectId(_) => "INVALID_ID",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateKey(_) => "CONFLICT",
            AppError::AuthError => "AUTH_FAILED",
            AppError::MissingSession => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::ValidationError(_) => "VALIDATION_FAILED",
            AppError::InvalidIdentifier => "INVALID_IDENTIFIER",
            AppError::OtpNotFound => "OTP_NOT_FOUND",
            AppError::OtpExpired => "OTP_EXPIRED",
            AppError::InvalidOtp => "INVALID_OTP",
            AppError::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            AppError::RateLimitExceeded => "RATE_LIMITED",
            AppError::ExternalApi(_) => "EXTERNAL_API_ERROR",
            AppError::CloudinaryError(_) => "UPLOAD_PROVIDER_ERROR",
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AppError::ServiceError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log.
        let message = if status.is_server_error() {
            tracing::error!("request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "error": status.canonical_reason().unwrap_or("Error"),
            "code": self.code(),
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Multipart(err.to_string())
    }
}

impl From<mongodb::bson::oid::Error> for AppError {
    fn from(err: mongodb::bson::oid::Error) -> Self {
        AppError::InvalidObjectId(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::ServiceError(format!("BSON conversion failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(format!("HTTP request failed: {}", err))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::ServiceError(format!("Password hashing failed: {}", err))
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::DuplicateKey(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn external_api(msg: impl Into<String>) -> Self {
        AppError::ExternalApi(msg.into())
    }

    pub fn cloudinary(msg: impl Into<String>) -> Self {
        AppError::CloudinaryError(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        AppError::ServiceError(msg.into())
    }

    /// Maps a Mongo unique-index violation (E11000) to a 409, anything else to a 500.
    pub fn from_write(err: mongodb::error::Error, what: &str) -> Self {
        if is_duplicate_key(&err) {
            AppError::DuplicateKey(format!("{} already exists", what))
        } else {
            AppError::MongoDB(err)
        }
    }
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_errors_map_to_expected_statuses() {
        assert_eq!(AppError::OtpNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::OtpExpired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidOtp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::TooManyAttempts.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_categories() {
        assert_eq!(AppError::conflict("email").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::MissingSession.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("admin").status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::service("boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
