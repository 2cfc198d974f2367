use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::identifier::IdentifierKind;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    pub mobile: String,

    #[validate(length(min = 8, max = 72, message = "Password must be 8-72 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email or mobile number is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LookupRequest {
    #[validate(length(min = 1, message = "Email or mobile number is required"))]
    pub identifier: String,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub kind: IdentifierKind,
    pub exists: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GoogleLoginRequest {
    #[validate(length(min = 1, message = "Google ID token is required"))]
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMobileOtpRequest {
    pub mobile: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyMobileOtpRequest {
    pub mobile: String,

    #[validate(length(min = 6, max = 6, message = "OTP must be 6 digits"))]
    pub otp: String,

    /// Only needed when no account exists for the mobile number yet.
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, max = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    pub reset_token: String,

    #[validate(length(min = 8, max = 72, message = "Password must be 8-72 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct OtpSentResponse {
    pub success: bool,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub reset_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_signup_fields_are_optional_but_checked() {
        let bare = VerifyMobileOtpRequest {
            mobile: "9876543210".into(),
            otp: "123456".into(),
            name: None,
            email: None,
        };
        assert!(bare.validate().is_ok());

        let bad_email = VerifyMobileOtpRequest {
            email: Some("not-an-email".into()),
            ..bare
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_otp_must_be_six_characters() {
        let req = VerifyOtpRequest {
            email: "asha@example.com".into(),
            otp: "1234".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_reset_password_rejects_overlong_secret() {
        let req = ResetPasswordRequest {
            email: "asha@example.com".into(),
            reset_token: "token".into(),
            new_password: format!("a1{}", "x".repeat(71)),
        };
        assert!(req.validate().is_err());
    }
}
