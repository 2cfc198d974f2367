use axum::{extract::State, response::Json};
use validator::Validate;

use crate::dtos::auth_dtos::{
    ForgotPasswordRequest, MessageResponse, OtpSentResponse, ResetPasswordRequest,
    SendMobileOtpRequest, VerifyMobileOtpRequest, VerifyOtpRequest, VerifyOtpResponse,
};
use crate::errors::{AppError, Result};
use crate::handlers::auth::session_response;
use crate::models::user::AuthResponse;
use crate::services::account_service::MobileSignup;
use crate::services::sms_service::mask;
use crate::state::AppState;
use crate::utils::identifier::{normalize_email, require_mobile};

// 1. Mobile login - request OTP
pub async fn send_mobile_otp(
    State(state): State<AppState>,
    Json(req): Json<SendMobileOtpRequest>,
) -> Result<Json<OtpSentResponse>> {
    let mobile = require_mobile(&req.mobile)?;
    state.rate_limiter.check(&format!("otp:mobile:{}", mobile)).await?;

    let expires_at = state.mobile_otp.issue(&mobile).await?;
    tracing::info!("📱 Mobile OTP issued for {}", mask(&mobile));

    Ok(Json(OtpSentResponse {
        success: true,
        message: "OTP sent to your mobile number".to_string(),
        expires_at,
    }))
}

// 2. Mobile login - verify OTP, then find or create the account
pub async fn verify_mobile_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyMobileOtpRequest>,
) -> Result<Json<AuthResponse>> {
    req.validate()?;
    let mobile = require_mobile(&req.mobile)?;

    let signup = match (req.name, req.email) {
        (Some(name), Some(email)) => Some(MobileSignup { name, email }),
        _ => None,
    };
    // An unknown number without signup details keeps its code for the retry.
    state.accounts.mobile_login_ready(&mobile, signup.is_some()).await?;

    state.mobile_otp.verify(&mobile, req.otp.trim()).await?;
    let resolved = state.accounts.resolve_mobile_login(&mobile, signup).await?;

    tracing::info!(
        "🔓 Mobile OTP login for {} (new account: {})",
        resolved.user.id_hex(),
        resolved.created
    );
    Ok(Json(session_response(&state, resolved.user)?))
}

// 3. Forgot password - email OTP
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<OtpSentResponse>> {
    req.validate()?;
    let email = normalize_email(&req.email);
    state.rate_limiter.check(&format!("otp:email:{}", email)).await?;

    // Same answer whether or not the account exists.
    let expires_at = match state.accounts.find_by_email(&email).await? {
        Some(_) => state.email_otp.issue(&email).await?,
        None => {
            tracing::warn!("Password reset requested for unknown email");
            chrono::Utc::now() + state.email_otp.policy().ttl
        }
    };

    Ok(Json(OtpSentResponse {
        success: true,
        message: "If the account exists, an OTP has been sent to its email".to_string(),
        expires_at,
    }))
}

// 4. Verify email OTP - exchange for a reset token
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>> {
    req.validate()?;
    let email = normalize_email(&req.email);

    state.email_otp.verify(&email, req.otp.trim()).await?;
    let user = state
        .accounts
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let reset_token = state.sessions.issue_reset_token(&user)?;

    Ok(Json(VerifyOtpResponse {
        success: true,
        message: "OTP verified. You can now reset your password".to_string(),
        reset_token,
    }))
}

// 5. Reset password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;
    let email = normalize_email(&req.email);

    if req.reset_token.trim().is_empty() {
        return Err(AppError::invalid_data("Reset token is required"));
    }
    let user = state
        .accounts
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::invalid_data("Invalid or expired reset token"))?;
    // Bound to the current password hash, so a used token no longer matches.
    state.sessions.check_reset_token(req.reset_token.trim(), &user)?;
    state.accounts.reset_password(&user, &req.new_password).await?;

    tracing::info!("🔑 Password reset completed");
    Ok(Json(MessageResponse::ok("Password has been reset successfully")))
}
