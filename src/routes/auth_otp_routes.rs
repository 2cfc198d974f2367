use axum::{routing::post, Router};

use crate::{handlers::auth_otp, state::AppState};

pub fn auth_otp_routes() -> Router<AppState> {
    Router::new()
        // Mobile OTP login
        .route("/auth/otp/mobile/send", post(auth_otp::send_mobile_otp))
        .route("/auth/otp/mobile/verify", post(auth_otp::verify_mobile_otp))

        // Password reset by email OTP
        .route("/auth/forgot-password", post(auth_otp::forgot_password))
        .route("/auth/verify-otp", post(auth_otp::verify_otp))
        .route("/auth/reset-password", post(auth_otp::reset_password))
}
