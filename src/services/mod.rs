pub mod account_service;
pub mod cloudinary;
pub mod google_auth;
pub mod otp_service;
pub mod otp_store;
pub mod rate_limiter;
pub mod session;
pub mod sms_service;
pub mod user_store;
