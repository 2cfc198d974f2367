use std::sync::Arc;

use mongodb::Database;

use crate::config::AppConfig;
use crate::services::account_service::AccountService;
use crate::services::cloudinary::CloudinaryService;
use crate::services::google_auth::GoogleAuthService;
use crate::services::otp_service::{LogDelivery, OTPService, OtpDelivery, OtpPolicy};
use crate::services::otp_store::{MongoOtpStore, EMAIL_OTP_COLLECTION, MOBILE_OTP_COLLECTION};
use crate::services::rate_limiter::RateLimiter;
use crate::services::session::SessionService;
use crate::services::sms_service::SMSService;
use crate::services::user_store::MongoUserStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub accounts: AccountService,
    pub sessions: SessionService,
    pub mobile_otp: OTPService,
    pub email_otp: OTPService,
    pub rate_limiter: RateLimiter,
    pub cloudinary: Option<Arc<CloudinaryService>>,
    pub google: Option<Arc<GoogleAuthService>>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let mobile_delivery: Arc<dyn OtpDelivery> = match &config.sms {
            Some(sms) => Arc::new(SMSService::new(sms)),
            None => {
                tracing::warn!("SMS provider not configured, mobile OTPs go to the log");
                Arc::new(LogDelivery { channel: "mobile" })
            }
        };

        let mobile_otp = OTPService::new(
            Arc::new(MongoOtpStore::new(&db, MOBILE_OTP_COLLECTION)),
            mobile_delivery,
            OtpPolicy::from(config.mobile_otp),
        );

        let email_otp = OTPService::new(
            Arc::new(MongoOtpStore::new(&db, EMAIL_OTP_COLLECTION)),
            Arc::new(LogDelivery { channel: "email" }),
            OtpPolicy::from(config.email_otp),
        );

        let accounts = AccountService::new(
            Arc::new(MongoUserStore::new(&db)),
            config.admin_emails.clone(),
        );

        AppState {
            sessions: SessionService::new(&config.jwt_secret, config.session_ttl_hours),
            rate_limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window_secs),
            cloudinary: config
                .cloudinary
                .as_ref()
                .map(|c| Arc::new(CloudinaryService::new(c))),
            google: config
                .google_client_id
                .clone()
                .map(|id| Arc::new(GoogleAuthService::new(id))),
            accounts,
            mobile_otp,
            email_otp,
            config: Arc::new(config),
            db,
        }
    }

    pub fn cloudinary(&self) -> crate::errors::Result<&CloudinaryService> {
        self.cloudinary
            .as_deref()
            .ok_or_else(|| crate::errors::AppError::configuration("Cloudinary is not configured"))
    }
}
