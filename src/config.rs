// config.rs
use std::env;
use std::str::FromStr;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_key: String,
    pub username: String,
    pub from: String,
}

/// OTP policy knobs for one variant (mobile or email).
#[derive(Debug, Clone, Copy)]
pub struct OtpConfig {
    pub ttl_minutes: i64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub host: String,
    pub port: u16,
    pub admin_emails: Vec<String>,
    pub google_client_id: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub sms: Option<SmsConfig>,
    pub mobile_otp: OtpConfig,
    pub email_otp: OtpConfig,
    pub otp_cleanup_interval_secs: u64,
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: i64,
    pub max_upload_mb: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cloudinary = match (
            optional("CLOUDINARY_CLOUD_NAME"),
            optional("CLOUDINARY_API_KEY"),
            optional("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let sms = optional("SMS_API_KEY").map(|api_key| SmsConfig {
            api_key,
            username: optional("SMS_USERNAME").unwrap_or_else(|| "sandbox".to_string()),
            from: optional("SMS_FROM").unwrap_or_else(|| "LearnHub".to_string()),
        });

        let admin_emails = optional("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(AppConfig {
            database_url: required("DATABASE_URL")?,
            database_name: optional("DATABASE_NAME").unwrap_or_else(|| "learnhub".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            session_ttl_hours: parsed("SESSION_TTL_HOURS", 24)?,
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 10000)?,
            admin_emails,
            google_client_id: optional("GOOGLE_CLIENT_ID"),
            cloudinary,
            sms,
            mobile_otp: OtpConfig {
                ttl_minutes: parsed("MOBILE_OTP_TTL_MINUTES", 5)?,
                max_attempts: parsed("MOBILE_OTP_MAX_ATTEMPTS", 3)?,
            },
            email_otp: OtpConfig {
                ttl_minutes: parsed("EMAIL_OTP_TTL_MINUTES", 10)?,
                max_attempts: parsed("EMAIL_OTP_MAX_ATTEMPTS", 5)?,
            },
            otp_cleanup_interval_secs: parsed("OTP_CLEANUP_INTERVAL_SECS", 300)?,
            rate_limit_max: parsed("RATE_LIMIT_MAX", 5)?,
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW_SECS", 900)?,
            max_upload_mb: parsed("MAX_UPLOAD_MB", 200)?,
        })
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "database_name": self.database_name,
            "session_ttl_hours": self.session_ttl_hours,
            "admin_emails": self.admin_emails.len(),
            "google_login": self.google_client_id.is_some(),
            "cloudinary": self.cloudinary.is_some(),
            "sms": self.sms.is_some(),
            "mobile_otp_ttl_minutes": self.mobile_otp.ttl_minutes,
            "email_otp_ttl_minutes": self.email_otp.ttl_minutes,
            "port": self.port,
            "host": self.host,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| AppError::configuration(format!("{} must be set", key)))
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{} must be a valid number", key))),
        None => Ok(default),
    }
}
