use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::config::OtpConfig;
use crate::errors::{AppError, Result};
use crate::models::otp::OtpRecord;
use crate::services::otp_store::OtpStore;
use crate::services::sms_service::mask;
use crate::utils::code_generator::generate_six_digit_code;

/// Out-of-band channel that carries a code to its owner.
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, identifier: &str, code: &str, ttl_minutes: i64) -> Result<()>;
}

/// Writes the code to the server log. Used when no SMS/email provider is configured.
pub struct LogDelivery {
    pub channel: &'static str,
}

#[async_trait]
impl OtpDelivery for LogDelivery {
    async fn deliver(&self, identifier: &str, code: &str, ttl_minutes: i64) -> Result<()> {
        tracing::info!(
            "🔐 {} OTP for {}: {} (valid {} min)",
            self.channel,
            mask(identifier),
            code,
            ttl_minutes
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub max_attempts: i32,
}

impl From<OtpConfig> for OtpPolicy {
    fn from(config: OtpConfig) -> Self {
        Self {
            ttl: Duration::minutes(config.ttl_minutes),
            max_attempts: config.max_attempts,
        }
    }
}

#[derive(Clone)]
pub struct OTPService {
    store: Arc<dyn OtpStore>,
    delivery: Arc<dyn OtpDelivery>,
    policy: OtpPolicy,
}

impl OTPService {
    pub fn new(store: Arc<dyn OtpStore>, delivery: Arc<dyn OtpDelivery>, policy: OtpPolicy) -> Self {
        Self {
            store,
            delivery,
            policy,
        }
    }

    pub fn policy(&self) -> OtpPolicy {
        self.policy
    }

    /// Issues a fresh code for `identifier`, invalidating any earlier one.
    /// Returns the expiry; the code itself only leaves through the delivery channel.
    pub async fn issue(&self, identifier: &str) -> Result<DateTime<Utc>> {
        self.issue_at(identifier, Utc::now()).await
    }

    pub async fn verify(&self, identifier: &str, submitted: &str) -> Result<()> {
        self.verify_at(identifier, submitted, Utc::now()).await
    }

    /// Sweeps records past their expiry.
    pub async fn cleanup(&self) -> Result<u64> {
        self.store.delete_expired(Utc::now()).await
    }

    pub(crate) async fn issue_at(&self, identifier: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let code = generate_six_digit_code();
        let expires_at = now + self.policy.ttl;

        self.store
            .replace(&OtpRecord::new(identifier, &code, now, expires_at))
            .await?;

        self.delivery
            .deliver(identifier, &code, self.policy.ttl.num_minutes())
            .await?;

        Ok(expires_at)
    }

    pub(crate) async fn verify_at(
        &self,
        identifier: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let record = self
            .store
            .find(identifier)
            .await?
            .ok_or(AppError::OtpNotFound)?;

        if record.is_expired(now) {
            self.store.delete(identifier).await?;
            return Err(AppError::OtpExpired);
        }

        if record.attempts >= self.policy.max_attempts {
            self.store.delete(identifier).await?;
            return Err(AppError::TooManyAttempts);
        }

        if record.code != submitted.trim() {
            self.store
                .increment_attempts(identifier, &record.code)
                .await?;
            tracing::warn!(
                "OTP mismatch for {} (attempt {}/{})",
                mask(identifier),
                record.attempts + 1,
                self.policy.max_attempts
            );
            return Err(AppError::InvalidOtp);
        }

        // Lost the race to a concurrent verifier or a re-issue.
        if !self.store.consume(identifier, &record.code).await? {
            return Err(AppError::OtpNotFound);
        }

        Ok(())
    }
}
