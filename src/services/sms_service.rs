use async_trait::async_trait;
use reqwest::Client;

use crate::config::SmsConfig;
use crate::errors::{AppError, Result};
use crate::services::otp_service::OtpDelivery;

const SMS_API_URL: &str = "https://api.africastalking.com/version1/messaging";

#[derive(Clone)]
pub struct SMSService {
    api_key: String,
    username: String,
    from: String,
    client: Client,
}

impl SMSService {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            username: config.username.clone(),
            from: config.from.clone(),
            client: Client::new(),
        }
    }

    pub async fn send(&self, phone: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(SMS_API_URL)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&[
                ("username", self.username.as_str()),
                ("to", phone),
                ("message", message),
                ("from", self.from.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::external_api(format!("SMS API error: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::external_api(format!(
                "SMS sending failed with status: {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl OtpDelivery for SMSService {
    async fn deliver(&self, identifier: &str, code: &str, ttl_minutes: i64) -> Result<()> {
        let message = format!(
            "Your LearnHub verification code is: {}. Valid for {} minutes.",
            code, ttl_minutes
        );
        self.send(identifier, &message).await?;
        tracing::info!("📱 OTP sent by SMS to {}", mask(identifier));
        Ok(())
    }
}

/// Keeps the last four characters of an identifier for logs.
pub fn mask(identifier: &str) -> String {
    let visible: String = identifier
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("***{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("9876543210"), "***3210");
        assert_eq!(mask("ab"), "***ab");
    }
}
