//! Recurring background jobs. Call `spawn_all` once during startup.

use std::time::Duration;

use crate::services::otp_service::OTPService;
use crate::services::rate_limiter::RateLimiter;
use crate::state::AppState;

pub fn spawn_all(state: &AppState) {
    spawn_otp_cleanup(
        vec![
            ("mobile", state.mobile_otp.clone()),
            ("email", state.email_otp.clone()),
        ],
        state.rate_limiter.clone(),
        Duration::from_secs(state.config.otp_cleanup_interval_secs.max(1)),
    );
}

/// Sweeps expired OTP records and idle rate-limit keys on a fixed interval.
pub fn spawn_otp_cleanup(
    services: Vec<(&'static str, OTPService)>,
    limiter: RateLimiter,
    every: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;

            for (channel, service) in &services {
                match service.cleanup().await {
                    Ok(n) if n > 0 => tracing::info!("🧹 Removed {} expired {} OTPs", n, channel),
                    Ok(_) => {}
                    Err(e) => tracing::error!("Failed to clean up {} OTPs: {}", channel, e),
                }
            }

            let pruned = limiter.prune().await;
            if pruned > 0 {
                tracing::debug!("Pruned {} idle rate-limit keys", pruned);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};

    use super::*;
    use crate::models::otp::OtpRecord;
    use crate::services::otp_service::{LogDelivery, OtpPolicy};
    use crate::services::otp_store::memory::MemoryOtpStore;
    use crate::services::otp_store::OtpStore;

    #[tokio::test]
    async fn test_cleanup_task_sweeps_expired_records() {
        let store = Arc::new(MemoryOtpStore::default());
        let past = Utc::now() - ChronoDuration::minutes(30);
        store
            .replace(&OtpRecord::new(
                "9876543210",
                "123456",
                past,
                past + ChronoDuration::minutes(5),
            ))
            .await
            .unwrap();

        let service = OTPService::new(
            store.clone(),
            Arc::new(LogDelivery { channel: "mobile" }),
            OtpPolicy {
                ttl: ChronoDuration::minutes(5),
                max_attempts: 3,
            },
        );

        spawn_otp_cleanup(
            vec![("mobile", service)],
            RateLimiter::new(5, 60),
            Duration::from_millis(10),
        );

        for _ in 0..50 {
            if store.len().await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expired OTP was not cleaned up");
    }
}
