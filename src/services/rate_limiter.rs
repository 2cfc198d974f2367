use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::errors::{AppError, Result};

/// Sliding-window request counter keyed by caller-chosen strings.
/// State lives in this process only.
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Arc<Mutex<HashMap<String, Vec<DateTime<Utc>>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: i64) -> Self {
        Self {
            max_requests,
            window: Duration::seconds(window_secs),
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn check(&self, key: &str) -> Result<()> {
        self.check_at(key, Utc::now()).await
    }

    pub(crate) async fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<()> {
        let mut hits = self.hits.lock().await;
        let window_start = now - self.window;

        let entry = hits.entry(key.to_string()).or_default();
        entry.retain(|t| *t > window_start);

        if entry.len() >= self.max_requests {
            tracing::warn!("Rate limit hit for key {}", key);
            return Err(AppError::RateLimitExceeded);
        }

        entry.push(now);
        Ok(())
    }

    /// Drops keys with no hits inside the window.
    pub async fn prune(&self) -> usize {
        let mut hits = self.hits.lock().await;
        let window_start = Utc::now() - self.window;
        let before = hits.len();
        hits.retain(|_, times| times.iter().any(|t| *t > window_start));
        before - hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admits_max_then_rejects() {
        let limiter = RateLimiter::new(3, 60);
        let now = Utc::now();

        for _ in 0..3 {
            assert!(limiter.check_at("otp:9876543210", now).await.is_ok());
        }
        assert!(matches!(
            limiter.check_at("otp:9876543210", now).await,
            Err(AppError::RateLimitExceeded)
        ));
        // Other keys are independent.
        assert!(limiter.check_at("otp:9123456780", now).await.is_ok());
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(1, 60);
        let now = Utc::now();

        assert!(limiter.check_at("k", now).await.is_ok());
        assert!(limiter.check_at("k", now + Duration::seconds(30)).await.is_err());
        assert!(limiter.check_at("k", now + Duration::seconds(61)).await.is_ok());
    }

    #[tokio::test]
    async fn test_prune_drops_stale_keys() {
        let limiter = RateLimiter::new(5, 60);
        limiter
            .check_at("stale", Utc::now() - Duration::seconds(120))
            .await
            .unwrap();
        limiter.check("fresh").await.unwrap();

        assert_eq!(limiter.prune().await, 1);
    }
}
