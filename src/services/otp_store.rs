use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    Collection, Database,
};

use crate::errors::Result;
use crate::models::otp::OtpRecord;

pub const MOBILE_OTP_COLLECTION: &str = "mobile_otps";
pub const EMAIL_OTP_COLLECTION: &str = "email_otps";

/// Keyed storage for OTP records. Every mutation is a single atomic operation
/// on the backing store, so concurrent verifiers cannot both consume a code.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Stores `record`, replacing any record for the same identifier.
    async fn replace(&self, record: &OtpRecord) -> Result<()>;

    async fn find(&self, identifier: &str) -> Result<Option<OtpRecord>>;

    /// Deletes the record only if it still holds `code`. Returns whether it did.
    async fn consume(&self, identifier: &str, code: &str) -> Result<bool>;

    /// Bumps the attempt counter of the record that still holds `code`.
    async fn increment_attempts(&self, identifier: &str, code: &str) -> Result<()>;

    async fn delete(&self, identifier: &str) -> Result<()>;

    /// Removes every record that expired before `now`; returns how many.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[derive(Clone)]
pub struct MongoOtpStore {
    collection: Collection<OtpRecord>,
}

impl MongoOtpStore {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            collection: db.collection(collection),
        }
    }
}

#[async_trait]
impl OtpStore for MongoOtpStore {
    async fn replace(&self, record: &OtpRecord) -> Result<()> {
        self.collection
            .replace_one(doc! { "identifier": &record.identifier }, record)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find(&self, identifier: &str) -> Result<Option<OtpRecord>> {
        Ok(self
            .collection
            .find_one(doc! { "identifier": identifier })
            .await?)
    }

    async fn consume(&self, identifier: &str, code: &str) -> Result<bool> {
        let removed = self
            .collection
            .find_one_and_delete(doc! { "identifier": identifier, "code": code })
            .await?;
        Ok(removed.is_some())
    }

    async fn increment_attempts(&self, identifier: &str, code: &str) -> Result<()> {
        self.collection
            .update_one(
                doc! { "identifier": identifier, "code": code },
                doc! { "$inc": { "attempts": 1 } },
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<()> {
        self.collection
            .delete_one(doc! { "identifier": identifier })
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "expires_at": { "$lt": BsonDateTime::from_chrono(now) } })
            .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;

    use tokio::sync::Mutex;

    use super::*;

    /// Map-backed store used by the service tests.
    #[derive(Default)]
    pub struct MemoryOtpStore {
        records: Mutex<HashMap<String, OtpRecord>>,
    }

    impl MemoryOtpStore {
        pub async fn len(&self) -> usize {
            self.records.lock().await.len()
        }
    }

    #[async_trait]
    impl OtpStore for MemoryOtpStore {
        async fn replace(&self, record: &OtpRecord) -> Result<()> {
            self.records
                .lock()
                .await
                .insert(record.identifier.clone(), record.clone());
            Ok(())
        }

        async fn find(&self, identifier: &str) -> Result<Option<OtpRecord>> {
            Ok(self.records.lock().await.get(identifier).cloned())
        }

        async fn consume(&self, identifier: &str, code: &str) -> Result<bool> {
            let mut records = self.records.lock().await;
            match records.get(identifier) {
                Some(record) if record.code == code => {
                    records.remove(identifier);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn increment_attempts(&self, identifier: &str, code: &str) -> Result<()> {
            if let Some(record) = self.records.lock().await.get_mut(identifier) {
                if record.code == code {
                    record.attempts += 1;
                }
            }
            Ok(())
        }

        async fn delete(&self, identifier: &str) -> Result<()> {
            self.records.lock().await.remove(identifier);
            Ok(())
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
            let mut records = self.records.lock().await;
            let before = records.len();
            records.retain(|_, r| r.expires_at >= now);
            Ok((before - records.len()) as u64)
        }
    }
}
