//! User persistence behind a trait so the account flows can run against
//! MongoDB in production and an in-memory map in tests.

use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    Collection, Database,
};

use crate::errors::{AppError, Result};
use crate::models::user::User;

pub const USERS_COLLECTION: &str = "users";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>>;

    /// Inserts a new user and returns it with its id set.
    /// Fails with `DuplicateKey` when the email or mobile is taken.
    async fn insert(&self, user: User) -> Result<User>;

    async fn set_avatar(&self, id: &ObjectId, avatar_url: &str) -> Result<()>;

    async fn set_password_hash(&self, id: &ObjectId, password_hash: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoUserStore {
    collection: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(USERS_COLLECTION),
        }
    }

    async fn set_field(&self, id: &ObjectId, field: &str, value: &str) -> Result<()> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { field: value, "updated_at": BsonDateTime::from_chrono(Utc::now()) } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "mobile": mobile }).await?)
    }

    async fn insert(&self, mut user: User) -> Result<User> {
        let result = self
            .collection
            .insert_one(&user)
            .await
            .map_err(|e| AppError::from_write(e, "An account with this email or mobile"))?;

        user.id = result.inserted_id.as_object_id();
        Ok(user)
    }

    async fn set_avatar(&self, id: &ObjectId, avatar_url: &str) -> Result<()> {
        self.set_field(id, "avatar_url", avatar_url).await
    }

    async fn set_password_hash(&self, id: &ObjectId, password_hash: &str) -> Result<()> {
        self.set_field(id, "password_hash", password_hash).await
    }
}

#[cfg(test)]
pub mod memory {
    use tokio::sync::Mutex;

    use super::*;

    /// Enforces the same uniqueness rules as the Mongo indexes.
    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        pub async fn count(&self) -> usize {
            self.users.lock().await.len()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
            Ok(self.users.lock().await.iter().find(|u| u.id.as_ref() == Some(id)).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            Ok(self.users.lock().await.iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>> {
            Ok(self.users.lock().await.iter().find(|u| u.mobile == mobile).cloned())
        }

        async fn insert(&self, mut user: User) -> Result<User> {
            let mut users = self.users.lock().await;
            if users.iter().any(|u| u.email == user.email || u.mobile == user.mobile) {
                return Err(AppError::conflict("An account with this email or mobile already exists"));
            }
            user.id = Some(ObjectId::new());
            users.push(user.clone());
            Ok(user)
        }

        async fn set_avatar(&self, id: &ObjectId, avatar_url: &str) -> Result<()> {
            let mut users = self.users.lock().await;
            let user = users
                .iter_mut()
                .find(|u| u.id.as_ref() == Some(id))
                .ok_or_else(|| AppError::not_found("User"))?;
            user.avatar_url = Some(avatar_url.to_string());
            Ok(())
        }

        async fn set_password_hash(&self, id: &ObjectId, password_hash: &str) -> Result<()> {
            let mut users = self.users.lock().await;
            let user = users
                .iter_mut()
                .find(|u| u.id.as_ref() == Some(id))
                .ok_or_else(|| AppError::not_found("User"))?;
            user.password_hash = password_hash.to_string();
            Ok(())
        }
    }
}
