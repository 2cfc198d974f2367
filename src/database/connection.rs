use std::time::Duration;

use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client, Database, IndexModel,
};

use crate::config::AppConfig;
use crate::errors::Result;
use crate::services::otp_store::{EMAIL_OTP_COLLECTION, MOBILE_OTP_COLLECTION};
use crate::services::user_store::USERS_COLLECTION;

pub async fn get_db_client(config: &AppConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.database_url).await?;
    let db = client.database(&config.database_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!("✅ Connected to database: {}", config.database_name);
            tracing::info!("📂 Collections found: {:?}", collections);
        }
        Err(e) => {
            tracing::error!(
                "❌ Database '{}' may not exist or is inaccessible: {}",
                config.database_name,
                e
            );
            return Err(e.into());
        }
    }

    Ok(db)
}

fn unique(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn plain(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

/// Records are removed by the server once `expires_at` passes.
fn ttl(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().expire_after(Duration::from_secs(0)).build())
        .build()
}

/// Unique and TTL indexes the application relies on for correctness.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let users = db.collection::<Document>(USERS_COLLECTION);
    users.create_index(unique(doc! { "email": 1 })).await?;
    users.create_index(unique(doc! { "mobile": 1 })).await?;

    for name in [MOBILE_OTP_COLLECTION, EMAIL_OTP_COLLECTION] {
        let otps = db.collection::<Document>(name);
        otps.create_index(unique(doc! { "identifier": 1 })).await?;
        otps.create_index(ttl(doc! { "expires_at": 1 })).await?;
    }

    let certificates = db.collection::<Document>("certificates");
    certificates
        .create_index(unique(doc! { "user_id": 1, "course_id": 1 }))
        .await?;
    certificates
        .create_index(unique(doc! { "verification_hash": 1 }))
        .await?;

    db.collection::<Document>("courses")
        .create_index(plain(doc! { "published": 1, "category": 1 }))
        .await?;

    let tickets = db.collection::<Document>("tickets");
    tickets.create_index(plain(doc! { "user_id": 1, "created_at": -1 })).await?;
    tickets.create_index(plain(doc! { "status": 1 })).await?;

    db.collection::<Document>("ticket_replies")
        .create_index(plain(doc! { "ticket_id": 1, "created_at": 1 }))
        .await?;

    db.collection::<Document>("update_reads")
        .create_index(unique(doc! { "update_id": 1, "user_id": 1 }))
        .await?;

    tracing::info!("✅ Database indexes ensured");
    Ok(())
}
