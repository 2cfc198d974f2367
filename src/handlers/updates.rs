use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Collection;
use validator::Validate;

use crate::dtos::auth_dtos::MessageResponse;
use crate::errors::{AppError, Result};
use crate::models::update::{CreateUpdate, Feed, FeedItem, Update, UpdateRead};
use crate::models::user::Claims;
use crate::state::AppState;

pub const UPDATES_COLLECTION: &str = "updates";
pub const UPDATE_READS_COLLECTION: &str = "update_reads";

fn updates(state: &AppState) -> Collection<Update> {
    state.db.collection(UPDATES_COLLECTION)
}

fn reads(state: &AppState) -> Collection<UpdateRead> {
    state.db.collection(UPDATE_READS_COLLECTION)
}

async fn read_ids(state: &AppState, user_id: &ObjectId) -> Result<Vec<ObjectId>> {
    let markers: Vec<UpdateRead> = reads(state)
        .find(doc! { "user_id": user_id })
        .await?
        .try_collect()
        .await?;
    Ok(markers.into_iter().map(|m| m.update_id).collect())
}

/// Inserts a read marker unless one exists. Returns whether it was new.
async fn mark(state: &AppState, update_id: ObjectId, user_id: ObjectId) -> Result<bool> {
    let marker = UpdateRead {
        id: None,
        update_id,
        user_id,
        read_at: Utc::now(),
    };
    match reads(state).insert_one(&marker).await {
        Ok(_) => Ok(true),
        Err(e) if crate::errors::is_duplicate_key(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Feed>> {
    let user_id = claims.user_id()?;

    let all: Vec<Update> = updates(&state)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(Feed::build(all, &read_ids(&state, &user_id).await?)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let update_id = ObjectId::parse_str(&id)?;
    if updates(&state).find_one(doc! { "_id": update_id }).await?.is_none() {
        return Err(AppError::not_found("Update"));
    }

    mark(&state, update_id, claims.user_id()?).await?;
    Ok(Json(MessageResponse::ok("Marked as read")))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>> {
    let user_id = claims.user_id()?;
    let seen = read_ids(&state, &user_id).await?;

    let unseen: Vec<Update> = updates(&state)
        .find(doc! { "_id": { "$nin": seen } })
        .await?
        .try_collect()
        .await?;

    let mut marked = 0;
    for update_id in unseen.into_iter().filter_map(|u| u.id) {
        if mark(&state, update_id, user_id).await? {
            marked += 1;
        }
    }

    Ok(Json(MessageResponse::ok(format!("{} updates marked as read", marked))))
}

pub async fn create_update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateUpdate>,
) -> Result<Json<FeedItem>> {
    payload.validate()?;

    let mut update = Update {
        id: None,
        title: payload.title.trim().to_string(),
        body: payload.body,
        link: payload.link,
        created_by: claims.email.clone(),
        created_at: Utc::now(),
    };
    let result = updates(&state).insert_one(&update).await?;
    update.id = result.inserted_id.as_object_id();

    tracing::info!("📣 Update published by {}: {}", claims.email, update.title);

    let feed = Feed::build(vec![update], &[]);
    feed.items
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| AppError::service("Inserted update has no id"))
}

/// Deletes an update together with every read marker pointing at it.
pub async fn delete_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let update_id = ObjectId::parse_str(&id)?;

    let result = updates(&state).delete_one(doc! { "_id": update_id }).await?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("Update"));
    }

    let markers = reads(&state).delete_many(doc! { "update_id": update_id }).await?;
    tracing::info!(
        "🗑️ Update {} deleted with {} read markers",
        id,
        markers.deleted_count
    );
    Ok(Json(MessageResponse::ok("Update deleted")))
}
