use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};
use crate::handlers::certificates::CERTIFICATES_COLLECTION;
use crate::handlers::courses::COURSES_COLLECTION;
use crate::handlers::tickets::TICKETS_COLLECTION;
use crate::handlers::updates::UPDATES_COLLECTION;
use crate::models::ticket::TicketStatus;
use crate::models::user::{Claims, Role, User, UserResponse};
use crate::services::user_store::USERS_COLLECTION;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub users: u64,
    pub students: u64,
    pub admins: u64,
    pub courses: u64,
    pub published_courses: u64,
    pub certificates: u64,
    pub open_tickets: u64,
    pub updates: u64,
}

fn users(state: &AppState) -> Collection<User> {
    state.db.collection(USERS_COLLECTION)
}

fn user_filter(query: &UserListQuery) -> Document {
    let mut filter = doc! {};
    if let Some(role) = query.role {
        filter.insert("role", role.as_str());
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = regex::escape(search);
        filter.insert(
            "$or",
            vec![
                doc! { "name": { "$regex": &pattern, "$options": "i" } },
                doc! { "email": { "$regex": &pattern, "$options": "i" } },
                doc! { "mobile": { "$regex": &pattern } },
            ],
        );
    }
    filter
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let found: Vec<User> = users(&state)
        .find(user_filter(&query))
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(UserResponse::from).collect()))
}

pub async fn set_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<UserResponse>> {
    let user_id = ObjectId::parse_str(&id)?;
    if user_id == claims.user_id()? {
        return Err(AppError::forbidden("You cannot change your own role"));
    }

    let result = users(&state)
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": {
                "role": payload.role.as_str(),
                "updated_at": bson::DateTime::from_chrono(Utc::now()),
            } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::not_found("User"));
    }

    tracing::info!(
        "🛡️ {} set role of {} to {}",
        claims.email,
        id,
        payload.role.as_str()
    );
    let user = state.accounts.find_by_id(&user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn count(db: &Database, collection: &str, filter: Document) -> Result<u64> {
    Ok(db
        .collection::<Document>(collection)
        .count_documents(filter)
        .await?)
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<PlatformStats>> {
    let db = &state.db;

    Ok(Json(PlatformStats {
        users: count(db, USERS_COLLECTION, doc! {}).await?,
        students: count(db, USERS_COLLECTION, doc! { "role": Role::Student.as_str() }).await?,
        admins: count(db, USERS_COLLECTION, doc! { "role": Role::Admin.as_str() }).await?,
        courses: count(db, COURSES_COLLECTION, doc! {}).await?,
        published_courses: count(db, COURSES_COLLECTION, doc! { "published": true }).await?,
        certificates: count(db, CERTIFICATES_COLLECTION, doc! {}).await?,
        open_tickets: count(
            db,
            TICKETS_COLLECTION,
            doc! { "status": { "$in": [TicketStatus::Open.as_str(), TicketStatus::InProgress.as_str()] } },
        )
        .await?,
        updates: count(db, UPDATES_COLLECTION, doc! {}).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_filter_escapes_search() {
        let filter = user_filter(&UserListQuery {
            role: Some(Role::Admin),
            search: Some("a.b+".into()),
        });
        assert_eq!(filter.get_str("role").unwrap(), "admin");

        let or = filter.get_array("$or").unwrap();
        let name = or[0].as_document().unwrap().get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"a\.b\+");
    }

    #[test]
    fn test_user_filter_empty() {
        let filter = user_filter(&UserListQuery {
            role: None,
            search: Some("   ".into()),
        });
        assert!(filter.is_empty());
    }
}
