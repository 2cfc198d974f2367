use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::Collection;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::auth_dtos::MessageResponse;
use crate::errors::{AppError, Result};
use crate::models::course::{
    next_order, reorder, AddPdf, AddVideo, Course, CourseDetail, CoursePdf, CourseQuery,
    CourseSummary, CourseVideo, CreateCourse, ReorderItems, UpdateCourse,
};
use crate::models::user::{Claims, User};
use crate::services::cloudinary::ResourceType;
use crate::services::user_store::USERS_COLLECTION;
use crate::state::AppState;

pub const COURSES_COLLECTION: &str = "courses";

fn courses(state: &AppState) -> Collection<Course> {
    state.db.collection(COURSES_COLLECTION)
}

async fn load_course(state: &AppState, id: &ObjectId) -> Result<Course> {
    courses(state)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Course"))
}

async fn load_published(state: &AppState, id: &ObjectId) -> Result<Course> {
    courses(state)
        .find_one(doc! { "_id": id, "published": true })
        .await?
        .ok_or_else(|| AppError::not_found("Course"))
}

fn catalog_filter(query: &CourseQuery) -> Document {
    let mut filter = doc! { "published": true };
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        filter.insert("category", category);
    }
    if let Some(level) = query.level.as_deref().filter(|l| !l.is_empty()) {
        filter.insert("level", level);
    }
    filter
}

pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseQuery>,
) -> Result<Json<Vec<CourseSummary>>> {
    let filter = catalog_filter(&query);
    tracing::debug!("Listing courses with filter {:?}", filter);

    let found: Vec<Course> = courses(&state)
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(CourseSummary::from).collect()))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>> {
    let course_id = ObjectId::parse_str(&id)?;
    let course = load_published(&state, &course_id).await?;
    Ok(Json(CourseDetail::from(course)))
}

pub async fn enroll(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let user_id = claims.user_id()?;
    let course_id = ObjectId::parse_str(&id)?;
    let course = load_published(&state, &course_id).await?;

    let users: Collection<User> = state.db.collection(USERS_COLLECTION);
    let result = users
        .update_one(
            doc! { "_id": user_id },
            doc! {
                "$addToSet": { "enrolled_courses": course_id },
                "$set": { "updated_at": bson::DateTime::from_chrono(Utc::now()) },
            },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::not_found("User"));
    }
    if result.modified_count > 0 {
        tracing::info!("📚 {} enrolled in {}", claims.sub, course.title);
    }

    Ok(Json(MessageResponse::ok(format!("Enrolled in {}", course.title))))
}

pub async fn my_courses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CourseSummary>>> {
    let user = state.accounts.find_by_id(&claims.user_id()?).await?;
    if user.enrolled_courses.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let found: Vec<Course> = courses(&state)
        .find(doc! { "_id": { "$in": user.enrolled_courses.clone() } })
        .sort(doc! { "title": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(CourseSummary::from).collect()))
}

// ---- admin ----

pub async fn admin_list_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseSummary>>> {
    let found: Vec<Course> = courses(&state)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(CourseSummary::from).collect()))
}

pub async fn admin_get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>> {
    let course = load_course(&state, &ObjectId::parse_str(&id)?).await?;
    Ok(Json(CourseDetail::from(course)))
}

pub async fn create_course(
    State(state): State<AppState>,
    Json(payload): Json<CreateCourse>,
) -> Result<Json<CourseDetail>> {
    payload.validate()?;

    let now = Utc::now();
    let mut course = Course {
        id: None,
        title: payload.title.trim().to_string(),
        description: payload.description,
        category: payload.category.trim().to_string(),
        level: payload.level.trim().to_string(),
        instructor: payload.instructor.trim().to_string(),
        thumbnail_url: payload.thumbnail_url,
        published: payload.published,
        videos: Vec::new(),
        pdfs: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let result = courses(&state).insert_one(&course).await?;
    course.id = result.inserted_id.as_object_id();

    tracing::info!("✅ Course created: {}", course.title);
    Ok(Json(CourseDetail::from(course)))
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCourse>,
) -> Result<Json<CourseDetail>> {
    payload.validate()?;
    let course_id = ObjectId::parse_str(&id)?;

    let mut set = doc! { "updated_at": bson::DateTime::from_chrono(Utc::now()) };
    if let Some(title) = payload.title {
        set.insert("title", title.trim());
    }
    if let Some(description) = payload.description {
        set.insert("description", description);
    }
    if let Some(category) = payload.category {
        set.insert("category", category.trim());
    }
    if let Some(level) = payload.level {
        set.insert("level", level.trim());
    }
    if let Some(instructor) = payload.instructor {
        set.insert("instructor", instructor.trim());
    }
    if let Some(thumbnail_url) = payload.thumbnail_url {
        set.insert("thumbnail_url", thumbnail_url);
    }
    if let Some(published) = payload.published {
        set.insert("published", published);
    }

    let result = courses(&state)
        .update_one(doc! { "_id": course_id }, doc! { "$set": set })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::not_found("Course"));
    }

    let course = load_course(&state, &course_id).await?;
    Ok(Json(CourseDetail::from(course)))
}

/// Deletes the course and drops it from every enrollment list.
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let course_id = ObjectId::parse_str(&id)?;

    let result = courses(&state).delete_one(doc! { "_id": course_id }).await?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("Course"));
    }

    let users: Collection<User> = state.db.collection(USERS_COLLECTION);
    let unenrolled = users
        .update_many(
            doc! { "enrolled_courses": course_id },
            doc! { "$pull": { "enrolled_courses": course_id } },
        )
        .await?;

    tracing::info!(
        "🗑️ Course {} deleted ({} enrollments removed)",
        id,
        unenrolled.modified_count
    );
    Ok(Json(MessageResponse::ok("Course deleted")))
}

pub async fn add_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddVideo>,
) -> Result<Json<CourseDetail>> {
    payload.validate()?;
    let course_id = ObjectId::parse_str(&id)?;
    let course = load_course(&state, &course_id).await?;

    let video = CourseVideo {
        id: Uuid::new_v4().to_string(),
        title: payload.title.trim().to_string(),
        url: payload.url,
        public_id: payload.public_id,
        duration_seconds: payload.duration_seconds,
        order: payload.order.unwrap_or_else(|| next_order(&course.videos)),
    };

    push_item(&state, &course_id, "videos", bson::to_bson(&video)?).await?;
    Ok(Json(CourseDetail::from(load_course(&state, &course_id).await?)))
}

pub async fn add_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddPdf>,
) -> Result<Json<CourseDetail>> {
    payload.validate()?;
    let course_id = ObjectId::parse_str(&id)?;
    let course = load_course(&state, &course_id).await?;

    let pdf = CoursePdf {
        id: Uuid::new_v4().to_string(),
        title: payload.title.trim().to_string(),
        url: payload.url,
        public_id: payload.public_id,
        order: payload.order.unwrap_or_else(|| next_order(&course.pdfs)),
    };

    push_item(&state, &course_id, "pdfs", bson::to_bson(&pdf)?).await?;
    Ok(Json(CourseDetail::from(load_course(&state, &course_id).await?)))
}

pub async fn remove_video(
    State(state): State<AppState>,
    Path((id, video_id)): Path<(String, String)>,
) -> Result<Json<CourseDetail>> {
    let course_id = ObjectId::parse_str(&id)?;
    let course = load_course(&state, &course_id).await?;

    let video = course
        .videos
        .iter()
        .find(|v| v.id == video_id)
        .ok_or_else(|| AppError::not_found("Video"))?;

    pull_item(&state, &course_id, "videos", &video_id).await?;
    release_asset(&state, video.public_id.as_deref(), ResourceType::Video).await;

    Ok(Json(CourseDetail::from(load_course(&state, &course_id).await?)))
}

pub async fn remove_pdf(
    State(state): State<AppState>,
    Path((id, pdf_id)): Path<(String, String)>,
) -> Result<Json<CourseDetail>> {
    let course_id = ObjectId::parse_str(&id)?;
    let course = load_course(&state, &course_id).await?;

    let pdf = course
        .pdfs
        .iter()
        .find(|p| p.id == pdf_id)
        .ok_or_else(|| AppError::not_found("PDF"))?;

    pull_item(&state, &course_id, "pdfs", &pdf_id).await?;
    release_asset(&state, pdf.public_id.as_deref(), ResourceType::Raw).await;

    Ok(Json(CourseDetail::from(load_course(&state, &course_id).await?)))
}

pub async fn reorder_videos(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ReorderItems>,
) -> Result<Json<CourseDetail>> {
    let course_id = ObjectId::parse_str(&id)?;
    let mut course = load_course(&state, &course_id).await?;

    reorder(&mut course.videos, &payload.ids)?;
    set_items(&state, &course_id, "videos", bson::to_bson(&course.videos)?).await?;

    Ok(Json(CourseDetail::from(course)))
}

pub async fn reorder_pdfs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ReorderItems>,
) -> Result<Json<CourseDetail>> {
    let course_id = ObjectId::parse_str(&id)?;
    let mut course = load_course(&state, &course_id).await?;

    reorder(&mut course.pdfs, &payload.ids)?;
    set_items(&state, &course_id, "pdfs", bson::to_bson(&course.pdfs)?).await?;

    Ok(Json(CourseDetail::from(course)))
}

async fn push_item(state: &AppState, course_id: &ObjectId, field: &str, item: bson::Bson) -> Result<()> {
    courses(state)
        .update_one(
            doc! { "_id": course_id },
            doc! {
                "$push": { field: item },
                "$set": { "updated_at": bson::DateTime::from_chrono(Utc::now()) },
            },
        )
        .await?;
    Ok(())
}

async fn pull_item(state: &AppState, course_id: &ObjectId, field: &str, item_id: &str) -> Result<()> {
    courses(state)
        .update_one(
            doc! { "_id": course_id },
            doc! {
                "$pull": { field: { "id": item_id } },
                "$set": { "updated_at": bson::DateTime::from_chrono(Utc::now()) },
            },
        )
        .await?;
    Ok(())
}

async fn set_items(state: &AppState, course_id: &ObjectId, field: &str, items: bson::Bson) -> Result<()> {
    courses(state)
        .update_one(
            doc! { "_id": course_id },
            doc! { "$set": { field: items, "updated_at": bson::DateTime::from_chrono(Utc::now()) } },
        )
        .await?;
    Ok(())
}

/// Best effort; the course edit already succeeded.
async fn release_asset(state: &AppState, public_id: Option<&str>, kind: ResourceType) {
    let (Some(public_id), Some(cloudinary)) = (public_id, state.cloudinary.as_deref()) else {
        return;
    };
    if let Err(e) = cloudinary.delete(public_id, kind).await {
        tracing::warn!("Failed to delete Cloudinary asset {}: {}", public_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_filter_only_published() {
        let filter = catalog_filter(&CourseQuery {
            category: None,
            level: None,
        });
        assert_eq!(filter, doc! { "published": true });
    }

    #[test]
    fn test_catalog_filter_ignores_empty_values() {
        let filter = catalog_filter(&CourseQuery {
            category: Some("design".into()),
            level: Some(String::new()),
        });
        assert_eq!(filter, doc! { "published": true, "category": "design" });
    }
}
