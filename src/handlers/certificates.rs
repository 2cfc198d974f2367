use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Collection;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::handlers::courses::COURSES_COLLECTION;
use crate::models::certificate::{
    is_well_formed_hash, verification_hash, AdminIssueCertificate, Certificate,
    CertificateResponse, GenerateCertificate,
};
use crate::models::course::Course;
use crate::models::user::{Claims, User};
use crate::state::AppState;

pub const CERTIFICATES_COLLECTION: &str = "certificates";

fn certificates(state: &AppState) -> Collection<Certificate> {
    state.db.collection(CERTIFICATES_COLLECTION)
}

async fn issue(state: &AppState, user: &User, course: &Course) -> Result<Certificate> {
    let user_id = user.id.ok_or_else(|| AppError::not_found("User"))?;
    let course_id = course.id.ok_or_else(|| AppError::not_found("Course"))?;

    let existing = certificates(state)
        .find_one(doc! { "user_id": user_id, "course_id": course_id })
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("Certificate already issued for this course"));
    }

    let issued_at = Utc::now();
    let mut cert = Certificate {
        id: None,
        user_id,
        user_name: user.name.clone(),
        user_email: user.email.clone(),
        course_id,
        course_title: course.title.clone(),
        verification_hash: verification_hash(
            &user_id,
            &course_id,
            issued_at,
            &Uuid::new_v4().to_string(),
        ),
        issued_at,
    };

    // The unique (user_id, course_id) index settles concurrent requests.
    let result = certificates(state)
        .insert_one(&cert)
        .await
        .map_err(|e| AppError::from_write(e, "Certificate"))?;
    cert.id = result.inserted_id.as_object_id();

    tracing::info!(
        "🎓 Certificate {} issued to {} for {}",
        cert.verification_hash,
        user_id,
        course.title
    );
    Ok(cert)
}

async fn load_course(state: &AppState, id: &ObjectId) -> Result<Course> {
    state
        .db
        .collection::<Course>(COURSES_COLLECTION)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Course"))
}

pub async fn generate_certificate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateCertificate>,
) -> Result<Json<CertificateResponse>> {
    let course_id = ObjectId::parse_str(payload.course_id.trim())?;
    let user = state.accounts.find_by_id(&claims.user_id()?).await?;

    if !user.is_enrolled(&course_id) {
        return Err(AppError::forbidden("You are not enrolled in this course"));
    }

    let course = load_course(&state, &course_id).await?;
    let cert = issue(&state, &user, &course).await?;
    Ok(Json(CertificateResponse::from(cert)))
}

pub async fn my_certificates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CertificateResponse>>> {
    let found: Vec<Certificate> = certificates(&state)
        .find(doc! { "user_id": claims.user_id()? })
        .sort(doc! { "issued_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(CertificateResponse::from).collect()))
}

/// Public check of a printed verification code.
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<CertificateResponse>> {
    let hash = hash.trim().to_uppercase();
    if !is_well_formed_hash(&hash) {
        return Err(AppError::invalid_data("Malformed verification code"));
    }

    let cert = certificates(&state)
        .find_one(doc! { "verification_hash": &hash })
        .await?
        .ok_or_else(|| AppError::not_found("Certificate"))?;

    Ok(Json(CertificateResponse::from(cert)))
}

pub async fn admin_list_certificates(
    State(state): State<AppState>,
) -> Result<Json<Vec<CertificateResponse>>> {
    let found: Vec<Certificate> = certificates(&state)
        .find(doc! {})
        .sort(doc! { "issued_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(found.into_iter().map(CertificateResponse::from).collect()))
}

/// Issues without the enrollment check.
pub async fn admin_issue_certificate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AdminIssueCertificate>,
) -> Result<Json<CertificateResponse>> {
    let user_id = ObjectId::parse_str(payload.user_id.trim())?;
    let course_id = ObjectId::parse_str(payload.course_id.trim())?;

    let user = state.accounts.find_by_id(&user_id).await?;
    let course = load_course(&state, &course_id).await?;

    let cert = issue(&state, &user, &course).await?;
    tracing::info!("Admin {} issued certificate {}", claims.sub, cert.verification_hash);
    Ok(Json(CertificateResponse::from(cert)))
}
