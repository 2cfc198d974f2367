use axum::{
    extract::{Multipart, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use mongodb::bson::{self, doc};
use mongodb::Collection;
use validator::Validate;

use crate::dtos::auth_dtos::MessageResponse;
use crate::dtos::profile_dtos::{
    ChangePasswordRequest, UpdateProfileRequest, UpdateSettingsRequest, THEMES,
};
use crate::errors::{AppError, Result};
use crate::handlers::upload::{check_size, public_id_for, read_file_field, sniff, FileKind};
use crate::models::user::{Claims, User, UserResponse, UserSettings};
use crate::services::cloudinary::ResourceType;
use crate::services::user_store::USERS_COLLECTION;
use crate::state::AppState;
use crate::utils::identifier::require_mobile;

fn users(state: &AppState) -> Collection<User> {
    state.db.collection(USERS_COLLECTION)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>> {
    let user = state.accounts.find_by_id(&claims.user_id()?).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    let user = state.accounts.find_by_id(&user_id).await?;

    let mut set = doc! { "updated_at": bson::DateTime::from_chrono(Utc::now()) };

    if let Some(name) = payload.name {
        set.insert("name", name.trim());
    }
    if let Some(bio) = payload.bio {
        set.insert("bio", bio.trim());
    }
    if let Some(city) = payload.city {
        set.insert("city", city.trim());
    }
    if let Some(mobile) = payload.mobile {
        let mobile = require_mobile(&mobile)?;
        if mobile != user.mobile {
            let taken = users(&state)
                .find_one(doc! { "mobile": &mobile, "_id": { "$ne": user_id } })
                .await?;
            if taken.is_some() {
                return Err(AppError::conflict("Mobile number is already registered"));
            }
            set.insert("mobile", mobile);
        }
    }

    users(&state)
        .update_one(doc! { "_id": user_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::from_write(e, "Mobile number"))?;

    let user = state.accounts.find_by_id(&user_id).await?;
    tracing::info!("👤 Profile updated for {}", claims.sub);
    Ok(Json(UserResponse::from(user)))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;

    let user = state.accounts.find_by_id(&claims.user_id()?).await?;
    state
        .accounts
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;

    tracing::info!("🔑 Password changed for {}", claims.sub);
    Ok(Json(MessageResponse::ok("Password changed successfully")))
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserSettings>> {
    let user = state.accounts.find_by_id(&claims.user_id()?).await?;
    Ok(Json(user.settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<UserSettings>> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    let mut settings = state.accounts.find_by_id(&user_id).await?.settings;

    if let Some(theme) = payload.theme {
        if !THEMES.contains(&theme.as_str()) {
            return Err(AppError::invalid_data(format!(
                "Theme must be one of: {}",
                THEMES.join(", ")
            )));
        }
        settings.theme = theme;
    }
    if let Some(language) = payload.language {
        settings.language = language.to_lowercase();
    }
    if let Some(email) = payload.email_notifications {
        settings.email_notifications = email;
    }
    if let Some(sms) = payload.sms_notifications {
        settings.sms_notifications = sms;
    }

    users(&state)
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": {
                "settings": bson::to_bson(&settings)?,
                "updated_at": bson::DateTime::from_chrono(Utc::now()),
            } },
        )
        .await?;

    Ok(Json(settings))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>> {
    let cloudinary = state.cloudinary()?;
    let user_id = claims.user_id()?;
    let file = read_file_field(&mut multipart).await?;

    let (kind, content_type) = sniff(&file.data)?;
    if kind != FileKind::Image {
        return Err(AppError::UnsupportedFile("Avatar must be an image".to_string()));
    }
    check_size(kind, file.data.len(), state.config.max_upload_mb)?;

    let public_id = format!("avatar_{}", user_id.to_hex());
    let asset = cloudinary
        .upload(
            file.data.to_vec(),
            &public_id_for(&file.file_name),
            content_type,
            ResourceType::Image,
            "learnhub/avatars",
            Some(&public_id),
        )
        .await?;

    users(&state)
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": {
                "avatar_url": &asset.url,
                "updated_at": bson::DateTime::from_chrono(Utc::now()),
            } },
        )
        .await?;

    tracing::info!("🖼️ Avatar updated for {}", claims.sub);
    let user = state.accounts.find_by_id(&user_id).await?;
    Ok(Json(UserResponse::from(user)))
}
