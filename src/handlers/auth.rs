use axum::{extract::State, response::Json, Extension};
use validator::Validate;

use crate::dtos::auth_dtos::{
    GoogleLoginRequest, LoginRequest, LookupRequest, LookupResponse, RegisterRequest,
};
use crate::errors::{AppError, Result};
use crate::models::user::{AuthResponse, Claims, User, UserResponse};
use crate::services::account_service::NewAccount;
use crate::state::AppState;

/// Issues a session for `user` and wraps it in the login payload.
pub(crate) fn session_response(state: &AppState, user: User) -> Result<AuthResponse> {
    let (token, expires_at) = state.sessions.issue(&user)?;
    Ok(AuthResponse {
        user: UserResponse::from(user),
        token,
        expires_at,
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    let user = state
        .accounts
        .register(NewAccount {
            name: payload.name,
            email: payload.email,
            mobile: payload.mobile,
            password: payload.password,
        })
        .await?;

    Ok(Json(session_response(&state, user)?))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    let key = format!("login:{}", payload.identifier.trim().to_lowercase());
    state.rate_limiter.check(&key).await?;

    let user = state
        .accounts
        .authenticate(&payload.identifier, &payload.password)
        .await?;

    tracing::info!("🔓 Password login for {}", user.id_hex());
    Ok(Json(session_response(&state, user)?))
}

/// Tells the client which login flow applies to an identifier.
pub async fn lookup(
    State(state): State<AppState>,
    Json(payload): Json<LookupRequest>,
) -> Result<Json<LookupResponse>> {
    payload.validate()?;

    let (kind, user) = state.accounts.lookup(&payload.identifier).await?;
    Ok(Json(LookupResponse {
        kind,
        exists: user.is_some(),
    }))
}

pub async fn google_login(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    let google = state
        .google
        .as_deref()
        .ok_or_else(|| AppError::configuration("Google login is not configured"))?;

    let identity = google.verify_id_token(&payload.id_token).await?;
    let resolved = state.accounts.resolve_federated(identity).await?;

    if resolved.created {
        tracing::info!("🆕 Google signup {}", resolved.user.id_hex());
    }
    Ok(Json(session_response(&state, resolved.user)?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>> {
    let user = state.accounts.find_by_id(&claims.user_id()?).await?;
    Ok(Json(UserResponse::from(user)))
}
