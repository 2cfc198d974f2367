use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::handlers::user_profile::{
    change_password, get_profile, get_settings, update_profile, update_settings, upload_avatar,
};
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

const AVATAR_BODY_LIMIT: usize = 12 * 1024 * 1024;

pub fn user_profile_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/password", put(change_password))
        .route("/settings", get(get_settings).put(update_settings))
        .route(
            "/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route_layer(from_fn_with_state(state.sessions.clone(), auth_middleware))
}
