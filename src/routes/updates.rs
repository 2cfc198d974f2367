use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::handlers::updates;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn update_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(updates::get_feed))
        .route("/read-all", post(updates::mark_all_read))
        .route("/:id/read", post(updates::mark_read))
        .route_layer(from_fn_with_state(state.sessions.clone(), auth_middleware))
}
