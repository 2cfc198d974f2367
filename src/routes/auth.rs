use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let session = Router::new()
        .route("/me", get(auth::me))
        .route_layer(from_fn_with_state(state.sessions.clone(), auth_middleware));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/lookup", post(auth::lookup))
        .route("/google", post(auth::google_login))
        .merge(session)
}
