use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::handlers::certificates;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn certificate_routes(state: &AppState) -> Router<AppState> {
    let owned = Router::new()
        .route("/", post(certificates::generate_certificate))
        .route("/mine", get(certificates::my_certificates))
        .route_layer(from_fn_with_state(state.sessions.clone(), auth_middleware));

    Router::new()
        .route("/verify/:hash", get(certificates::verify_certificate))
        .merge(owned)
}
