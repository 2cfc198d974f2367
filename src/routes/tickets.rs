use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::handlers::tickets;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn ticket_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(tickets::create_ticket))
        .route("/mine", get(tickets::my_tickets))
        .route("/:id", get(tickets::get_ticket))
        .route("/:id/replies", post(tickets::reply_to_ticket))
        .route_layer(from_fn_with_state(state.sessions.clone(), auth_middleware))
}
