use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::handlers::courses;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn course_routes(state: &AppState) -> Router<AppState> {
    let enrolled = Router::new()
        .route("/my", get(courses::my_courses))
        .route("/:id/enroll", post(courses::enroll))
        .route_layer(from_fn_with_state(state.sessions.clone(), auth_middleware));

    Router::new()
        .route("/", get(courses::list_courses))
        .route("/:id", get(courses::get_course))
        .merge(enrolled)
}
