use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, certificates, courses, tickets, updates, upload};
use crate::middleware::auth::{admin_middleware, auth_middleware};
use crate::state::AppState;

pub fn admin_routes(state: &AppState) -> Router<AppState> {
    // Multipart framing on top of the largest accepted file.
    let upload_limit = (state.config.max_upload_mb + 1) * 1024 * 1024;

    Router::new()
        // Users
        .route("/users", get(admin::list_users))
        .route("/users/:id/role", put(admin::set_role))
        .route("/stats", get(admin::stats))

        // Courses and their content
        .route(
            "/courses",
            get(courses::admin_list_courses).post(courses::create_course),
        )
        .route(
            "/courses/:id",
            get(courses::admin_get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/courses/:id/videos", post(courses::add_video))
        .route("/courses/:id/videos/reorder", put(courses::reorder_videos))
        .route("/courses/:id/videos/:video_id", delete(courses::remove_video))
        .route("/courses/:id/pdfs", post(courses::add_pdf))
        .route("/courses/:id/pdfs/reorder", put(courses::reorder_pdfs))
        .route("/courses/:id/pdfs/:pdf_id", delete(courses::remove_pdf))

        // Certificates
        .route(
            "/certificates",
            get(certificates::admin_list_certificates).post(certificates::admin_issue_certificate),
        )

        // Tickets
        .route("/tickets", get(tickets::admin_list_tickets))
        .route("/tickets/:id/status", put(tickets::admin_set_status))

        // Updates
        .route("/updates", post(updates::create_update))
        .route("/updates/:id", delete(updates::delete_update))

        // Media
        .route(
            "/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(from_fn(admin_middleware))
        .route_layer(from_fn_with_state(state.sessions.clone(), auth_middleware))
}
