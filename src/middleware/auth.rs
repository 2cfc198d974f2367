use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::errors::{AppError, Result};
use crate::models::user::Claims;
use crate::services::session::SessionService;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the session token and makes its `Claims` available to handlers.
pub async fn auth_middleware(
    State(sessions): State<SessionService>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers()).ok_or(AppError::MissingSession)?;
    let claims = sessions.decode(token)?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Must run after `auth_middleware`.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or(AppError::MissingSession)?;

    if !claims.is_admin() {
        tracing::warn!("🚫 Non-admin {} attempted an admin route", claims.sub);
        return Err(AppError::forbidden("Admin access required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn,
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use mongodb::bson::oid::ObjectId;
    use tower::ServiceExt;

    use super::*;
    use crate::models::user::{AuthProvider, Role, User};

    fn token(sessions: &SessionService, role: Role) -> String {
        let mut user = User::new(
            "Asha",
            "asha@example.com",
            "9876543210",
            "$2b$04$hash",
            role,
            AuthProvider::Password,
        );
        user.id = Some(ObjectId::new());
        sessions.issue(&user).unwrap().0
    }

    fn app(sessions: SessionService) -> Router {
        let admin = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(from_fn(admin_middleware))
            .route_layer(from_fn_with_state(sessions.clone(), auth_middleware));

        Router::new()
            .route(
                "/me",
                get(|Extension(claims): Extension<Claims>| async move { claims.email }),
            )
            .route_layer(from_fn_with_state(sessions, auth_middleware))
            .merge(admin)
    }

    fn request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_is_unauthorized() {
        let sessions = SessionService::new("test-secret", 24);

        let res = app(sessions.clone()).oneshot(request("/me", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app(sessions).oneshot(request("/me", Some("garbage"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_session_reaches_handler() {
        let sessions = SessionService::new("test-secret", 24);
        let token = token(&sessions, Role::Student);

        let res = app(sessions).oneshot(request("/me", Some(&token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes_check_role() {
        let sessions = SessionService::new("test-secret", 24);

        let student = token(&sessions, Role::Student);
        let res = app(sessions.clone())
            .oneshot(request("/admin", Some(&student)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let admin = token(&sessions, Role::Admin);
        let res = app(sessions.clone())
            .oneshot(request("/admin", Some(&admin)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app(sessions).oneshot(request("/admin", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
