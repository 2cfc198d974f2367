use std::net::SocketAddr;

use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use mongodb::bson::doc;
use serde_json::{json, Value};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod database;
mod dtos;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod tasks;
mod utils;

use config::AppConfig;
use database::connection::{ensure_indexes, get_db_client};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("⚙️ Configuration loaded: {}", config.get_config_info());

    let db = get_db_client(&config).await?;
    ensure_indexes(&db).await?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app_state = AppState::new(db, config);
    tasks::spawn_all(&app_state);

    let app = build_router(app_state);
    start_server(app, addr).await
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/auth", routes::auth::routes(&app_state))
        .nest("/api", routes::auth_otp_routes::auth_otp_routes())
        .nest("/api/courses", routes::courses::course_routes(&app_state))
        .nest("/api/certificates", routes::certificates::certificate_routes(&app_state))
        .nest("/api/tickets", routes::tickets::ticket_routes(&app_state))
        .nest("/api/updates", routes::updates::update_routes(&app_state))
        .nest("/api/profile", routes::user_profile::user_profile_routes(&app_state))
        .nest("/api/admin", routes::admin::admin_routes(&app_state))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("🚀 Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind to {}: {}", addr, e);
        e
    })?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root_handler() -> &'static str {
    "🎓 LearnHub API"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.run_command(doc! {"ping": 1}).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!("Database ping failed: {}", e);
            "disconnected"
        }
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "cloudinary": state.cloudinary.is_some(),
        "google_login": state.google.is_some(),
        "sms": state.config.sms.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
