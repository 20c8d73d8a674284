// Route table: two tiers, public and protected (JWT auth).
pub mod articles;
pub mod users;

use axum::http::HeaderValue;
use axum::routing::{get, patch, post, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config;
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Stored cover images are served as plain static files.
        .nest_service("/uploads", ServeDir::new(&config::config().uploads.root))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser access is limited to the configured origins (CORS_ORIGINS or the
/// per-environment defaults).
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/articles", get(articles::list_articles))
        .route("/api/articles/:id", get(articles::get_article))
        .route("/api/users/register", post(users::register))
        .route("/api/users/login", post(users::login))
        .route("/api/users/:id", get(users::get_user))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/articles", post(articles::create_article))
        .route("/api/articles/mine", get(articles::my_articles))
        .route(
            "/api/articles/:id",
            put(articles::update_article).delete(articles::delete_article),
        )
        .route("/api/articles/:id/pin", patch(articles::pin_article))
        .route("/api/users/me", get(users::me).put(users::update_me))
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id/role", put(users::update_role))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Inkwell API",
            "version": version,
            "description": "Blog platform backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "articles": "/api/articles[/:id] (read public, write protected)",
                "pin": "/api/articles/:id/pin (admin)",
                "mine": "/api/articles/mine (protected)",
                "register": "/api/users/register (public)",
                "login": "/api/users/login (public)",
                "profile": "/api/users/me (protected)",
                "users": "/api/users[/:id] (read public, admin listing)",
                "uploads": "/uploads/* (public static)",
            },
        },
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": { "status": "healthy" },
    }))
}
