// HTTP handlers for PostPilot Backend

pub mod auth;
pub mod instagram;
pub mod posts;

use crate::app::AppState;
use axum::{
    routing::{get, post},
    Router,
};

// Public authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}

// Authentication routes behind the JWT middleware
pub fn protected_auth_routes() -> Router<AppState> {
    Router::new().route("/me", get(auth::get_current_user))
}

// Instagram integration routes (all require a session)
pub fn instagram_routes() -> Router<AppState> {
    Router::new()
        .route("/connect", post(instagram::connect_instagram))
        .route("/refresh", post(instagram::refresh_instagram_token))
        .route("/status", get(instagram::instagram_status))
        .route("/publish", post(instagram::publish_scheduled_post))
}

// Content routes (all require a session)
pub fn posts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(posts::create_post))
        .route("/schedule", post(posts::schedule_post))
        .route("/scheduled", get(posts::list_scheduled_posts))
}
