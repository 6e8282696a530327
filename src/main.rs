use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postpilot_backend_core::{
    handlers, health_check, initialize_app_state,
    middleware::{auth_middleware, dynamic_cors_middleware},
    services::{spawn_token_refresh_task, InstagramService},
    CONFIG,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postpilot_backend_core=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    println!("=== STARTING POSTPILOT BACKEND API ===");

    // Initialize pools, run migrations, build services
    println!("Initializing application state...");
    let state = match initialize_app_state().await {
        Ok(state) => {
            println!("✓ Application state initialized successfully");
            state
        },
        Err(e) => {
            println!("✗ Failed to initialize application state: {}", e);
            return Err(anyhow::anyhow!("Initialization failed: {}", e));
        },
    };

    // Proactive Instagram token refresh (tokens cannot be renewed once expired)
    let instagram_service = Arc::new(InstagramService::new(&state));
    spawn_token_refresh_task(instagram_service);

    // Routes behind the JWT middleware
    let protected = Router::new()
        .nest("/auth", handlers::protected_auth_routes())
        .nest("/instagram", handlers::instagram_routes())
        .nest("/posts", handlers::posts_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", handlers::auth_routes())
        .merge(protected);

    let app = Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn(dynamic_cors_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_address = CONFIG.bind_address.clone();
    info!("Starting PostPilot Backend API on {}", bind_address);
    println!("Starting HTTP server on {}...", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
