use std::sync::Arc;

use inkwell_api::blob::FsBlobStore;
use inkwell_api::config;
use inkwell_api::handlers;
use inkwell_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwell_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting Inkwell API in {:?} mode", config.environment);

    let state = match std::env::var("DATABASE_URL") {
        Ok(url) => AppState::postgres(&url).await?,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is not persisted)");
            // Covers still land on disk so /uploads serves them.
            let mut state = AppState::in_memory();
            state.blobs = Arc::new(FsBlobStore::new(config.uploads.root.clone()));
            state
        }
    };

    let app = handlers::app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Inkwell API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
