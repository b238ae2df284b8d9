//! Phoenix Inference Gateway
//!
//! Serves the Gradio Space's predictions to the Phoenix front-end.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phoenix_inference::{config, create_router, inference::InferenceClient, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging (JSON lines in production)
    let json_logs = config.is_production();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "phoenix_inference=debug,phoenix_gateway=debug,tower_http=debug".into()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Phoenix Inference Gateway starting ({})...", config.environment);
    let client = InferenceClient::new(config.inference.clone())
        .context("Failed to create inference client")?;

    tracing::info!("Gradio Space: {}", client.base_url());

    if !client.health_check().await {
        tracing::warn!("Gradio Space is not reachable yet, requests will fail until it is");
    }

    let state = AppState {
        client: Arc::new(client),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
