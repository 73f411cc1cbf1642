// AI control service
// Spawns an AI player into a game session on request
//
// Usage: cargo run --bin pong-ai-server

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pong_ai::ai::PolicyService;
use pong_ai::config::load_config;
use pong_ai::control::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config().context("failed to load configuration")?;
    let policies = PolicyService::load(&config.policy);
    if !policies.is_ready() {
        info!("Starting without a usable policy; /health will report unavailable");
    }

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("🚀 AI control service listening on {}", addr);
    info!(game_service = %config.client.game_service_url, "Players will connect to game service");

    let app = build_router(AppState::new(policies, config.client));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
