use anyhow::Context;
use tokio::net::TcpListener;

use estimate_rag::core::logging;
use estimate_rag::server::router::router;
use estimate_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize();
    logging::init(&state.config.log_dir);

    tracing::info!("Starting up — ensuring vector collection exists");
    state
        .store
        .ensure_collection()
        .await
        .context("Failed to ensure vector collection")?;
    tracing::info!("Startup complete");

    let bind_addr = format!("0.0.0.0:{}", state.config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await.context("Server error")?;

    Ok(())
}
