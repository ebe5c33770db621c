// Social graph API server

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use social_graph::{app_state::AppState, config::Config, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("social_graph=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    let app = create_router(app_state);

    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Social graph API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
