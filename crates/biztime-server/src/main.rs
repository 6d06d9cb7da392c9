use std::error::Error;

use tracing_subscriber::EnvFilter;

use biztime_server::config::Config;
use biztime_server::{AppState, app, db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let database = db::Database::new(&config.database_url, config.max_connections).await?;
    let state = AppState { db: database };

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "biztime server listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
