//! Wormo - multiplayer worm game server binary

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Wormo Game Server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!(
        "  Grid: {}x{} (level multiplier {})",
        config.grid.width, config.grid.height, config.grid.level_multiplier
    );
    info!("  Move interval: {}ms", config.movement.interval_ms);

    server::run(config).await?;

    Ok(())
}
