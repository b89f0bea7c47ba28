//! TeamRadar menu-bar shell entry point.

mod app;
mod config;
mod console;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting TeamRadar shell"
    );

    let path = config::config_path()?;
    let config = config::Config::load_from(&path)?;
    tracing::info!(path = %path.display(), "configuration loaded");

    // One thread: tray events, exit events and toggles are serialized.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(app::run(config, path))?;

    tracing::info!("shell shut down cleanly");
    Ok(())
}
