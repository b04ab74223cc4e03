use anyhow::Result;
use skywatch::{MonitorConfig, OpenWeatherClient, WeatherMonitor};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = MonitorConfig::load()?;
    info!(
        "monitoring {} cities every {} minutes",
        config.cities.len(),
        config.polling.interval_minutes
    );
    if !config.has_credential() {
        warn!("no provider API key configured; fetches will fail until one is set");
    }

    let provider = Arc::new(OpenWeatherClient::new(&config)?);
    let mut monitor = WeatherMonitor::new(config, provider);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    monitor.run(shutdown_rx).await;
    info!("monitor stopped");
    Ok(())
}
