use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use hotelbook::catalog::HotelCatalog;
use hotelbook::config::Config;
use hotelbook::ledger::Ledger;
use hotelbook::notify::NotifyHub;
use hotelbook::server::{self, Limits};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    hotelbook::observability::init(config.metrics_port);

    let catalog = Arc::new(HotelCatalog::load(&config.catalog_path)?);
    info!("loaded {} hotels from {}", catalog.len(), config.catalog_path.display());
    let ledger = Arc::new(Ledger::new(catalog, Arc::new(NotifyHub::new())));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("hotelbook listening on {addr}");
    info!("  max_connections: {}", config.max_connections);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async move {
        #[cfg(unix)]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        #[cfg(not(unix))]
        tokio::signal::ctrl_c().await.ok();
    };

    let limits = Limits {
        max_connections: config.max_connections,
        drain_timeout: config.drain_timeout,
    };
    server::serve(listener, ledger, limits, shutdown).await;

    info!("hotelbook stopped");
    Ok(())
}
