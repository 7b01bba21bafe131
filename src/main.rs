// src/main.rs
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use pylon::{
    config::{self, Config},
    health::HealthChecker,
    load_balancer,
    proxy::{Backend, BackendPool, Proxy},
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pylon=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    info!(
        port = config.port,
        strategy = %config.strategy,
        backends = config.backends.len(),
        health_check_time = config.health_check_time,
        "configuration loaded"
    );

    // Create backend pool
    let pool = Arc::new(build_pool(&config).await?);

    // Resolve the balancing strategy
    let strategy = load_balancer::create_strategy(&config.strategy)?;
    info!("Using balancing strategy: {}", strategy.name());

    // Start the health checker
    let health_checker = Arc::new(HealthChecker::new(
        Arc::clone(&pool),
        config.health_check_interval(),
    ));
    Arc::clone(&health_checker).start().await;

    // Create the proxy and serve
    let proxy = Arc::new(Proxy::new(pool, strategy));

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Starting reverse proxy on {}", addr);

    ServerBuilder::new(addr)
        .with_handler_factory(move |peer| RequestHandler::new(Arc::clone(&proxy), peer))
        .serve_with_shutdown(shutdown_signal())
        .await?;

    health_checker.shutdown();
    info!("Server stopped gracefully");

    Ok(())
}

/// Build the pool from configuration. Entries with unparseable URLs are
/// logged and skipped; an empty result aborts bootstrap.
async fn build_pool(config: &Config) -> Result<BackendPool> {
    let pool = BackendPool::new();

    for backend_config in &config.backends {
        match Backend::new(&backend_config.url, backend_config.weight) {
            Ok(backend) => {
                info!(
                    "Added backend: {} (weight: {})",
                    backend_config.url,
                    backend.weight()
                );
                pool.add(Arc::new(backend)).await;
            }
            Err(err) => {
                warn!("Skipping invalid backend URL {}: {}", backend_config.url, err);
            }
        }
    }

    if pool.size().await == 0 {
        anyhow::bail!("no valid backends configured");
    }

    Ok(pool)
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
