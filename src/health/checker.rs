// src/health/checker.rs
use crate::proxy::{Backend, BackendPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

/// Per-probe TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport-level liveness prober. Sweeps every backend on a fixed
/// interval; a probe is a bare TCP connect, nothing content-level.
/// Availability updates go through the pool so the healthy snapshot is
/// republished on each transition.
pub struct HealthChecker {
    pool: Arc<BackendPool>,
    interval: Duration,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl HealthChecker {
    pub fn new(pool: Arc<BackendPool>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        Self {
            pool,
            interval,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Sweep once immediately, then keep sweeping on the interval from a
    /// background task until `shutdown` is called.
    pub async fn start(self: Arc<Self>) {
        self.sweep().await;

        let checker = Arc::clone(&self);
        tokio::spawn(async move {
            checker.run().await;
        });

        info!(interval = ?self.interval, "health checker started");
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn run(&self) {
        let mut ticker = interval(self.interval);
        // An interval's first tick completes immediately; the initial
        // sweep already ran, so consume it.
        ticker.tick().await;

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("health checker stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Launch one probe task per backend and return without waiting for
    /// them. Overlapping sweeps are permitted; status writes are
    /// idempotent at the pool level.
    pub async fn sweep(&self) {
        for backend in self.pool.snapshot_all().await {
            let pool = Arc::clone(&self.pool);
            tokio::spawn(async move {
                probe(pool, backend).await;
            });
        }
    }

    /// Sequential sweep; returns once every backend has been probed.
    pub async fn check_once(&self) {
        for backend in self.pool.snapshot_all().await {
            probe(Arc::clone(&self.pool), backend).await;
        }
    }
}

/// One connectivity check against one backend. Only transitions are
/// logged; repeat confirmations stay quiet.
async fn probe(pool: Arc<BackendPool>, backend: Arc<Backend>) {
    let address = backend.probe_address();
    debug!(backend = backend.url_str(), address, "probing");

    match timeout(CONNECT_TIMEOUT, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            if pool.set_status(&backend, true).await {
                info!(backend = backend.url_str(), "backend is up");
            }
        }
        Ok(Err(err)) => {
            if pool.set_status(&backend, false).await {
                warn!(backend = backend.url_str(), error = %err, "backend is down");
            }
        }
        Err(_) => {
            if pool.set_status(&backend, false).await {
                warn!(backend = backend.url_str(), "backend is down: connect timed out");
            }
        }
    }
}
