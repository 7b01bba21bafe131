// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use crate::server::listener::bind_tcp;
use anyhow::Result;
use hyper::server::conn::Http;
use hyper::{Body, Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tower::Service;
use tracing::{error, info};

/// Bound on reading a request head from an inbound connection.
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Accept-loop server. `main.rs` injects a handler factory; one handler is
/// built per connection, since the handler carries the peer address for
/// the forwarded-header rewrite.
pub struct ServerBuilder<F> {
    addr: SocketAddr,
    make_handler: Option<F>,
}

impl<F, S> ServerBuilder<F>
where
    F: Fn(SocketAddr) -> S,
    S: Service<Request<Body>, Response = Response<Body>> + Send + 'static,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    S::Future: Send + 'static,
{
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            make_handler: None,
        }
    }

    /// Inject the per-connection handler factory (usually wraps
    /// `proxy::Proxy`).
    pub fn with_handler_factory(mut self, make_handler: F) -> Self {
        self.make_handler = Some(make_handler);
        self
    }

    /// Consume the builder, boot the TCP listener, spawn one Hyper task
    /// per connection. Stops accepting when `shutdown` resolves; in-flight
    /// connections drain on their own.
    pub async fn serve_with_shutdown(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let make_handler = match self.make_handler {
            Some(factory) => factory,
            None => anyhow::bail!("handler factory must be set via with_handler_factory()"),
        };

        // 1️⃣ Bind the TCP socket (plain HTTP/1.1; backends' TLS is the
        // client connector's business).
        let listener = bind_tcp(self.addr).await?;
        info!("HTTP server listening on {}", self.addr);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            error!(%err, "failed to accept connection");
                            continue;
                        }
                    };

                    let svc = make_handler(peer);

                    // 2️⃣ Spawn one Tokio task per connection.
                    tokio::spawn(async move {
                        let mut http = Http::new();
                        http.http1_keep_alive(true);
                        http.http1_header_read_timeout(HEADER_READ_TIMEOUT);

                        if let Err(err) = http.serve_connection(stream, svc).await {
                            tracing::debug!(%peer, %err, "connection error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        Ok(())
    }
}
