// ────────────────────────────────
// src/proxy/proxy.rs
// Request dispatch: select a backend, rewrite, forward, stream back
// ────────────────────────────────

use super::backend::{Backend, ConnectionGuard};
use super::pool::BackendPool;
use crate::load_balancer::LoadBalancingStrategy;

use futures::Stream;
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{self, HeaderValue};
use hyper::http::uri::Scheme;
use hyper::{Body, Client, Request, Response, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct Proxy {
    pool: Arc<BackendPool>,
    strategy: Arc<dyn LoadBalancingStrategy>,
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Proxy {
    pub fn new(pool: Arc<BackendPool>, strategy: Arc<dyn LoadBalancingStrategy>) -> Self {
        // One shared client; the connector follows each backend URL's
        // scheme, so https upstreams are honored transparently.
        let https = HttpsConnector::new();
        let client = Client::builder().build::<_, Body>(https);

        Self {
            pool,
            strategy,
            client,
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Dispatch one inbound request. Response bodies stream through
    /// without buffering; the selected backend's connection counter stays
    /// raised until the response stream is finished or dropped.
    pub async fn handle(
        &self,
        mut req: Request<Body>,
        client_addr: SocketAddr,
        inbound_scheme: Scheme,
    ) -> Result<Response<Body>, ProxyError> {
        let backend = self
            .strategy
            .select_backend(&self.pool)
            .await
            .ok_or(ProxyError::NoHealthyBackends)?;

        let guard = ConnectionGuard::new(Arc::clone(&backend));
        let request_id = Uuid::new_v4();

        debug!(
            %request_id,
            backend = backend.url_str(),
            connections = backend.connections(),
            strategy = self.strategy.name(),
            method = %req.method(),
            path = req.uri().path(),
            "forwarding request"
        );

        rewrite_request(&mut req, &backend, client_addr, &inbound_scheme)?;

        match self.client.request(req).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                let body = Body::wrap_stream(GuardedBody::new(body, guard));
                Ok(Response::from_parts(parts, body))
            }
            Err(err) => {
                warn!(
                    %request_id,
                    backend = backend.url_str(),
                    error = %err,
                    "upstream request failed, marking backend down"
                );
                // Flag write only: the healthy snapshot stays stale until
                // the next pool-mediated transition (the prober's sweep).
                backend.set_alive(false);
                Err(ProxyError::Upstream(err))
            }
        }
    }
}

/// Point the request at the backend and stamp the forwarding headers.
fn rewrite_request(
    req: &mut Request<Body>,
    backend: &Backend,
    client_addr: SocketAddr,
    inbound_scheme: &Scheme,
) -> Result<(), ProxyError> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let uri = Uri::builder()
        .scheme(backend.url().scheme())
        .authority(backend.authority())
        .path_and_query(path_and_query)
        .build()?;

    if !req.headers().contains_key("x-forwarded-host") {
        if let Some(host) = req.headers().get(header::HOST).cloned() {
            req.headers_mut().insert("x-forwarded-host", host);
        }
    }

    let client = client_addr.to_string();
    let forwarded_for = match req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        Some(prior) => format!("{}, {}", prior, client),
        None => client,
    };
    req.headers_mut().insert(
        "x-forwarded-for",
        HeaderValue::from_str(&forwarded_for).map_err(hyper::http::Error::from)?,
    );

    let proto = if *inbound_scheme == Scheme::HTTPS {
        "https"
    } else {
        "http"
    };
    req.headers_mut()
        .insert("x-forwarded-proto", HeaderValue::from_static(proto));

    req.headers_mut().insert(
        header::HOST,
        HeaderValue::from_str(backend.authority()).map_err(hyper::http::Error::from)?,
    );

    *req.uri_mut() = uri;

    Ok(())
}

/// Response-body passthrough that owns the connection guard, so the
/// paired counter decrement lands when the stream finishes or is dropped,
/// not when the handler returns. A mid-stream upstream error also demotes
/// the backend.
struct GuardedBody {
    inner: Body,
    guard: ConnectionGuard,
}

impl GuardedBody {
    fn new(inner: Body, guard: ConnectionGuard) -> Self {
        Self { inner, guard }
    }
}

impl Stream for GuardedBody {
    type Item = Result<Bytes, hyper::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_next(cx);

        if let Poll::Ready(Some(Err(err))) = &poll {
            warn!(
                backend = this.guard.backend().url_str(),
                error = %err,
                "upstream response stream failed, marking backend down"
            );
            this.guard.backend().set_alive(false);
        }

        poll
    }
}

// Custom error type for dispatch operations
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no healthy backends available")]
    NoHealthyBackends,

    #[error("failed to build upstream request: {0}")]
    Rewrite(#[from] hyper::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper::Error),
}

// Convert ProxyError to the client-facing response
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let (status, message) = match err {
            ProxyError::NoHealthyBackends => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
            }
            ProxyError::Rewrite(_) | ProxyError::Upstream(_) => {
                (StatusCode::BAD_GATEWAY, "Bad Gateway")
            }
        };

        Response::builder()
            .status(status)
            .body(Body::from(message))
            .unwrap()
    }
}
