// src/server/handler.rs
use hyper::http::uri::Scheme;
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::Service;

use crate::proxy::Proxy;

/// Per-connection service. Carries the peer address and the scheme the
/// connection arrived on; both feed the forwarded-header rewrite.
#[derive(Clone)]
pub struct RequestHandler {
    proxy: Arc<Proxy>,
    client_addr: SocketAddr,
    scheme: Scheme,
}

impl RequestHandler {
    pub fn new(proxy: Arc<Proxy>, client_addr: SocketAddr) -> Self {
        // The listener terminates plain TCP; TLS termination is out of
        // scope, so inbound traffic is always http.
        Self {
            proxy,
            client_addr,
            scheme: Scheme::HTTP,
        }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let proxy = Arc::clone(&self.proxy);
        let client_addr = self.client_addr;
        let scheme = self.scheme.clone();

        Box::pin(async move {
            match proxy.handle(req, client_addr, scheme).await {
                Ok(response) => Ok(response),
                Err(err) => {
                    tracing::warn!(%err, "request not forwarded");
                    Ok(err.into())
                }
            }
        })
    }
}
