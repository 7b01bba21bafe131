// src/proxy/backend.rs
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum BackendUrlError {
    #[error("failed to parse URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

/// One upstream target. Identity (URL, weight) is fixed at construction;
/// availability and the in-flight connection counter are updated
/// concurrently at runtime.
#[derive(Debug)]
pub struct Backend {
    url: Url,
    weight: u32,
    authority: String,
    probe_address: String,

    // Runtime state
    alive: AtomicBool,
    connections: AtomicI64,
}

impl Backend {
    pub fn new(raw_url: &str, weight: u32) -> Result<Self, BackendUrlError> {
        let url = Url::parse(raw_url)?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(BackendUrlError::UnsupportedScheme(other.to_string())),
        }

        let host = url
            .host_str()
            .ok_or(BackendUrlError::MissingHost)?
            .to_string();

        // Authority exactly as configured; probe address with the scheme's
        // default port filled in (80 for http, 443 for https).
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };
        let probe_port = url.port_or_known_default().unwrap_or(80);
        let probe_address = format!("{}:{}", host, probe_port);

        Ok(Self {
            url,
            weight: weight.max(1),
            authority,
            probe_address,
            alive: AtomicBool::new(true),
            connections: AtomicI64::new(0),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Normalized URL string; backend identity within a pool.
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// `host` or `host:port` as written in the configured URL.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// `host:port` for transport-level probing.
    pub fn probe_address(&self) -> &str {
        &self.probe_address
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn increment_connections(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_connections(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connections(&self) -> i64 {
        self.connections.load(Ordering::Relaxed)
    }
}

/// RAII connection accounting: increments on creation, decrements exactly
/// once on drop, whichever way the request path exits.
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl ConnectionGuard {
    pub fn new(backend: Arc<Backend>) -> Self {
        backend.increment_connections();
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.decrement_connections();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_clamps_weight() {
        let backend = Backend::new("http://localhost:8081", 0).unwrap();
        assert_eq!(backend.weight(), 1);
        assert!(backend.is_alive());
        assert_eq!(backend.connections(), 0);
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(Backend::new("://nope", 1).is_err());
        assert!(matches!(
            Backend::new("ftp://files.example.com", 1),
            Err(BackendUrlError::UnsupportedScheme(_))
        ));
        assert!(Backend::new("http://", 1).is_err());
    }

    #[test]
    fn probe_address_defaults_port_by_scheme() {
        let http = Backend::new("http://api.example.com", 1).unwrap();
        assert_eq!(http.probe_address(), "api.example.com:80");

        let https = Backend::new("https://api.example.com", 1).unwrap();
        assert_eq!(https.probe_address(), "api.example.com:443");

        let explicit = Backend::new("https://api.example.com:8443", 1).unwrap();
        assert_eq!(explicit.probe_address(), "api.example.com:8443");
        assert_eq!(explicit.authority(), "api.example.com:8443");
    }

    #[test]
    fn connection_guard_balances_counter() {
        let backend = Arc::new(Backend::new("http://localhost:8081", 1).unwrap());

        {
            let _outer = ConnectionGuard::new(Arc::clone(&backend));
            assert_eq!(backend.connections(), 1);
            {
                let _inner = ConnectionGuard::new(Arc::clone(&backend));
                assert_eq!(backend.connections(), 2);
            }
            assert_eq!(backend.connections(), 1);
        }

        assert_eq!(backend.connections(), 0);
    }

    #[test]
    fn alive_flag_flips() {
        let backend = Backend::new("http://localhost:8081", 1).unwrap();
        backend.set_alive(false);
        assert!(!backend.is_alive());
        backend.set_alive(true);
        assert!(backend.is_alive());
    }
}
