// src/proxy/pool.rs
use super::backend::Backend;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// The set of configured backends. Structure is fixed after bootstrap
/// (append-only, insertion order preserved); only member availability
/// changes at runtime.
///
/// The healthy subset is republished as an immutable snapshot on every
/// availability transition, so the dispatch path reads it without taking
/// any lock.
pub struct BackendPool {
    backends: RwLock<Vec<Arc<Backend>>>,
    by_url: DashMap<String, Arc<Backend>>,
    healthy: ArcSwap<Vec<Arc<Backend>>>,
}

impl BackendPool {
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(Vec::new()),
            by_url: DashMap::new(),
            healthy: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append a backend and refresh the healthy snapshot. Bootstrap only.
    pub async fn add(&self, backend: Arc<Backend>) {
        let mut backends = self.backends.write().await;
        self.by_url
            .insert(backend.url_str().to_string(), Arc::clone(&backend));
        backends.push(backend);
        self.publish_healthy(&backends);
    }

    /// Independent copy of the full sequence; callers iterate without
    /// holding the pool lock.
    pub async fn snapshot_all(&self) -> Vec<Arc<Backend>> {
        self.backends.read().await.clone()
    }

    /// The currently-available backends, in insertion order. Lock-free;
    /// staleness is bounded by the next status transition.
    pub fn healthy_snapshot(&self) -> Arc<Vec<Arc<Backend>>> {
        self.healthy.load_full()
    }

    /// Flip a backend's availability. A no-op when the value is unchanged;
    /// returns whether a transition happened. Transitions rebuild the
    /// healthy snapshot under the write lock and publish it atomically, so
    /// readers never observe a partially built list.
    pub async fn set_status(&self, backend: &Arc<Backend>, alive: bool) -> bool {
        let backends = self.backends.write().await;
        if backend.is_alive() == alive {
            return false;
        }
        backend.set_alive(alive);
        self.publish_healthy(&backends);
        true
    }

    /// `set_status` addressed by configured URL string. Unknown URLs are
    /// ignored.
    pub async fn mark_status_by_url(&self, url: &str, alive: bool) -> bool {
        // Index keys are normalized URL strings; normalize the caller's
        // spelling the same way before looking it up.
        let key = Url::parse(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        let backend = match self.by_url.get(&key) {
            Some(entry) => Arc::clone(entry.value()),
            None => return false,
        };
        self.set_status(&backend, alive).await
    }

    pub async fn size(&self) -> usize {
        self.backends.read().await.len()
    }

    pub async fn healthy_count(&self) -> usize {
        self.backends
            .read()
            .await
            .iter()
            .filter(|b| b.is_alive())
            .count()
    }

    fn publish_healthy(&self, backends: &[Arc<Backend>]) {
        let healthy: Vec<Arc<Backend>> = backends
            .iter()
            .filter(|b| b.is_alive())
            .cloned()
            .collect();
        self.healthy.store(Arc::new(healthy));
    }
}

impl Default for BackendPool {
    fn default() -> Self {
        Self::new()
    }
}
