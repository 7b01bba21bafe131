// src/load_balancer/weighted.rs
use crate::load_balancer::LoadBalancingStrategy;
use crate::proxy::{Backend, BackendPool};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Smooth weighted round-robin. Each healthy backend carries a signed
/// "current weight"; every selection adds each backend's configured weight
/// to its current weight, picks the largest, and subtracts the weight total
/// from the winner. Long-run selection frequencies equal the weight ratios
/// without bursts.
///
/// State is keyed by backend URL string, so entries for backends that left
/// the healthy set can be dropped without holding references to them.
#[derive(Debug)]
pub struct Weighted {
    current_weights: Mutex<HashMap<String, i64>>,
}

impl Weighted {
    pub fn new() -> Self {
        Self {
            current_weights: Mutex::new(HashMap::new()),
        }
    }

    /// Clears the smoothing state. Test-facing.
    pub async fn reset(&self) {
        self.current_weights.lock().await.clear();
    }
}

impl Default for Weighted {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoadBalancingStrategy for Weighted {
    async fn select_backend(&self, pool: &BackendPool) -> Option<Arc<Backend>> {
        let backends = pool.healthy_snapshot();
        if backends.is_empty() {
            return None;
        }

        // Held for integer bookkeeping only; no I/O under the lock.
        let mut weights = self.current_weights.lock().await;

        // Drop entries for backends no longer in the healthy set; the map
        // never grows past the healthy-set size.
        if weights.len() > backends.len() {
            weights.retain(|url, _| backends.iter().any(|b| b.url_str() == url));
        }

        let total: i64 = backends.iter().map(|b| i64::from(b.weight())).sum();

        for backend in backends.iter() {
            *weights
                .entry(backend.url_str().to_string())
                .or_insert(0) += i64::from(backend.weight());
        }

        let mut selected: Option<&Arc<Backend>> = None;
        let mut max_weight = 0i64;
        for backend in backends.iter() {
            let current = weights.get(backend.url_str()).copied().unwrap_or(0);
            if current > max_weight {
                max_weight = current;
                selected = Some(backend);
            }
        }

        let selected = match selected {
            Some(backend) => backend,
            // No strictly positive current weight; degenerate edge case.
            None => return backends.first().cloned(),
        };

        if let Some(current) = weights.get_mut(selected.url_str()) {
            *current -= total;
        }

        Some(Arc::clone(selected))
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}
