// src/load_balancer/round_robin.rs
use crate::load_balancer::LoadBalancingStrategy;
use crate::proxy::{Backend, BackendPool};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoadBalancingStrategy for RoundRobin {
    async fn select_backend(&self, pool: &BackendPool) -> Option<Arc<Backend>> {
        let backends = pool.healthy_snapshot();
        if backends.is_empty() {
            return None;
        }

        // The counter is never reset when the healthy set changes, so a
        // membership change can skip a position in the sequence.
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let index = (n % backends.len() as u64) as usize;

        Some(Arc::clone(&backends[index]))
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
