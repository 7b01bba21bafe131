// src/load_balancer/least_connections.rs
use crate::load_balancer::LoadBalancingStrategy;
use crate::proxy::{Backend, BackendPool};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastConnections {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoadBalancingStrategy for LeastConnections {
    async fn select_backend(&self, pool: &BackendPool) -> Option<Arc<Backend>> {
        let backends = pool.healthy_snapshot();

        // Counter reads are a best-effort snapshot; they may move during
        // the scan. Ties go to the earliest backend in insertion order.
        backends
            .iter()
            .min_by_key(|backend| backend.connections())
            .cloned()
    }

    fn name(&self) -> &'static str {
        "least_connections"
    }
}
