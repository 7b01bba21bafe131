// src/load_balancer/algorithm.rs
use crate::proxy::{Backend, BackendPool};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait LoadBalancingStrategy: Send + Sync + std::fmt::Debug {
    /// Pick one backend from the pool's healthy snapshot. Returns `None`
    /// iff the snapshot is empty; never returns an unavailable backend.
    /// Safe for concurrent calls.
    async fn select_backend(&self, pool: &BackendPool) -> Option<Arc<Backend>>;

    fn name(&self) -> &'static str;
}
