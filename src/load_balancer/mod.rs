// src/load_balancer/mod.rs
mod algorithm;
mod least_connections;
mod round_robin;
mod weighted;

pub use algorithm::LoadBalancingStrategy;
pub use least_connections::LeastConnections;
pub use round_robin::RoundRobin;
pub use weighted::Weighted;

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
#[error("unknown balancing strategy: {0}")]
pub struct UnknownStrategy(pub String);

/// Resolve a strategy name from configuration to an instance. Anything
/// outside the three known names (including the empty string) is an error.
pub fn create_strategy(name: &str) -> Result<Arc<dyn LoadBalancingStrategy>, UnknownStrategy> {
    match name {
        "round_robin" => Ok(Arc::new(RoundRobin::new())),
        "weighted" => Ok(Arc::new(Weighted::new())),
        "least_connections" => Ok(Arc::new(LeastConnections::new())),
        other => Err(UnknownStrategy(other.to_string())),
    }
}
