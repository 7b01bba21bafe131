// src/proxy/mod.rs
mod backend;
mod pool;
mod proxy;

pub use backend::{Backend, BackendUrlError, ConnectionGuard};
pub use pool::BackendPool;
pub use proxy::{Proxy, ProxyError};
