// src/error.rs
use thiserror::Error;

/// Errors returned by the pool, the selection policies and the balancer.
///
/// None of them is fatal: the pool and the balancer stay usable after any
/// failed call, and the caller decides whether to retry or fail over.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadBalancerError {
    #[error("Server not found: {0}")]
    NotFound(String),

    #[error("Duplicate server id: {0}")]
    DuplicateId(String),

    #[error("No eligible servers ({total} registered, none healthy)")]
    NoEligibleServer { total: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, LoadBalancerError>;
