// src/lib.rs
pub mod config;
pub mod error;
pub mod load_balancer;
pub mod pool;

pub use error::{LoadBalancerError, Result};
pub use load_balancer::{
    create_policy, DispatchResult, LoadBalancer, PolicyKind, RequestContext, SelectionPolicy,
};
pub use pool::{Server, ServerPool};
