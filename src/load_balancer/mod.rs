// src/load_balancer/mod.rs
mod algorithm;
mod balancer;
mod context;
mod least_connection;
mod resource_based;
mod round_robin;
mod source_ip_hash;
mod weighted_response_time;

pub use algorithm::{PolicyKind, SelectionPolicy};
pub use balancer::{BalancerOptions, DispatchStatsSnapshot, LoadBalancer};
pub use context::{DispatchResult, RequestContext};
pub use least_connection::LeastConnection;
pub use resource_based::ResourceBased;
pub use round_robin::RoundRobin;
pub use source_ip_hash::{fnv1a64, SourceIpHash};
pub use weighted_response_time::WeightedResponseTime;

pub fn create_policy(kind: PolicyKind) -> Box<dyn SelectionPolicy> {
    match kind {
        PolicyKind::RoundRobin => Box::new(RoundRobin::new()),
        PolicyKind::LeastConnection => Box::new(LeastConnection::new()),
        PolicyKind::WeightedResponseTime => Box::new(WeightedResponseTime::new()),
        PolicyKind::ResourceBased => Box::new(ResourceBased::new()),
        PolicyKind::SourceIpHash => Box::new(SourceIpHash::new()),
    }
}
