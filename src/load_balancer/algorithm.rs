// src/load_balancer/algorithm.rs
use super::context::RequestContext;
use crate::error::{LoadBalancerError, Result};
use crate::pool::Server;

/// Decision logic that picks one server out of a pool snapshot.
///
/// Only healthy servers are eligible. When the snapshot is empty or nothing
/// in it is healthy, implementations fail with
/// [`LoadBalancerError::NoEligibleServer`] instead of falling back to an
/// unhealthy server.
pub trait SelectionPolicy: Send + Sync {
    fn select<'a>(&self, snapshot: &'a [Server], context: &RequestContext) -> Result<&'a Server>;

    fn name(&self) -> &'static str;
}

pub use crate::config::PolicyKind;

/// Healthy servers of `snapshot`, in snapshot order.
pub(crate) fn eligible(snapshot: &[Server]) -> Result<Vec<&Server>> {
    let healthy: Vec<&Server> = snapshot.iter().filter(|s| s.healthy).collect();

    if healthy.is_empty() {
        return Err(LoadBalancerError::NoEligibleServer {
            total: snapshot.len(),
        });
    }

    Ok(healthy)
}
