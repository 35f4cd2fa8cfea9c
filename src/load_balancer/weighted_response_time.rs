// src/load_balancer/weighted_response_time.rs
use super::algorithm::{eligible, SelectionPolicy};
use super::context::RequestContext;
use crate::error::{LoadBalancerError, Result};
use crate::pool::Server;

/// Picks the healthy server with the lowest smoothed response time.
#[derive(Debug, Default)]
pub struct WeightedResponseTime;

impl WeightedResponseTime {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionPolicy for WeightedResponseTime {
    fn select<'a>(&self, snapshot: &'a [Server], _context: &RequestContext) -> Result<&'a Server> {
        eligible(snapshot)?
            .into_iter()
            .min_by(|a, b| {
                a.response_time_ms
                    .cmp(&b.response_time_ms)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .ok_or(LoadBalancerError::NoEligibleServer {
                total: snapshot.len(),
            })
    }

    fn name(&self) -> &'static str {
        "weighted_response_time"
    }
}
