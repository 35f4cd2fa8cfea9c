// src/load_balancer/least_connection.rs
use super::algorithm::{eligible, SelectionPolicy};
use super::context::RequestContext;
use crate::error::{LoadBalancerError, Result};
use crate::pool::Server;

/// Picks the healthy server with the fewest load units; ties go to the
/// lowest id.
#[derive(Debug, Default)]
pub struct LeastConnection;

impl LeastConnection {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionPolicy for LeastConnection {
    fn select<'a>(&self, snapshot: &'a [Server], _context: &RequestContext) -> Result<&'a Server> {
        eligible(snapshot)?
            .into_iter()
            .min_by(|a, b| {
                a.current_load
                    .cmp(&b.current_load)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .ok_or(LoadBalancerError::NoEligibleServer {
                total: snapshot.len(),
            })
    }

    fn name(&self) -> &'static str {
        "least_connection"
    }
}
