// src/load_balancer/resource_based.rs
use super::algorithm::{eligible, SelectionPolicy};
use super::context::RequestContext;
use crate::error::{LoadBalancerError, Result};
use crate::pool::Server;
use std::cmp::Ordering;

/// Picks the healthy server with the lowest `current_load / capacity` ratio.
///
/// Ratios are compared by cross-multiplication in `u64`, which is exact for
/// every `u32` load and capacity.
#[derive(Debug, Default)]
pub struct ResourceBased;

impl ResourceBased {
    pub fn new() -> Self {
        Self
    }
}

fn compare_load_ratio(a: &Server, b: &Server) -> Ordering {
    let lhs = u64::from(a.current_load) * u64::from(b.capacity);
    let rhs = u64::from(b.current_load) * u64::from(a.capacity);
    lhs.cmp(&rhs)
}

impl SelectionPolicy for ResourceBased {
    fn select<'a>(&self, snapshot: &'a [Server], _context: &RequestContext) -> Result<&'a Server> {
        let servers = eligible(snapshot)?;

        if let Some(server) = servers.iter().find(|s| s.capacity == 0) {
            return Err(LoadBalancerError::InvalidConfiguration(format!(
                "server {} has zero capacity",
                server.id
            )));
        }

        servers
            .into_iter()
            .min_by(|a, b| compare_load_ratio(a, b).then_with(|| a.id.cmp(&b.id)))
            .ok_or(LoadBalancerError::NoEligibleServer {
                total: snapshot.len(),
            })
    }

    fn name(&self) -> &'static str {
        "resource_based"
    }
}
