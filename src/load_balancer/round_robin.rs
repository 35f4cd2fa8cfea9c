// src/load_balancer/round_robin.rs
use super::algorithm::{eligible, SelectionPolicy};
use super::context::RequestContext;
use crate::error::Result;
use crate::pool::Server;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cycles through the healthy servers in snapshot order.
///
/// The cursor is shared by every dispatch and taken modulo the current number
/// of healthy servers, so fairness across pool size changes is best effort.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of selections made so far.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl SelectionPolicy for RoundRobin {
    fn select<'a>(&self, snapshot: &'a [Server], _context: &RequestContext) -> Result<&'a Server> {
        let servers = eligible(snapshot)?;

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % servers.len();
        Ok(servers[index])
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
