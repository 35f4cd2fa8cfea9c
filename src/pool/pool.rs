// src/pool/pool.rs
use super::server::Server;
use crate::config::ServerConfig;
use crate::error::{LoadBalancerError, Result};
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared set of backends and their live load/health state.
///
/// The whole server list is kept behind an [`ArcSwap`]. Readers grab the
/// current list in one atomic load, writers clone it, apply their change and
/// publish the new list with read-copy-update, so a snapshot never observes a
/// half-applied update and concurrent writers never lose each other's changes.
pub struct ServerPool {
    servers: ArcSwap<Vec<Server>>,
}

impl ServerPool {
    pub fn new(servers: Vec<Server>) -> Result<Self> {
        if servers.is_empty() {
            return Err(LoadBalancerError::InvalidConfiguration(
                "server pool must contain at least one server".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(servers.len());
        for server in &servers {
            if !seen.insert(server.id.as_str()) {
                return Err(LoadBalancerError::DuplicateId(server.id.clone()));
            }
        }

        tracing::info!("Created server pool with {} servers", servers.len());

        Ok(Self {
            servers: ArcSwap::from_pointee(servers),
        })
    }

    pub fn from_configs(configs: &[ServerConfig]) -> Result<Self> {
        Self::new(configs.iter().map(Server::from).collect())
    }

    /// Consistent, immutable view of every server at one instant.
    pub fn snapshot(&self) -> Arc<Vec<Server>> {
        self.servers.load_full()
    }

    pub fn get(&self, id: &str) -> Option<Server> {
        self.servers.load().iter().find(|s| s.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.servers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.load().is_empty()
    }

    pub fn healthy_count(&self) -> usize {
        self.servers.load().iter().filter(|s| s.healthy).count()
    }

    /// Adds `delta` load units to a server. The result saturates at zero.
    pub fn update_load(&self, id: &str, delta: i64) -> Result<()> {
        self.update(id, |server| server.apply_load_delta(delta))
    }

    pub fn update_response_time(&self, id: &str, response_time_ms: u64) -> Result<()> {
        self.update(id, |server| server.response_time_ms = response_time_ms)
    }

    /// Folds a latency sample into the server's moving average.
    /// `smoothing` of 1.0 replaces the old value outright.
    pub fn record_response_time(&self, id: &str, sample_ms: u64, smoothing: f64) -> Result<()> {
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err(LoadBalancerError::InvalidConfiguration(format!(
                "response time smoothing must be in (0, 1], got {}",
                smoothing
            )));
        }

        self.update(id, |server| server.smooth_response_time(sample_ms, smoothing))
    }

    pub fn set_healthy(&self, id: &str, healthy: bool) -> Result<()> {
        let previous = self.get(id).map(|s| s.healthy);
        self.update(id, |server| server.healthy = healthy)?;

        if previous != Some(healthy) {
            if healthy {
                tracing::info!("Server {} marked healthy", id);
            } else {
                tracing::warn!("Server {} marked unhealthy", id);
            }
        }

        Ok(())
    }

    pub fn add(&self, server: Server) -> Result<()> {
        let id = server.id.clone();
        let mut duplicate = false;

        self.servers.rcu(|current| {
            duplicate = current.iter().any(|s| s.id == server.id);
            let mut next = Vec::clone(current);
            if !duplicate {
                next.push(server.clone());
            }
            next
        });

        if duplicate {
            return Err(LoadBalancerError::DuplicateId(id));
        }

        tracing::info!("Added server: {}", id);
        Ok(())
    }

    /// Removes a server and returns its last known state.
    ///
    /// The last remaining server can't be removed.
    pub fn remove(&self, id: &str) -> Result<Server> {
        if self.get(id).is_none() {
            return Err(LoadBalancerError::NotFound(id.to_string()));
        }

        let mut outcome = Err(LoadBalancerError::NotFound(id.to_string()));

        self.servers.rcu(|current| {
            let mut next = Vec::clone(current);
            outcome = match next.iter().position(|s| s.id == id) {
                None => Err(LoadBalancerError::NotFound(id.to_string())),
                Some(_) if next.len() == 1 => Err(LoadBalancerError::InvalidConfiguration(
                    format!("cannot remove {}: pool would become empty", id),
                )),
                Some(index) => Ok(next.remove(index)),
            };
            next
        });

        if outcome.is_ok() {
            tracing::info!("Removed server: {}", id);
        }
        outcome
    }

    fn update<F>(&self, id: &str, mut apply: F) -> Result<()>
    where
        F: FnMut(&mut Server),
    {
        if self.get(id).is_none() {
            return Err(LoadBalancerError::NotFound(id.to_string()));
        }

        let mut found = false;

        // The closure may run more than once when writers race; only the
        // final run is published.
        self.servers.rcu(|current| {
            let mut next = Vec::clone(current);
            found = match next.iter_mut().find(|s| s.id == id) {
                Some(server) => {
                    apply(server);
                    true
                }
                None => false,
            };
            next
        });

        if found {
            Ok(())
        } else {
            Err(LoadBalancerError::NotFound(id.to_string()))
        }
    }
}

impl std::fmt::Debug for ServerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerPool")
            .field("servers", &self.snapshot())
            .finish()
    }
}
