// src/pool/server.rs
use crate::config::ServerConfig;
use serde::Serialize;

/// A backend descriptor together with its runtime state.
///
/// Snapshots from [`ServerPool::snapshot`](super::ServerPool::snapshot) are
/// immutable; a cloned `Server` is detached from the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    pub id: String,
    pub capacity: u32,
    pub current_load: u32,
    pub response_time_ms: u64,
    pub healthy: bool,
}

impl Server {
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            current_load: 0,
            response_time_ms: 0,
            healthy: true,
        }
    }

    pub fn with_load(mut self, current_load: u32) -> Self {
        self.current_load = current_load;
        self
    }

    pub fn with_response_time(mut self, response_time_ms: u64) -> Self {
        self.response_time_ms = response_time_ms;
        self
    }

    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// `true` when the server would hold more load units than its capacity
    /// after taking `additional` more.
    pub fn exceeds_capacity_with(&self, additional: u32) -> bool {
        self.current_load.saturating_add(additional) > self.capacity
    }

    pub(crate) fn apply_load_delta(&mut self, delta: i64) {
        let next = i64::from(self.current_load).saturating_add(delta);
        self.current_load = next.clamp(0, i64::from(u32::MAX)) as u32;
    }

    pub(crate) fn smooth_response_time(&mut self, sample_ms: u64, smoothing: f64) {
        if smoothing >= 1.0 {
            self.response_time_ms = sample_ms;
            return;
        }

        let old = self.response_time_ms as f64;
        let next = old + smoothing * (sample_ms as f64 - old);
        self.response_time_ms = next.round().max(0.0) as u64;
    }
}

impl From<&ServerConfig> for Server {
    fn from(config: &ServerConfig) -> Self {
        Server::new(config.id.clone(), config.capacity)
            .with_load(config.current_load)
            .with_response_time(config.response_time_ms)
            .with_health(config.healthy)
    }
}
