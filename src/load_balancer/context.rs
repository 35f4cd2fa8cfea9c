// src/load_balancer/context.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

/// Immutable per-request input to [`LoadBalancer::dispatch`](super::LoadBalancer::dispatch).
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    client_key: String,
    arrived_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(client_key: impl Into<String>) -> Self {
        Self::with_arrival(client_key, Utc::now())
    }

    pub fn with_arrival(client_key: impl Into<String>, arrived_at: DateTime<Utc>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            client_key: client_key.into(),
            arrived_at,
        }
    }

    /// Keys the request by the peer's IP address; the port is ignored so
    /// every connection from one host hashes the same way.
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string())
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn client_key(&self) -> &str {
        &self.client_key
    }

    pub fn arrived_at(&self) -> DateTime<Utc> {
        self.arrived_at
    }
}

/// Outcome of a successful dispatch. Not retained by the balancer.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub request_id: Uuid,
    pub server_id: String,
    pub policy: &'static str,
    pub decision_latency: Duration,
}
