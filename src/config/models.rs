// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub balancer: BalancerConfig,
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default = "default_increment_load_on_dispatch")]
    pub increment_load_on_dispatch: bool,
    #[serde(default = "default_response_time_smoothing")]
    pub response_time_smoothing: f64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            increment_load_on_dispatch: default_increment_load_on_dispatch(),
            response_time_smoothing: default_response_time_smoothing(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub id: String,
    pub capacity: u32,
    #[serde(default)]
    pub current_load: u32,
    #[serde(default)]
    pub response_time_ms: u64,
    #[serde(default = "default_healthy")]
    pub healthy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    RoundRobin,
    LeastConnection,
    WeightedResponseTime,
    ResourceBased,
    SourceIpHash,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::RoundRobin,
        PolicyKind::LeastConnection,
        PolicyKind::WeightedResponseTime,
        PolicyKind::ResourceBased,
        PolicyKind::SourceIpHash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::RoundRobin => "round_robin",
            PolicyKind::LeastConnection => "least_connection",
            PolicyKind::WeightedResponseTime => "weighted_response_time",
            PolicyKind::ResourceBased => "resource_based",
            PolicyKind::SourceIpHash => "source_ip_hash",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");

        // Menu numbers 1-5, in `ALL` order.
        if let Ok(number) = normalized.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|index| PolicyKind::ALL.get(index).copied())
                .ok_or_else(|| anyhow::anyhow!("Policy number must be 1-5, got {}", s));
        }

        PolicyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Unknown load balancing policy: {}", s))
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            bail!("At least one server must be configured");
        }

        let mut ids = HashSet::new();
        for server in &self.servers {
            if server.id.is_empty() {
                bail!("Server id must not be empty");
            }
            if !ids.insert(server.id.as_str()) {
                bail!("Duplicate server id: {}", server.id);
            }
            if server.capacity == 0 && self.balancer.policy == PolicyKind::ResourceBased {
                bail!(
                    "Server {} has zero capacity, which resource_based cannot use",
                    server.id
                );
            }
        }

        let smoothing = self.balancer.response_time_smoothing;
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            bail!(
                "response_time_smoothing must be in (0, 1], got {}",
                smoothing
            );
        }

        Ok(())
    }
}

fn default_increment_load_on_dispatch() -> bool {
    true
}

fn default_response_time_smoothing() -> f64 {
    1.0
}

fn default_healthy() -> bool {
    true
}
