// src/load_balancer/balancer.rs
use super::algorithm::SelectionPolicy;
use super::context::{DispatchResult, RequestContext};
use super::create_policy;
use crate::config::{BalancerConfig, PolicyKind};
use crate::error::{LoadBalancerError, Result};
use crate::pool::ServerPool;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct BalancerOptions {
    /// Add one load unit to the chosen server on every successful dispatch.
    /// The caller gives it back through [`LoadBalancer::report_completion`].
    pub increment_load_on_dispatch: bool,
    pub response_time_smoothing: f64,
}

impl Default for BalancerOptions {
    fn default() -> Self {
        Self {
            increment_load_on_dispatch: true,
            response_time_smoothing: 1.0,
        }
    }
}

impl From<&BalancerConfig> for BalancerOptions {
    fn from(config: &BalancerConfig) -> Self {
        Self {
            increment_load_on_dispatch: config.increment_load_on_dispatch,
            response_time_smoothing: config.response_time_smoothing,
        }
    }
}

/// Dispatch counters. Per-server totals are kept for servers that have since
/// left the pool.
#[derive(Debug, Default)]
pub(crate) struct DispatchStats {
    total: AtomicU64,
    failed: AtomicU64,
    per_server: DashMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    pub total: u64,
    pub failed: u64,
    pub per_server: BTreeMap<String, u64>,
}

impl DispatchStats {
    fn record_success(&self, server_id: &str) {
        self.total.fetch_add(1, Ordering::Relaxed);
        *self.per_server.entry(server_id.to_string()).or_insert(0) += 1;
    }

    fn record_failure(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            per_server: self
                .per_server
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

/// Picks a backend for each request using the active [`SelectionPolicy`].
///
/// With `increment_load_on_dispatch` enabled, `dispatch` is the only place the
/// balancer itself mutates load: it adds one unit to the chosen server, and
/// the caller is expected to call [`report_completion`](Self::report_completion)
/// once the request finishes. All other telemetry flows in through the pool.
pub struct LoadBalancer {
    pool: Arc<ServerPool>,
    policy: ArcSwap<Box<dyn SelectionPolicy>>,
    options: BalancerOptions,
    stats: DispatchStats,
}

impl LoadBalancer {
    pub fn new(
        pool: Arc<ServerPool>,
        policy: Box<dyn SelectionPolicy>,
        options: BalancerOptions,
    ) -> Result<Self> {
        if pool.is_empty() {
            return Err(LoadBalancerError::InvalidConfiguration(
                "load balancer requires a non-empty server pool".to_string(),
            ));
        }
        if !(options.response_time_smoothing > 0.0 && options.response_time_smoothing <= 1.0) {
            return Err(LoadBalancerError::InvalidConfiguration(format!(
                "response time smoothing must be in (0, 1], got {}",
                options.response_time_smoothing
            )));
        }

        info!(
            "Load balancer using {} over {} servers",
            policy.name(),
            pool.len()
        );

        Ok(Self {
            pool,
            policy: ArcSwap::from_pointee(policy),
            options,
            stats: DispatchStats::default(),
        })
    }

    pub fn from_config(pool: Arc<ServerPool>, config: &BalancerConfig) -> Result<Self> {
        Self::new(pool, create_policy(config.policy), config.into())
    }

    pub fn dispatch(&self, context: &RequestContext) -> Result<DispatchResult> {
        let start = Instant::now();
        let policy = self.policy.load();
        let snapshot = self.pool.snapshot();

        let selected = match policy.select(&snapshot, context) {
            Ok(server) => server,
            Err(e) => {
                self.stats.record_failure();
                warn!(
                    request_id = %context.request_id(),
                    policy = policy.name(),
                    "Dispatch failed: {}",
                    e
                );
                return Err(e);
            }
        };

        if self.options.increment_load_on_dispatch {
            // The server may have been removed since the snapshot was taken.
            if let Err(e) = self.pool.update_load(&selected.id, 1) {
                self.stats.record_failure();
                warn!(
                    request_id = %context.request_id(),
                    "Dispatch to {} could not be recorded: {}",
                    selected.id,
                    e
                );
                return Err(e);
            }
        }

        let added = u32::from(self.options.increment_load_on_dispatch);
        if selected.exceeds_capacity_with(added) {
            warn!(
                "Server {} is over capacity ({}/{})",
                selected.id,
                selected.current_load.saturating_add(added),
                selected.capacity
            );
        }

        self.stats.record_success(&selected.id);

        let result = DispatchResult {
            request_id: context.request_id(),
            server_id: selected.id.clone(),
            policy: policy.name(),
            decision_latency: start.elapsed(),
        };

        debug!(
            request_id = %result.request_id,
            client = context.client_key(),
            server = %result.server_id,
            policy = result.policy,
            "Dispatched request"
        );

        Ok(result)
    }

    /// Hands back the load unit taken by `dispatch` and, when given, folds the
    /// observed latency into the server's response time.
    pub fn report_completion(&self, server_id: &str, latency_ms: Option<u64>) -> Result<()> {
        if self.options.increment_load_on_dispatch {
            self.pool.update_load(server_id, -1)?;
        }

        if let Some(latency_ms) = latency_ms {
            self.pool.record_response_time(
                server_id,
                latency_ms,
                self.options.response_time_smoothing,
            )?;
        }

        Ok(())
    }

    /// Swaps the active policy. Dispatches already in progress finish with
    /// the policy they started with.
    pub fn set_policy(&self, policy: Box<dyn SelectionPolicy>) {
        let previous = self.policy.swap(Arc::new(policy));
        info!(
            "Switched load balancing policy from {} to {}",
            previous.name(),
            self.policy_name()
        );
    }

    pub fn set_policy_kind(&self, kind: PolicyKind) {
        self.set_policy(create_policy(kind));
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.load().name()
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub fn options(&self) -> BalancerOptions {
        self.options
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("policy", &self.policy_name())
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish()
    }
}
