// src/main.rs
use anyhow::{Context, Result};
use load_balancing_engine::{
    config::{self, PolicyKind},
    LoadBalancer, RequestContext, ServerPool,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_REQUESTS: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("load_balancing_engine=info".parse()?),
        )
        .init();

    // Usage: load-balancing-engine [config] [policy] [requests]
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let mut config = config::load_config(&config_path).await?;

    if let Some(policy) = args.next() {
        config.balancer.policy = policy.parse::<PolicyKind>()?;
        config.validate()?;
    }

    let requests = match args.next() {
        Some(n) => n.parse().context("Request count must be a positive integer")?,
        None => DEFAULT_REQUESTS,
    };

    let pool = Arc::new(ServerPool::from_configs(&config.servers)?);
    let balancer = Arc::new(LoadBalancer::from_config(pool.clone(), &config.balancer)?);

    info!(
        "Simulating {} requests with policy {}",
        requests,
        balancer.policy_name()
    );

    let mut tasks = Vec::with_capacity(requests);
    for i in 0..requests {
        let balancer = balancer.clone();
        tasks.push(tokio::spawn(async move { simulate_request(balancer, i).await }));
    }

    for result in futures::future::join_all(tasks).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Request failed: {:#}", e),
            Err(e) => error!("Task join error: {}", e),
        }
    }

    for server in pool.snapshot().iter() {
        info!(
            "Server {}: load {}/{}, response time {}ms, healthy: {}",
            server.id, server.current_load, server.capacity, server.response_time_ms, server.healthy
        );
    }

    info!(
        "Dispatch stats: {}",
        serde_json::to_string(&balancer.stats())?
    );

    Ok(())
}

async fn simulate_request(balancer: Arc<LoadBalancer>, index: usize) -> Result<()> {
    let client_ip = format!("192.168.1.{}", index + 1);
    let context = RequestContext::new(client_ip.as_str());

    let dispatch = balancer.dispatch(&context)?;
    info!(
        "Client {} directed to server {} ({:?})",
        client_ip, dispatch.server_id, dispatch.decision_latency
    );

    let service_ms = rand::thread_rng().gen_range(10..=60);
    tokio::time::sleep(Duration::from_millis(service_ms)).await;

    balancer
        .report_completion(&dispatch.server_id, Some(service_ms))
        .with_context(|| format!("Failed to report completion for {}", dispatch.server_id))?;

    Ok(())
}
