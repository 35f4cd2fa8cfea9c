// tests/load_balancer_tests.rs
use load_balancing_engine::load_balancer::{BalancerOptions, RoundRobin};
use load_balancing_engine::{
    create_policy, LoadBalancer, LoadBalancerError, PolicyKind, RequestContext, Server,
    ServerPool,
};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;

fn demo_servers() -> Vec<Server> {
    vec![
        Server::new("A", 100).with_load(20).with_response_time(50),
        Server::new("B", 150).with_load(50).with_response_time(30),
        Server::new("C", 200).with_load(70).with_response_time(20),
    ]
}

fn select_id(kind: PolicyKind, snapshot: &[Server], key: &str) -> String {
    create_policy(kind)
        .select(snapshot, &RequestContext::new(key))
        .unwrap()
        .id
        .clone()
}

#[test]
fn test_demo_pool_choices() {
    let snapshot = demo_servers();

    assert_eq!(select_id(PolicyKind::LeastConnection, &snapshot, "k"), "A");
    assert_eq!(select_id(PolicyKind::ResourceBased, &snapshot, "k"), "A");
    assert_eq!(select_id(PolicyKind::WeightedResponseTime, &snapshot, "k"), "C");
}

#[test]
fn test_every_policy_returns_member_of_snapshot() {
    let snapshot = demo_servers();

    for kind in PolicyKind::ALL {
        let policy = create_policy(kind);
        for i in 0..25 {
            let ctx = RequestContext::new(format!("10.1.0.{}", i));
            let server = policy.select(&snapshot, &ctx).unwrap();
            assert!(snapshot.iter().any(|s| s.id == server.id), "{}", kind);
        }
    }
}

#[test]
fn test_all_unhealthy_fails_for_every_policy() {
    let snapshot: Vec<Server> = demo_servers()
        .into_iter()
        .map(|s| s.with_health(false))
        .collect();

    for kind in PolicyKind::ALL {
        let err = create_policy(kind)
            .select(&snapshot, &RequestContext::new("k"))
            .unwrap_err();
        assert_eq!(err, LoadBalancerError::NoEligibleServer { total: 3 }, "{}", kind);
    }
}

#[test]
fn test_deterministic_policies_ignore_snapshot_order() {
    let mut rng = rand::thread_rng();
    let mut snapshot = vec![
        Server::new("d", 100).with_load(10).with_response_time(15),
        Server::new("b", 50).with_load(5).with_response_time(15),
        Server::new("a", 100).with_load(10).with_response_time(40),
        Server::new("c", 200).with_load(20).with_response_time(15),
        Server::new("e", 10).with_load(0).with_response_time(5).with_health(false),
    ];

    let kinds = [
        PolicyKind::LeastConnection,
        PolicyKind::WeightedResponseTime,
        PolicyKind::ResourceBased,
        PolicyKind::SourceIpHash,
    ];
    let expected: Vec<String> = kinds
        .iter()
        .map(|kind| select_id(*kind, &snapshot, "172.16.0.9"))
        .collect();

    assert_eq!(expected[0], "b");
    assert_eq!(expected[1], "b");
    assert_eq!(expected[2], "a");

    for _ in 0..20 {
        snapshot.shuffle(&mut rng);
        for (kind, want) in kinds.iter().zip(&expected) {
            assert_eq!(&select_id(*kind, &snapshot, "172.16.0.9"), want, "{}", kind);
        }
    }
}

#[test]
fn test_source_ip_hash_is_sticky_until_pool_changes() {
    let pool = ServerPool::new(
        (0..4)
            .map(|i| Server::new(format!("srv-{}", i), 100))
            .collect(),
    )
    .unwrap();
    let keys: Vec<String> = (0..64).map(|i| format!("192.168.{}.{}", i / 8, i)).collect();

    let before: Vec<String> = keys
        .iter()
        .map(|k| select_id(PolicyKind::SourceIpHash, &pool.snapshot(), k))
        .collect();
    let again: Vec<String> = keys
        .iter()
        .map(|k| select_id(PolicyKind::SourceIpHash, &pool.snapshot(), k))
        .collect();
    assert_eq!(before, again);

    pool.remove("srv-3").unwrap();
    let after: Vec<String> = keys
        .iter()
        .map(|k| select_id(PolicyKind::SourceIpHash, &pool.snapshot(), k))
        .collect();

    assert!(after.iter().all(|id| id != "srv-3"));
    assert!(before.iter().zip(&after).any(|(b, a)| b != a));
}

#[test]
fn test_round_robin_even_split_over_stable_pool() {
    let pool = Arc::new(ServerPool::new(demo_servers()).unwrap());
    let lb = LoadBalancer::new(
        pool,
        Box::new(RoundRobin::new()),
        BalancerOptions::default(),
    )
    .unwrap();

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut previous = String::new();
    for i in 0..100 {
        let id = lb
            .dispatch(&RequestContext::new(format!("c{}", i)))
            .unwrap()
            .server_id;
        assert_ne!(id, previous);
        *counts.entry(id.clone()).or_default() += 1;
        previous = id;
    }

    assert_eq!(counts.len(), 3);
    for count in counts.values() {
        assert!((33..=34).contains(count), "unbalanced: {:?}", counts);
    }
}

#[test]
fn test_round_robin_cursor_wraps_onto_shrunken_pool() {
    let pool = Arc::new(
        ServerPool::new((0..4).map(|i| Server::new(format!("s{}", i), 10)).collect()).unwrap(),
    );
    let lb = LoadBalancer::new(
        pool.clone(),
        Box::new(RoundRobin::new()),
        BalancerOptions::default(),
    )
    .unwrap();

    let mut picks: Vec<String> = (0..3)
        .map(|_| lb.dispatch(&RequestContext::new("k")).unwrap().server_id)
        .collect();
    assert_eq!(picks, vec!["s0", "s1", "s2"]);

    pool.remove("s3").unwrap();
    let remaining = ["s0", "s1", "s2"];

    for cursor in 3..9 {
        let id = lb.dispatch(&RequestContext::new("k")).unwrap().server_id;
        assert!(remaining.contains(&id.as_str()), "picked removed server {}", id);
        assert_eq!(id, remaining[cursor % remaining.len()]);
        picks.push(id);
    }

    assert!(picks.windows(2).all(|pair| pair[0] != pair[1]), "{:?}", picks);
}

#[test]
fn test_round_robin_cursor_wraps_when_server_turns_unhealthy() {
    let pool = Arc::new(
        ServerPool::new((0..4).map(|i| Server::new(format!("s{}", i), 10)).collect()).unwrap(),
    );
    let lb = LoadBalancer::from_config(pool.clone(), &Default::default()).unwrap();

    for _ in 0..3 {
        lb.dispatch(&RequestContext::new("k")).unwrap();
    }
    pool.set_healthy("s1", false).unwrap();

    // Eligible set is now s0, s2, s3 in snapshot order.
    let eligible = ["s0", "s2", "s3"];
    for cursor in 3..9 {
        let id = lb.dispatch(&RequestContext::new("k")).unwrap().server_id;
        assert_eq!(id, eligible[cursor % eligible.len()]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_round_robin_dispatch() {
    let pool = Arc::new(ServerPool::new(demo_servers()).unwrap());
    let lb = Arc::new(
        LoadBalancer::from_config(pool.clone(), &Default::default()).unwrap(),
    );
    assert_eq!(lb.policy_name(), "round_robin");

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let lb = lb.clone();
        tasks.push(tokio::spawn(async move {
            let mut picks = Vec::new();
            for i in 0..125 {
                let ctx = RequestContext::new(format!("10.0.{}.{}", worker, i));
                picks.push(lb.dispatch(&ctx).unwrap().server_id);
            }
            picks
        }));
    }

    let mut counts: HashMap<String, u32> = HashMap::new();
    for picks in futures::future::join_all(tasks).await {
        for id in picks.unwrap() {
            *counts.entry(id).or_default() += 1;
        }
    }

    // 1000 distinct cursor values spread exactly as 334/333/333.
    let mut totals: Vec<u32> = counts.values().copied().collect();
    totals.sort_unstable();
    assert_eq!(totals, vec![333, 333, 334]);

    let stats = lb.stats();
    assert_eq!(stats.total, 1000);
    assert_eq!(stats.failed, 0);

    // Every dispatch added one load unit and none were lost.
    let snapshot = pool.snapshot();
    let initial = [("A", 20), ("B", 50), ("C", 70)];
    for (id, load) in initial {
        let server = snapshot.iter().find(|s| s.id == id).unwrap();
        assert_eq!(server.current_load, load + counts[id]);
        assert_eq!(stats.per_server[id], u64::from(counts[id]));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispatch_survives_concurrent_health_flaps() {
    let pool = Arc::new(ServerPool::new(demo_servers()).unwrap());
    let lb = Arc::new(
        LoadBalancer::new(
            pool.clone(),
            create_policy(PolicyKind::LeastConnection),
            BalancerOptions {
                increment_load_on_dispatch: false,
                ..Default::default()
            },
        )
        .unwrap(),
    );

    let flapper = {
        let pool = pool.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                pool.set_healthy("A", i % 2 == 0).unwrap();
                tokio::task::yield_now().await;
            }
            pool.set_healthy("A", true).unwrap();
        })
    };

    let mut dispatchers = Vec::new();
    for _ in 0..4 {
        let lb = lb.clone();
        dispatchers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let id = lb.dispatch(&RequestContext::new("k")).unwrap().server_id;
                // A when healthy, otherwise the next least loaded.
                assert!(id == "A" || id == "B", "unexpected {}", id);
                tokio::task::yield_now().await;
            }
        }));
    }

    flapper.await.unwrap();
    for handle in dispatchers {
        handle.await.unwrap();
    }

    assert_eq!(pool.healthy_count(), 3);
    assert_eq!(lb.stats().failed, 0);
}
