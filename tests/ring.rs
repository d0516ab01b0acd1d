//! End-to-end ring behavior, exercised entirely through `LocalPeer` +
//! `LocalTransport` — no sockets, no tonic server, just the routing and
//! maintenance code under test.

use std::sync::Arc;

use chord::address::Address;
use chord::config::RingConfig;
use chord::error::ChordError;
use chord::identifier::bucketize;
use chord::peer::{LocalPeer, Peer};
use chord::storage::MemoryStorage;
use chord::transport::local::LocalTransport;

fn new_peer(transport: &Arc<LocalTransport>, address: &str, config: RingConfig) -> Arc<LocalPeer> {
    let storage: Arc<dyn chord::storage::Storage> = Arc::new(MemoryStorage::new());
    let peer = LocalPeer::new(Address::new(address), config, storage, transport.clone());
    transport.register(peer.clone());
    peer
}

async fn run_round(peer: &LocalPeer) {
    peer.fix_fingers().await.unwrap();
    peer.stabilize().await.unwrap();
    peer.check_predecessor().await.unwrap();
}

/// Builds a ring of `n` nodes named `n0`..`n{n-1}`, `n0` creating and
/// everyone else joining through it, then runs `rounds` maintenance
/// rounds on every node in turn.
async fn build_ring(transport: &Arc<LocalTransport>, n: usize, config: RingConfig, rounds: usize) -> Vec<Arc<LocalPeer>> {
    let mut peers = vec![new_peer(transport, "n0:1", config)];
    peers[0].create().await.unwrap();
    for i in 1..n {
        let p = new_peer(transport, &format!("n{i}:1"), config);
        p.join(peers[0].clone()).await.unwrap();
        peers.push(p);
    }
    for _ in 0..rounds {
        for p in &peers {
            run_round(p).await;
        }
    }
    peers
}

#[tokio::test]
async fn s1_single_node_ring() {
    let transport = LocalTransport::new();
    let config = RingConfig::new(4, 3);
    let a = new_peer(&transport, "a:1", config);

    a.create().await.unwrap();

    let successors = a.get_successor_list().await.unwrap();
    assert_eq!(successors.len(), 3);
    assert!(successors.iter().all(|p| p.address() == a.address()));
    assert!(a.get_predecessor().await.unwrap().is_none());

    a.put("x", "1".to_string(), false).await.unwrap();
    let outcome = a.get("x").await.unwrap();
    assert_eq!(outcome.owner.address(), a.address());
    assert_eq!(outcome.hops, 0);
    assert_eq!(outcome.value.as_deref(), Some("1"));
    assert!(outcome.found);
}

#[tokio::test]
async fn s2_two_node_join_converges() {
    let transport = LocalTransport::new();
    let config = RingConfig::new(8, 4);
    let a = new_peer(&transport, "a:1", config);
    let b = new_peer(&transport, "b:1", config);

    a.create().await.unwrap();
    b.join(a.clone()).await.unwrap();

    run_round(&b).await;
    run_round(&a).await;

    let a_succ = a.get_successor_list().await.unwrap();
    let b_succ = b.get_successor_list().await.unwrap();
    assert_eq!(a_succ[0].address(), b.address());
    assert_eq!(b_succ[0].address(), a.address());
    assert_eq!(a.get_predecessor().await.unwrap().unwrap().address(), b.address());
    assert_eq!(b.get_predecessor().await.unwrap().unwrap().address(), a.address());
}

#[tokio::test]
async fn s3_keys_route_to_the_same_owner() {
    let transport = LocalTransport::new();
    let config = RingConfig::new(6, 3);
    let peers = build_ring(&transport, 5, config, 10).await;

    for i in 0..200 {
        let key = format!("key-{i}");
        let value = format!("v{i}");
        let put_outcome = peers[i % peers.len()].put(&key, value.clone(), false).await.unwrap();
        let get_outcome = peers[(i + 1) % peers.len()].get(&key).await.unwrap();
        assert!(get_outcome.found);
        assert_eq!(get_outcome.value.as_deref(), Some(value.as_str()));
        assert_eq!(get_outcome.owner.address(), put_outcome.owner.address());
    }
}

#[tokio::test]
async fn s4_single_node_failure_does_not_lose_other_keys() {
    let transport = LocalTransport::new();
    let config = RingConfig::new(6, 3);
    let mut peers = build_ring(&transport, 5, config, 10).await;

    let mut stored = Vec::new();
    for i in 0..50 {
        let key = format!("key-{i}");
        let value = format!("v{i}");
        let outcome = peers[i % peers.len()].put(&key, value.clone(), false).await.unwrap();
        stored.push((key, value, outcome.owner.address().clone()));
    }

    // Kill the last-joined node and let the ring re-converge.
    let victim = peers.pop().unwrap();
    transport.deregister(victim.address());

    for _ in 0..config.r {
        for p in &peers {
            run_round(p).await;
        }
    }

    for (key, value, owner) in &stored {
        if *owner == *victim.address() {
            continue;
        }
        let outcome = peers[0].get(key).await.unwrap();
        assert!(outcome.found, "key {key} should still be reachable after victim died");
        assert_eq!(outcome.value.as_deref(), Some(value.as_str()));
    }
}

#[tokio::test]
async fn s5_graceful_shutdown_preserves_keys() {
    let transport = LocalTransport::new();
    let config = RingConfig::new(6, 3);
    let peers = build_ring(&transport, 5, config, 10).await;

    let key = "the-key";
    let put_outcome = peers[0].put(key, "value".to_string(), false).await.unwrap();
    let owner_address = put_outcome.owner.address().clone();
    let owner = peers.iter().find(|p| *p.address() == owner_address).unwrap().clone();

    owner.shutdown().await.unwrap();

    let survivor = peers.iter().find(|p| *p.address() != owner_address).unwrap();
    let outcome = survivor.get(key).await.unwrap();
    assert!(outcome.found);
    assert_eq!(outcome.value.as_deref(), Some("value"));
}

/// Reduced-scale churn test (6 nodes rather than a much larger ring) to
/// keep test runtime reasonable: still interleaves joins with lookups and
/// asserts no call ever reaches the "routing-impossible" `State` error,
/// only `NodeFailure` when the originating contact itself died.
#[tokio::test]
async fn s6_lookup_terminates_under_churn() {
    let transport = LocalTransport::new();
    let config = RingConfig::new(7, 3);
    let mut peers = build_ring(&transport, 6, config, 5).await;

    for round in 0..30 {
        for p in &peers {
            run_round(p).await;
        }
        if round % 7 == 0 && peers.len() < 9 {
            let idx = peers.len();
            let p = new_peer(&transport, &format!("n{idx}:1"), config);
            p.join(peers[0].clone()).await.unwrap();
            peers.push(p);
        }
    }

    for i in 0..500 {
        let key = format!("churn-key-{i}");
        let bucket = bucketize(&key, config.m);
        let origin = &peers[i % peers.len()];
        match origin.find_successor(bucket).await {
            Ok(_) => {}
            Err(ChordError::NodeFailure(_)) => {}
            Err(other) => panic!("unexpected routing error: {other}"),
        }
    }
}

#[tokio::test]
async fn join_against_one_node_ring_yields_mutual_successors() {
    let transport = LocalTransport::new();
    let config = RingConfig::new(10, 2);
    let a = new_peer(&transport, "only:1", config);
    a.create().await.unwrap();

    let b = new_peer(&transport, "newcomer:1", config);
    b.join(a.clone()).await.unwrap();

    // Before any stabilize round, b already knows a as its successor.
    let b_succ = b.get_successor_list().await.unwrap();
    assert_eq!(b_succ[0].address(), a.address());

    run_round(&b).await;
    run_round(&a).await;

    let a_succ = a.get_successor_list().await.unwrap();
    assert_eq!(a_succ[0].address(), b.address());
}
