//! `chord-sim`: an in-process ring of `LocalPeer`s wired through
//! `LocalTransport` — no sockets. Builds a ring of `num_nodes` nodes,
//! lets it stabilize, then issues random `find_successor` lookups and
//! reports hop-count percentiles. Grounded in the original simulator's
//! `create_node`/`print_stats` (original_source/chord/simulator.py).

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use rand::Rng;
use simple_logger::SimpleLogger;

use chord::address::Address;
use chord::config::RingConfig;
use chord::identifier::bucketize;
use chord::peer::{LocalPeer, Peer};
use chord::storage::MemoryStorage;
use chord::transport::local::LocalTransport;

#[derive(Parser)]
#[command(name = "chord-sim", about = "Runs an in-process simulated Chord ring")]
struct Args {
    num_nodes: usize,
    ring_size: u32,
    /// Successor-list length `r`.
    #[arg(short = 'r', long = "successors", default_value_t = 4)]
    successor_list_size: usize,
    /// Number of random find_successor lookups to time.
    #[arg(long, default_value_t = 1000)]
    lookups: usize,
    /// Maintenance rounds to let the ring settle before measuring.
    #[arg(long, default_value_t = 50)]
    settle_rounds: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new().env().with_level(LevelFilter::Info).init()?;
    let args = Args::parse();

    let transport = LocalTransport::new();
    let config = RingConfig::new(args.ring_size, args.successor_list_size)
        .with_interval(Duration::from_millis(20));

    println!("Initiating node ring...");
    let mut peers: Vec<Arc<LocalPeer>> = Vec::with_capacity(args.num_nodes);
    for i in 0..args.num_nodes {
        let address = Address::new(format!("sim-node-{i}"));
        let storage: Arc<dyn chord::storage::Storage> = Arc::new(MemoryStorage::new());
        let peer = LocalPeer::new(address.clone(), config, storage, transport.clone());
        transport.register(peer.clone());

        if let Some(bootstrap) = peers.first() {
            let bootstrap_handle: Arc<dyn Peer> = bootstrap.clone();
            peer.join(bootstrap_handle).await?;
        } else {
            peer.create().await?;
        }
        chord::scheduler::spawn(peer.clone(), config.interval);
        println!("Added {address}");
        peers.push(peer);
    }
    println!("=> Done, {} nodes", peers.len());

    println!(
        "Waiting {} maintenance rounds for the ring to stabilize...",
        args.settle_rounds
    );
    tokio::time::sleep(config.interval * args.settle_rounds).await;

    println!("Running lookups");
    let mut hops = Vec::with_capacity(args.lookups);
    for i in 0..args.lookups {
        let origin_index = rand::thread_rng().gen_range(0..peers.len());
        let key = format!("sim-key-{i}-{}", rand::random::<u64>());
        let bucket = bucketize(&key, args.ring_size);
        let (_, hop_count) = peers[origin_index].find_successor(bucket).await?;
        hops.push(hop_count);
        if i % 100 == 0 {
            println!("=> Completed {i} lookups so far");
        }
    }
    print_stats(&hops);

    Ok(())
}

fn avg(values: &[u32]) -> f64 {
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

fn percentile(pct: f64, sorted: &[u32]) -> u32 {
    let idx = ((sorted.len() as f64) * pct / 100.0).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

fn print_stats(values: &[u32]) {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    println!("avg   {:.2}", avg(&sorted));
    println!("p50   {}", percentile(50.0, &sorted));
    println!("p90   {}", percentile(90.0, &sorted));
    println!("p99   {}", percentile(99.0, &sorted));
    println!("p99.9 {}", percentile(99.9, &sorted));
    println!("p100  {}", percentile(100.0, &sorted));
}
