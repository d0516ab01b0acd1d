//! `chord-server`: runs a single Chord DHT peer over gRPC. `--peer`
//! absent means `create` a new ring; present means `join` through that
//! address.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{info, LevelFilter};
use tonic::transport::Server;

use chord::address::Address;
use chord::config::{RingConfig, DEFAULT_INTERVAL_MILLIS};
use chord::peer::LocalPeer;
use chord::storage::MemoryStorage;
use chord::transport::grpc::{chord_proto, ChordGrpcService, GrpcTransport};

/// `host port [successor_list_size] ring_size [--peer addr] [--interval-ms n]`.
/// The optional `successor_list_size` positional is exposed as a flag here
/// — clap cannot express an optional positional ahead of a required one —
/// defaulting to 4.
#[derive(Parser)]
#[command(name = "chord-server", about = "Runs a single Chord DHT peer")]
struct Args {
    /// Host this node listens on.
    host: String,
    /// Port this node listens on.
    port: u16,
    /// Ring width in bits: the identifier space is [0, 2^m).
    ring_size: u32,
    /// Successor-list length `r`.
    #[arg(short = 'r', long = "successors", default_value_t = 4)]
    successor_list_size: usize,
    /// Bootstrap peer to join through. Absent means create a new ring.
    #[arg(long)]
    peer: Option<String>,
    /// Maintenance tick interval, in milliseconds.
    #[arg(long = "interval-ms", default_value_t = DEFAULT_INTERVAL_MILLIS)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().with_level(LevelFilter::Info).init()?;
    let args = Args::parse();

    let self_address = Address::new(format!("{}:{}", args.host, args.port));
    let config = RingConfig::new(args.ring_size, args.successor_list_size)
        .with_interval(Duration::from_millis(args.interval_ms));

    let transport = GrpcTransport::new();
    let storage: Arc<dyn chord::storage::Storage> = Arc::new(MemoryStorage::new());
    let peer = LocalPeer::new(self_address.clone(), config, storage, transport);

    match &args.peer {
        Some(bootstrap) => {
            let bootstrap_handle = peer.resolve(&Address::new(bootstrap.clone()));
            peer.join(bootstrap_handle).await?;
            info!("{self_address} joined the ring through {bootstrap}");
        }
        None => {
            peer.create().await?;
            info!("{self_address} created a new ring");
        }
    }

    chord::scheduler::spawn(peer.clone(), config.interval);

    let service = ChordGrpcService::new(peer.clone());
    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(chord_proto::FILE_DESCRIPTOR_SET)
        .build()?;

    let addr = format!("{}:{}", args.host, args.port).parse()?;
    info!("{self_address} serving gRPC on {addr}");
    Server::builder()
        .add_service(chord_proto::chord_server::ChordServer::new(service))
        .add_service(reflection_service)
        .serve(addr)
        .await?;

    Ok(())
}
