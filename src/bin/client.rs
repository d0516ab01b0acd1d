//! `chord-client`: one CLI operation per wire call, talking directly over
//! the gRPC transport to a single target peer.

use std::error::Error;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use chord::address::Address;
use chord::identifier::bucketize;
use chord::transport::grpc::GrpcTransport;
use chord::transport::Transport;

#[derive(Subcommand)]
enum Operation {
    /// Ping the target.
    Node,
    /// Initialize the target as a ring of one.
    Create,
    /// Ask the target to join the ring reachable through `bootstrap`.
    Join { bootstrap: String },
    /// Resolve the owner of `key`.
    FindSuccessor { key: String },
    GetPredecessor,
    GetSuccessorList,
    /// `candidate` absent clears the target's predecessor.
    Notify { candidate: Option<String> },
    Shutdown,
    Get { key: String },
    Put {
        key: String,
        value: String,
        #[arg(long)]
        no_redirect: bool,
    },
}

#[derive(Parser)]
#[command(name = "chord-client", about = "Talks to one Chord DHT peer")]
struct Args {
    host: String,
    port: u16,
    #[command(subcommand)]
    operation: Operation,
    /// Ring width in bits the target node was started with.
    #[arg(long, default_value_t = 32)]
    ring_size: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new().env().with_level(LevelFilter::Warn).init()?;
    let args = Args::parse();
    let target = Address::new(format!("{}:{}", args.host, args.port));
    let transport = GrpcTransport::new();

    match args.operation {
        Operation::Node => {
            let alive = transport.node(&target).await?;
            println!("{target} alive={alive}");
        }
        Operation::Create => {
            transport.create(&target).await?;
            println!("{target} created a new ring");
        }
        Operation::Join { bootstrap } => {
            transport.join(&target, &Address::new(bootstrap)).await?;
            println!("{target} joined");
        }
        Operation::FindSuccessor { key } => {
            let bucket = bucketize(&key, args.ring_size);
            let (owner, hops) = transport.find_successor(&target, bucket, args.ring_size).await?;
            println!("owner={owner} hops={hops}");
        }
        Operation::GetPredecessor => match transport.get_predecessor(&target).await? {
            Some(p) => println!("predecessor={p}"),
            None => println!("predecessor=none"),
        },
        Operation::GetSuccessorList => {
            let list = transport.get_successor_list(&target).await?;
            let rendered: Vec<String> = list.iter().map(|a| a.to_string()).collect();
            println!("successors={rendered:?}");
        }
        Operation::Notify { candidate } => {
            transport.notify(&target, candidate.map(Address::new)).await?;
            println!("notified {target}");
        }
        Operation::Shutdown => {
            transport.shutdown(&target).await?;
            println!("{target} shut down");
        }
        Operation::Get { key } => {
            let (owner, hops, value, found) = transport.get_key(&target, &key).await?;
            println!("owner={owner} hops={hops} found={found} value={value:?}");
        }
        Operation::Put { key, value, no_redirect } => {
            let (owner, hops) = transport.put_key(&target, &key, &value, no_redirect).await?;
            println!("owner={owner} hops={hops}");
        }
    }

    Ok(())
}
