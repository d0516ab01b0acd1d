//! Maintenance scheduler: one background task per node, driving
//! `fix_fingers` → `stabilize` → `check_predecessor` in that fixed order,
//! sleeping `interval` between rounds. Skips a round while the node is
//! shut down or its successor list is still empty. Cancellation is by the
//! node's own shutdown flag plus the task simply being left to run its
//! course — not a synchronous interrupt.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::{ChordError, Result};
use crate::peer::{LocalPeer, Peer};

/// Spawns the maintenance task for `peer`, ticking every `interval`.
/// Returns the task handle so a caller that owns the node's lifecycle
/// (a test harness, the simulator) can `abort()` it; a live server just
/// lets it run for the lifetime of the process.
pub fn spawn(peer: Arc<LocalPeer>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;

            if peer.is_shutdown() {
                continue;
            }
            match peer.get_successor_list().await {
                Ok(list) if !list.is_empty() => {}
                _ => continue,
            }

            if let Err(err) = run_round(&peer).await {
                error!("{} maintenance round aborted: {err}", peer.address());
                break;
            }
        }
    })
}

/// One round, in the fixed order required within a single node.
async fn run_round(peer: &LocalPeer) -> Result<()> {
    swallow_node_failure(peer, "fix_fingers", peer.fix_fingers().await)?;
    swallow_node_failure(peer, "stabilize", peer.stabilize().await)?;
    swallow_node_failure(peer, "check_predecessor", peer.check_predecessor().await)?;
    Ok(())
}

/// Node-failure is advisory: a maintenance step that saw a dead peer just
/// waits for the next round. Any other error is a programmer error and is
/// left to propagate, terminating the scheduler task.
fn swallow_node_failure(peer: &LocalPeer, step: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(ChordError::NodeFailure(addr)) => {
            debug!("{} {step} saw {addr} fail, retrying next round", peer.address());
            Ok(())
        }
        Err(other) => Err(other),
    }
}
