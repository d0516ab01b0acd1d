//! Successor list: the next `r` peers clockwise from self, replaced
//! atomically per stabilize round rather than mutated in place.
//! `successor_list[0]` is always the primary successor that lookup and
//! notify reason about.

use std::sync::Mutex;

use crate::peer::PeerHandle;

pub struct SuccessorList {
    r: usize,
    entries: Mutex<Vec<PeerHandle>>,
}

impl SuccessorList {
    pub fn new(r: usize) -> Self {
        SuccessorList {
            r,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.r
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn primary(&self) -> Option<PeerHandle> {
        self.entries.lock().unwrap().first().cloned()
    }

    /// Full current list, primary first.
    pub fn snapshot(&self) -> Vec<PeerHandle> {
        self.entries.lock().unwrap().clone()
    }

    /// Replaces the list wholesale, truncated to `r` entries.
    pub fn replace(&self, mut entries: Vec<PeerHandle>) {
        entries.truncate(self.r);
        *self.entries.lock().unwrap() = entries;
    }

    /// Builds `[head] ++ tail[..r-1]` and installs it — the shape stabilize
    /// assembles from a peer's reported successor list.
    pub fn replace_with_head(&self, head: PeerHandle, tail: &[PeerHandle]) {
        let mut next = Vec::with_capacity(self.r);
        next.push(head);
        next.extend(tail.iter().take(self.r.saturating_sub(1)).cloned());
        self.replace(next);
    }

    /// Drops the dead primary and shifts `self` in at the tail, per the
    /// failure branch of stabilize.
    pub fn rotate_out_dead_primary(&self, self_handle: PeerHandle) {
        let mut entries = self.entries.lock().unwrap();
        if !entries.is_empty() {
            entries.remove(0);
        }
        entries.push(self_handle);
        entries.truncate(self.r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::identifier::Bucket;
    use crate::peer::{GetOutcome, Peer, PutOutcome};
    use async_trait::async_trait;

    struct StubPeer(Address, Bucket);

    #[async_trait]
    impl Peer for StubPeer {
        fn address(&self) -> &Address {
            &self.0
        }
        fn bucket(&self) -> Bucket {
            self.1
        }
        async fn node(&self) -> crate::error::Result<bool> {
            Ok(true)
        }
        async fn find_successor(&self, _key: Bucket) -> crate::error::Result<(PeerHandle, u32)> {
            unimplemented!()
        }
        async fn get_predecessor(&self) -> crate::error::Result<Option<PeerHandle>> {
            Ok(None)
        }
        async fn get_successor_list(&self) -> crate::error::Result<Vec<PeerHandle>> {
            Ok(vec![])
        }
        async fn notify(&self, _candidate: Option<PeerHandle>) -> crate::error::Result<()> {
            Ok(())
        }
        async fn get(&self, _key: &str) -> crate::error::Result<GetOutcome> {
            unimplemented!()
        }
        async fn put(&self, _key: &str, _value: String, _no_redirect: bool) -> crate::error::Result<PutOutcome> {
            unimplemented!()
        }
        async fn shutdown(&self) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn stub(addr: &str, bucket: Bucket) -> PeerHandle {
        std::sync::Arc::new(StubPeer(Address::new(addr), bucket))
    }

    #[test]
    fn replace_with_head_truncates_to_capacity() {
        let list = SuccessorList::new(3);
        let tail = vec![stub("b", 2), stub("c", 3), stub("d", 4)];
        list.replace_with_head(stub("a", 1), &tail);
        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].address().as_str(), "a");
        assert_eq!(snapshot[1].address().as_str(), "b");
        assert_eq!(snapshot[2].address().as_str(), "c");
    }

    #[test]
    fn rotate_out_dead_primary_shifts_self_to_tail() {
        let list = SuccessorList::new(2);
        list.replace(vec![stub("dead", 1), stub("b", 2)]);
        list.rotate_out_dead_primary(stub("self", 0));
        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].address().as_str(), "b");
        assert_eq!(snapshot[1].address().as_str(), "self");
    }
}
