//! Finger table: `fingers[i]` is the successor of `(self_bucket + 2^i) mod
//! 2^m`, refreshed one entry per maintenance round by `fix_fingers`.
//! Stored as a fixed-length `Vec` of optional handles rather than mutated
//! entry-by-entry under one lock each — the whole table is read
//! atomically by lookup.

use std::sync::Mutex;

use crate::identifier::{ring_add, Bucket};
use crate::peer::PeerHandle;

pub struct FingerTable {
    m: u32,
    self_bucket: Bucket,
    entries: Mutex<Vec<Option<PeerHandle>>>,
    next: Mutex<usize>,
}

impl FingerTable {
    pub fn new(self_bucket: Bucket, m: u32) -> Self {
        FingerTable {
            m,
            self_bucket,
            entries: Mutex::new(vec![None; m as usize]),
            next: Mutex::new(0),
        }
    }

    /// Target bucket for finger `i`: `(self_bucket + 2^i) mod 2^m`.
    pub fn target(&self, i: usize) -> Bucket {
        ring_add(self.self_bucket, 1u64 << i, self.m)
    }

    pub fn get(&self, i: usize) -> Option<PeerHandle> {
        self.entries.lock().unwrap()[i].clone()
    }

    pub fn set(&self, i: usize, peer: PeerHandle) {
        self.entries.lock().unwrap()[i] = Some(peer);
    }

    /// A snapshot of every populated finger, for `find_successor`'s
    /// candidate set. Order is not meaningful here; callers sort by bucket.
    pub fn populated(&self) -> Vec<PeerHandle> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.clone())
            .collect()
    }

    /// The cursor `fix_fingers` should refresh next, and advances it.
    pub fn advance_cursor(&self) -> usize {
        let mut next = self.next.lock().unwrap();
        let i = *next;
        *next = (i + 1) % self.m as usize;
        i
    }

    pub fn len(&self) -> usize {
        self.m as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_wraps_around_ring() {
        let table = FingerTable::new(15, 4);
        assert_eq!(table.target(0), 0);
        assert_eq!(table.target(1), 1);
        assert_eq!(table.target(3), 7);
    }

    #[test]
    fn cursor_rotates_through_every_index() {
        let table = FingerTable::new(0, 4);
        let seen: Vec<usize> = (0..8).map(|_| table.advance_cursor()).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }
}
