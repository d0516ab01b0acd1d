//! Identifier-space arithmetic: bucketizing strings onto the `m`-bit ring
//! and the clockwise-`between` predicate that the rest of the peer core
//! builds on.

use sha2::{Digest, Sha256};

/// A position on the ring. Bounded to 64 bits; see DESIGN.md for why the
/// source's arbitrary-precision Python integer was narrowed here.
pub type Bucket = u64;

/// Largest ring width this implementation supports.
pub const MAX_RING_BITS: u32 = 64;

fn mask_for(m: u32) -> u64 {
    if m >= MAX_RING_BITS {
        u64::MAX
    } else {
        (1u64 << m) - 1
    }
}

/// `bucketize(s) = big_endian_int(SHA256(s)) mod 2^m`.
///
/// The digest is hashed in full; only the low `m` bits of its big-endian
/// integer interpretation are kept, which for `m <= 64` are exactly the
/// low 8 bytes of the digest.
pub fn bucketize(s: &str, m: u32) -> Bucket {
    let digest = Sha256::digest(s.as_bytes());
    let mut low8 = [0u8; 8];
    low8.copy_from_slice(&digest[24..32]);
    u64::from_be_bytes(low8) & mask_for(m)
}

/// Adds `delta` to `base` modulo `2^m`, wrapping around the ring.
pub fn ring_add(base: Bucket, delta: u64, m: u32) -> Bucket {
    base.wrapping_add(delta) & mask_for(m)
}

/// Returns true iff `target` lies strictly between `lower` and `higher`
/// traversing the ring clockwise (increasing modulo `2^m`).
///
/// Strict on both ends — callers add their own equality checks where an
/// endpoint should count as inside the interval. `lower == higher` is the
/// wrap-around case and is true for every `target != lower`.
pub fn between(target: Bucket, lower: Bucket, higher: Bucket) -> bool {
    if lower < higher {
        lower < target && target < higher
    } else {
        target > lower || target < higher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_basic_interval() {
        assert!(between(5, 1, 10));
        assert!(!between(1, 1, 10));
        assert!(!between(10, 1, 10));
        assert!(!between(20, 1, 10));
    }

    #[test]
    fn between_wraps_around() {
        // lower=14, higher=2, on a mod-16 ring: wraps through 15,0,1
        assert!(between(15, 14, 2));
        assert!(between(0, 14, 2));
        assert!(between(1, 14, 2));
        assert!(!between(2, 14, 2));
        assert!(!between(14, 14, 2));
        assert!(!between(8, 14, 2));
    }

    #[test]
    fn between_equal_endpoints_is_full_ring() {
        for t in 0u64..16 {
            if t == 7 {
                assert!(!between(t, 7, 7));
            } else {
                assert!(between(t, 7, 7));
            }
        }
    }

    #[test]
    fn bucketize_is_deterministic_and_masked() {
        let m = 8;
        let a = bucketize("node-a:1234", m);
        let b = bucketize("node-a:1234", m);
        assert_eq!(a, b);
        assert!(a < (1u64 << m));
    }

    #[test]
    fn bucketize_changes_with_ring_width() {
        let wide = bucketize("node-a:1234", 32);
        let narrow = bucketize("node-a:1234", 4);
        assert_eq!(narrow, wide & 0xF);
    }

    #[test]
    fn ring_add_wraps() {
        assert_eq!(ring_add(15, 2, 4), 1);
        assert_eq!(ring_add(0, 1, 4), 1);
    }
}
