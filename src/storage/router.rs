//! Key-to-Shard Routing
//!
//! Every key is assigned to exactly one shard by hashing its bytes with
//! 32-bit FNV-1a and reducing the hash modulo the shard count. The hash is
//! non-cryptographic, stable across runs, and cheap enough to compute on
//! every operation.
//!
//! ```text
//! hash = 2166136261
//! for byte in key:
//!     hash = hash XOR byte
//!     hash = hash * 16777619   (wrapping)
//! shard = hash mod shard_count
//! ```
//!
//! The reduction is a true modulo rather than a bitmask, so shard counts
//! that are not powers of two distribute correctly.

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 16_777_619;

/// Computes the 32-bit FNV-1a hash of `bytes`.
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Maps keys onto a fixed number of shards.
///
/// # Example
///
/// ```
/// use shardkv::storage::ShardRouter;
///
/// let router = ShardRouter::new(3);
/// let shard = router.route(b"user:42");
/// assert!(shard < 3);
/// assert_eq!(shard, router.route(b"user:42"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRouter {
    shards: usize,
}

impl ShardRouter {
    /// Creates a router over `shards` shards.
    ///
    /// # Panics
    ///
    /// Panics if `shards` is 0
    pub fn new(shards: usize) -> Self {
        assert!(shards > 0, "Shard count must be positive");
        Self { shards }
    }

    /// Returns the number of shards this router distributes over.
    pub fn shards(&self) -> usize {
        self.shards
    }

    /// Returns the index of the shard that owns `key`.
    #[inline]
    pub fn route(&self, key: &[u8]) -> usize {
        fnv1a_32(key) as usize % self.shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_route_is_deterministic() {
        let router = ShardRouter::new(7);
        for i in 0..1_000 {
            let key = format!("key-{}", i);
            let first = router.route(key.as_bytes());
            for _ in 0..3 {
                assert_eq!(router.route(key.as_bytes()), first);
            }
        }
    }

    #[test]
    fn test_route_matches_hash_modulo() {
        // Non-power-of-two counts must not be reduced with a mask
        let router = ShardRouter::new(6);
        for key in ["k1", "k2", "k3", "session:abc", ""] {
            let expected = fnv1a_32(key.as_bytes()) as usize % 6;
            assert_eq!(router.route(key.as_bytes()), expected);
        }
    }

    #[test]
    fn test_single_shard() {
        let router = ShardRouter::new(1);
        assert_eq!(router.route(b"anything"), 0);
        assert_eq!(router.route(b""), 0);
    }

    #[test]
    fn test_distribution() {
        let shard_count = 8;
        let router = ShardRouter::new(shard_count);
        let mut counts = vec![0usize; shard_count];

        for i in 0..10_000 {
            let key = format!("key_{}", i);
            counts[router.route(key.as_bytes())] += 1;
        }

        // Expected 1250 per shard; allow a generous band
        let expected = 10_000 / shard_count;
        for (shard, count) in counts.iter().enumerate() {
            assert!(
                *count > expected / 2 && *count < expected * 3 / 2,
                "shard {} received {} of 10000 keys",
                shard,
                count
            );
        }
    }

    #[test]
    #[should_panic(expected = "Shard count must be positive")]
    fn test_zero_shards_rejected() {
        let _ = ShardRouter::new(0);
    }
}
