use crate::{Error, MembershipFilter, Result};

/// Smallest supported filter, one 64 bit word
pub const MIN_LOG2_SIZE: u8 = 6;
/// Largest supported filter, 8 GiB of bits
pub const MAX_LOG2_SIZE: u8 = 36;
/// Upper bound on probes per key
pub const MAX_HASH_COUNT: u32 = 32;

/// A plain Bloom filter over pre-hashed 64 bit keys.
///
/// The filter holds `2^log2_size` bits packed into `u64` words. Each key is
/// rehashed with a seeded `ahash` state and the probe positions are derived by
/// double hashing, so two filters with different seeds set unrelated bits for
/// the same key.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    hasher: ahash::RandomState,
    seed: u64,
    log2_size: u8,
    hash_count: u32,
    bits_set: u64,
    bits: Vec<u64>,
}

impl BloomFilter {
    fn check_log2_size(log2_size: u8) -> Result<()> {
        if (MIN_LOG2_SIZE..=MAX_LOG2_SIZE).contains(&log2_size) {
            Ok(())
        } else {
            Err(Error::invalid_argument(format!(
                "filter log2 size must be in {MIN_LOG2_SIZE}..={MAX_LOG2_SIZE}, got {log2_size}"
            )))
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn words(log2_size: u8) -> usize {
        (1_u64 << (log2_size - MIN_LOG2_SIZE)) as usize
    }

    /// Seed the probe positions are derived from
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of bits currently set
    #[must_use]
    pub fn bits_set(&self) -> u64 {
        self.bits_set
    }

    /// `true` if no key has been added since construction or the last clear
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits_set == 0
    }

    /// Probe positions for `key`, the iterator does not borrow the filter
    #[inline]
    fn probes(&self, key: u64) -> impl Iterator<Item = u64> {
        let h = self.hasher.hash_one(key);
        let step = h.rotate_left(32) | 1;
        let mask = (1_u64 << self.log2_size) - 1;
        (0..u64::from(self.hash_count)).map(move |i| h.wrapping_add(i.wrapping_mul(step)) & mask)
    }
}

impl MembershipFilter for BloomFilter {
    fn with_params(log2_size: u8, hash_count: u32, seed: u64) -> Result<Self> {
        Self::check_log2_size(log2_size)?;
        if hash_count == 0 || hash_count > MAX_HASH_COUNT {
            return Err(Error::invalid_argument(format!(
                "filter hash count must be in 1..={MAX_HASH_COUNT}, got {hash_count}"
            )));
        }
        Ok(Self {
            hasher: ahash::RandomState::with_seeds(
                seed,
                seed ^ 0x9e37_79b9_7f4a_7c15,
                seed.rotate_left(17),
                !seed,
            ),
            seed,
            log2_size,
            hash_count,
            bits_set: 0,
            bits: vec![0; Self::words(log2_size)],
        })
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn insert_hash(&mut self, key: u64) {
        for bit in self.probes(key) {
            let word = &mut self.bits[(bit >> 6) as usize];
            let mask = 1_u64 << (bit & 63);
            if *word & mask == 0 {
                *word |= mask;
                self.bits_set += 1;
            }
        }
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn may_contain(&self, key: u64) -> bool {
        self.probes(key)
            .all(|bit| self.bits[(bit >> 6) as usize] & (1_u64 << (bit & 63)) != 0)
    }

    fn clear(&mut self) {
        self.bits.fill(0);
        self.bits_set = 0;
    }

    fn resize(&mut self, log2_size: u8) -> Result<()> {
        Self::check_log2_size(log2_size)?;
        self.bits = vec![0; Self::words(log2_size)];
        self.log2_size = log2_size;
        self.bits_set = 0;
        Ok(())
    }

    fn log2_size(&self) -> u8 {
        self.log2_size
    }

    fn hash_count(&self) -> u32 {
        self.hash_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_negatives() {
        let mut f = BloomFilter::with_params(16, 3, 1).unwrap();
        for key in 0..1_000_u64 {
            f.insert_hash(key.wrapping_mul(0x2545_f491_4f6c_dd1d));
        }
        for key in 0..1_000_u64 {
            assert!(f.may_contain(key.wrapping_mul(0x2545_f491_4f6c_dd1d)));
        }
        assert!(f.bits_set() <= 3_000);
    }

    #[allow(clippy::cast_precision_loss)]
    #[test]
    fn false_positive_rate_is_small_when_sparse() {
        let mut f = BloomFilter::with_params(20, 2, 9).unwrap();
        for key in 0..1_000_u64 {
            f.insert_hash(key);
        }
        let hits = (1_000_000..1_100_000_u64).filter(|k| f.may_contain(*k)).count();
        assert!((hits as f64) / 100_000.0 < 0.001, "false positive rate too high: {hits}");
    }

    #[test]
    fn seeds_change_probe_positions() {
        let mut a = BloomFilter::with_params(10, 1, 1).unwrap();
        let mut b = BloomFilter::with_params(10, 1, 2).unwrap();
        for key in 0..32 {
            a.insert_hash(key);
            b.insert_hash(key);
        }
        assert_ne!(a.bits, b.bits);
    }

    #[test]
    fn clear_and_resize() {
        let mut f = BloomFilter::with_params(10, 2, 0).unwrap();
        f.insert_hash(5);
        assert!(f.may_contain(5));
        f.clear();
        assert!(f.is_empty());
        assert!(!f.may_contain(5));

        f.insert_hash(5);
        f.resize(12).unwrap();
        assert_eq!(f.log2_size(), 12);
        assert_eq!(f.size_bits(), 4096);
        assert_eq!(f.bits.len(), 64);
        assert!(!f.may_contain(5));

        assert!(f.resize(MAX_LOG2_SIZE + 1).is_err());
        assert_eq!(f.log2_size(), 12);
    }

    #[test]
    fn rejects_bad_params() {
        assert!(BloomFilter::with_params(MIN_LOG2_SIZE - 1, 2, 0).is_err());
        assert!(BloomFilter::with_params(10, 0, 0).is_err());
        assert!(BloomFilter::with_params(10, MAX_HASH_COUNT + 1, 0).is_err());
        assert!(matches!(
            BloomFilter::with_params(3, 2, 0),
            Err(Error::InvalidArgument(_))
        ));
    }
}
