#[cfg(test)]
mod tests;

use crate::{CardinalityEstimator, Error, Result};

/// Smallest supported precision, 64 substreams
pub const MIN_PRECISION: u8 = 6;
/// Largest supported precision, 65536 substreams
pub const MAX_PRECISION: u8 = 16;

/// High and low bits of 64 substreams stored next to each other, so reading
/// and updating one substream touches a single cache line
#[cfg_attr(feature = "mem_dbg", derive(mem_dbg::MemDbg, mem_dbg::MemSize))]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct HiLoRegister {
    hi: u64,
    lo: u64,
}

/// `HyperTwoBits` cardinality estimator with a precision chosen at runtime.
///
/// Keeps two bits per substream. The substream is picked by the top
/// `precision` bits of a key, the remaining bits are compared against the
/// threshold `t`. Once nearly all substreams are active every substream is
/// decremented and `t` advances by 4.
///
/// ```rust
/// use layered_sketch::HyperTwoBits;
/// let mut htb = HyperTwoBits::new(8).unwrap();
/// htb.insert(&"foo");
/// htb.insert(&"bar");
/// htb.insert(&"foo");
/// assert!(htb.count() <= 4);
/// ```
#[cfg_attr(feature = "mem_dbg", derive(mem_dbg::MemDbg, mem_dbg::MemSize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HyperTwoBits {
    precision: u8,
    registers: Vec<HiLoRegister>,
    count: u32,
    t: u32,
}

impl HyperTwoBits {
    const ALPHA: f64 = 0.988;
    const REG_SIZE: usize = 64;

    /// Creates an empty estimator with `2^precision` substreams.
    ///
    /// # Errors
    /// If `precision` is not in `MIN_PRECISION..=MAX_PRECISION`.
    pub fn new(precision: u8) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(Error::invalid_argument(format!(
                "precision must be in {MIN_PRECISION}..={MAX_PRECISION}, got {precision}"
            )));
        }
        Ok(Self {
            precision,
            registers: vec![HiLoRegister::default(); (1 << precision) / Self::REG_SIZE],
            count: 0,
            t: 1,
        })
    }

    /// Base-2 logarithm of the number of substreams
    #[must_use]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Number of substreams
    #[must_use]
    pub fn streams(&self) -> u32 {
        1 << self.precision
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn threshold(&self, fill: f64) -> u32 {
        (fill * f64::from(self.streams())) as u32
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn val(&self, stream: u32) -> u8 {
        let i = stream as usize / Self::REG_SIZE;
        let k = stream as usize % Self::REG_SIZE;
        let hi = ((self.registers[i].hi >> k) & 1) as u8;
        let lo = ((self.registers[i].lo >> k) & 1) as u8;
        (hi << 1) | lo
    }

    #[inline]
    fn set(&mut self, stream: u32, v: u8) {
        debug_assert!(v < 4);
        let v = u64::from(v);
        let i = stream as usize / Self::REG_SIZE;
        let k = stream as usize % Self::REG_SIZE;
        let r = &mut self.registers[i];
        r.hi = (r.hi & !(1 << k)) | (((v >> 1) & 1) << k);
        r.lo = (r.lo & !(1 << k)) | ((v & 1) << k);
    }

    /// Decrements every substream and returns how many are still active
    fn decrement(&mut self) -> u32 {
        let mut active = 0;
        for r in &mut self.registers {
            // everything at two or three stays active after the decrement
            active += r.hi.count_ones();
            r.lo = r.hi & !r.lo;
            r.hi &= !r.lo;
        }
        active
    }

    /// Number of substreams with a non zero value
    fn active(&self) -> u32 {
        self.registers.iter().map(|r| (r.hi | r.lo).count_ones()).sum()
    }

    /// Inserts a value, hashing it with the default key hasher
    #[inline]
    pub fn insert<V: std::hash::Hash + ?Sized>(&mut self, value: &V) {
        self.insert_hash(crate::keys::hash_key(value));
    }

    /// Inserts an already hashed key
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert_hash(&mut self, hash: u64) {
        // most significant bits pick the substream, the rest feed the threshold test
        let stream = (hash >> (u64::BITS - u32::from(self.precision))) as u32;
        let ones = (hash & (u64::MAX >> self.precision)).trailing_ones();

        if ones >= self.t && self.val(stream) < 1 {
            self.count += 1;
            self.set(stream, 1);
        }
        // 2^4
        if ones >= self.t + 4 && self.val(stream) < 2 {
            self.set(stream, 2);
        }
        // 2^8
        if ones >= self.t + 8 && self.val(stream) < 3 {
            self.set(stream, 3);
        }

        if self.count >= self.threshold(Self::ALPHA) {
            self.count = self.decrement();
            self.t += 4;
        }
    }

    /// Returns the estimated count. Does not change the estimator.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn count(&self) -> u64 {
        let m = f64::from(self.streams());
        let beta = 1.0 - f64::from(self.count) / m;
        let bias: f64 = (1.0 / beta).ln();
        (2.0_f64.powf(f64::from(self.t)) * m * bias) as u64
    }

    /// Merges another estimator into this one.
    ///
    /// # Panics
    /// If the precisions differ.
    pub fn merge(&mut self, other: &Self) {
        assert_eq!(
            self.precision, other.precision,
            "precisions must be the same, can not merge"
        );
        // `self` must end up as the side with the larger threshold
        if other.t > self.t {
            let smaller = std::mem::replace(self, other.clone());
            self.merge_smaller(&smaller);
        } else {
            self.merge_smaller(other);
        }
    }

    fn merge_smaller(&mut self, other: &Self) {
        // "nearly full" is taken as 99% of substreams active
        let threshold = self.threshold(0.99);
        // too far apart, the larger side already covers the smaller one
        if self.t - other.t > 8 {
            return;
        }
        let same = self.t == other.t;
        if self.count >= threshold {
            self.count = self.decrement();
            self.t += 4;
        }

        if same {
            for (a, b) in self.registers.iter_mut().zip(&other.registers) {
                a.hi |= b.hi;
                a.lo |= b.lo;
            }
        } else {
            // the other side's high bits line up with our low bits
            for (a, b) in self.registers.iter_mut().zip(&other.registers) {
                a.lo |= b.hi;
            }
        }
        self.count = self.active();
        // the union can fill every substream, advance like insert does
        while self.count >= self.threshold(Self::ALPHA) {
            self.count = self.decrement();
            self.t += 4;
        }
    }

    /// Resets the estimator to its empty state
    pub fn clear(&mut self) {
        self.registers.fill(HiLoRegister::default());
        self.count = 0;
        self.t = 1;
    }
}

impl CardinalityEstimator for HyperTwoBits {
    type Config = u8;

    fn with_config(precision: &u8) -> Result<Self> {
        Self::new(*precision)
    }

    #[inline]
    fn insert_hash(&mut self, key: u64) {
        HyperTwoBits::insert_hash(self, key);
    }

    fn merge(&mut self, other: &Self) {
        HyperTwoBits::merge(self, other);
    }

    fn count(&self) -> u64 {
        HyperTwoBits::count(self)
    }

    fn is_compatible(&self, other: &Self) -> bool {
        self.precision == other.precision
    }
}
