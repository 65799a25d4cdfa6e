use std::cell::RefCell;

use rand::{rngs::SmallRng, RngCore, SeedableRng};

/// Amortises random words across many promotion decisions.
///
/// Holds one 64 bit word drawn from `R` and the number of its low bits that
/// have not been handed out yet. Asking for more bits than remain discards the
/// leftovers and draws a fresh word.
#[derive(Debug, Clone)]
pub struct BitBudgetCache<R = SmallRng> {
    rng: R,
    word: u64,
    remaining: u32,
}

impl<R: RngCore> BitBudgetCache<R> {
    /// Creates a cache and draws its first word from `rng`
    pub fn new(mut rng: R) -> Self {
        let word = rng.next_u64();
        Self {
            rng,
            word,
            remaining: u64::BITS,
        }
    }

    /// Consumes the low `bits` bits of the cached word and returns them.
    ///
    /// `bits` must be in `1..=64`.
    #[inline]
    pub fn take(&mut self, bits: u32) -> u64 {
        debug_assert!(bits > 0 && bits <= u64::BITS);
        if self.remaining < bits {
            self.word = self.rng.next_u64();
            self.remaining = u64::BITS;
        }
        let taken = self.word & (u64::MAX >> (u64::BITS - bits));
        self.word = self.word.checked_shr(bits).unwrap_or(0);
        self.remaining -= bits;
        taken
    }

    /// Consumes `bits` bits and reports whether all of them were zero, which
    /// happens with probability `2^-bits`.
    #[inline]
    pub fn all_zero(&mut self, bits: u32) -> bool {
        self.take(bits) == 0
    }

    /// Number of bits left before the next refill
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Draws a full word from the underlying source without touching the cache
    pub fn next_word(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

impl<R: RngCore + SeedableRng> BitBudgetCache<R> {
    /// Replaces the source with one seeded from `seed` and refills the cache
    pub fn reseed(&mut self, seed: u64) {
        self.rng = R::seed_from_u64(seed);
        self.word = self.rng.next_u64();
        self.remaining = u64::BITS;
    }
}

thread_local! {
    static THREAD_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::seed_from_u64(thread_seed()));
}

fn thread_seed() -> u64 {
    crate::keys::hash_key(&std::thread::current().id())
}

/// Handle onto a generator owned by the calling thread.
///
/// Each thread seeds its generator from its own id the first time it draws, so
/// sketches inserted into from different threads never share a random stream.
#[cfg_attr(feature = "mem_dbg", derive(mem_dbg::MemDbg, mem_dbg::MemSize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ThreadSeeded;

impl ThreadSeeded {
    /// Reseeds the calling thread's generator, other threads are unaffected
    pub fn reseed(seed: u64) {
        THREAD_RNG.with(|rng| *rng.borrow_mut() = SmallRng::seed_from_u64(seed));
    }
}

impl RngCore for ThreadSeeded {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        THREAD_RNG.with(|rng| rng.borrow_mut().next_u32())
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        THREAD_RNG.with(|rng| rng.borrow_mut().next_u64())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        THREAD_RNG.with(|rng| rng.borrow_mut().fill_bytes(dest));
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        THREAD_RNG.with(|rng| rng.borrow_mut().try_fill_bytes(dest))
    }
}
