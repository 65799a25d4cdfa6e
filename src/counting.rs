
use rand::{rngs::SmallRng, RngCore, SeedableRng};
use tracing::{debug, trace};

use crate::{BitBudgetCache, BloomFilter, Error, LayerStack, MembershipFilter, Result};

/// Most layers a counting filter can hold, a promotion decision never needs
/// more than one random word
pub const MAX_LAYERS: usize = 64;

fn check_layer_count(layer_count: usize) -> Result<()> {
    if layer_count == 0 || layer_count > MAX_LAYERS {
        return Err(Error::invalid_argument(format!(
            "counting filter needs 1..={MAX_LAYERS} layers, got {layer_count}"
        )));
    }
    Ok(())
}

/// Approximate multiplicity counter built from a stack of plain membership
/// filters.
///
/// The first insertion of a key lands in layer 0. Every later insertion finds
/// the first layer `d` that does not hold the key yet and promotes it there
/// with probability `2^-d`, so a key seen `n` times reaches roughly
/// `log2(n) + 1` layers. The estimate doubles with every layer reached.
///
/// ```rust
/// use layered_sketch::CountingLayerFilter;
/// let mut cbf: CountingLayerFilter = CountingLayerFilter::new(8, 16, 2, 42).unwrap();
/// for _ in 0..100 {
///     cbf.insert(&"foo");
/// }
/// assert!(cbf.estimate(&"foo") >= 1);
/// assert_eq!(cbf.estimate(&"bar"), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CountingLayerFilter<F = BloomFilter, R = SmallRng> {
    layers: LayerStack<F>,
    bits: BitBudgetCache<R>,
}

impl<F: MembershipFilter> CountingLayerFilter<F, SmallRng> {
    /// Creates a filter with `layer_count` layers of `2^log2_size` bits and
    /// `hash_count` probes each. `seed` drives both the layer seeds and the
    /// promotion decisions.
    ///
    /// # Errors
    /// If `layer_count` is not in `1..=MAX_LAYERS` or the filter rejects its
    /// parameters.
    pub fn new(layer_count: usize, log2_size: u8, hash_count: u32, seed: u64) -> Result<Self> {
        Self::with_rng(layer_count, log2_size, hash_count, SmallRng::seed_from_u64(seed))
    }
}

impl<F: MembershipFilter, R: RngCore> CountingLayerFilter<F, R> {
    /// Like [`CountingLayerFilter::new`] but draws layer seeds and promotion
    /// bits from `rng`.
    ///
    /// # Errors
    /// If `layer_count` is not in `1..=MAX_LAYERS` or the filter rejects its
    /// parameters.
    pub fn with_rng(layer_count: usize, log2_size: u8, hash_count: u32, mut rng: R) -> Result<Self> {
        check_layer_count(layer_count)?;
        let layers = LayerStack::try_from_fn(layer_count, |_| {
            F::with_params(log2_size, hash_count, rng.next_u64())
        })?;
        Ok(Self {
            layers,
            bits: BitBudgetCache::new(rng),
        })
    }

    /// Inserts a value, hashing it with the default key hasher
    #[inline]
    pub fn insert<V: std::hash::Hash + ?Sized>(&mut self, value: &V) {
        self.insert_hash(crate::keys::hash_key(value));
    }

    /// Records one occurrence of `key`
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert_hash(&mut self, key: u64) {
        if !self.layers[0].may_contain(key) {
            self.layers[0].insert_hash(key);
            return;
        }
        let depth = self.layers.depth_from(1, key);
        if depth == self.layers.len() {
            trace!(key, "key already occupies every layer");
            return;
        }
        // depth < MAX_LAYERS, so it fits a single word
        if self.bits.all_zero(depth as u32) {
            self.layers[depth].insert_hash(key);
        }
    }

    /// `true` if `key` may have been inserted at least once
    #[inline]
    #[must_use]
    pub fn may_contain(&self, key: u64) -> bool {
        self.layers[0].may_contain(key)
    }

    /// [`may_contain`](Self::may_contain) for a value hashed with the default
    /// key hasher
    #[must_use]
    pub fn contains<V: std::hash::Hash + ?Sized>(&self, value: &V) -> bool {
        self.may_contain(crate::keys::hash_key(value))
    }

    /// Estimated number of occurrences of `key`, a power of two, or `0` if the
    /// key was never inserted.
    ///
    /// False positives in the layers can only raise the estimate.
    #[must_use]
    pub fn estimate_count(&self, key: u64) -> u64 {
        match self.layers.depth_of(key) {
            0 => {
                trace!(key, "key not present");
                0
            }
            depth => 1 << (depth - 1),
        }
    }

    /// [`estimate_count`](Self::estimate_count) for a value hashed with the
    /// default key hasher
    #[must_use]
    pub fn estimate<V: std::hash::Hash + ?Sized>(&self, value: &V) -> u64 {
        self.estimate_count(crate::keys::hash_key(value))
    }

    /// Forgets every key, keeping the layer count and filter parameters
    pub fn clear(&mut self) {
        self.layers.clear();
        debug!(layers = self.layers.len(), "cleared counting filter");
    }

    /// Clears every layer, then adds fresh layers until there are
    /// `new_layer_count` of them.
    ///
    /// The stack never shrinks: asking for fewer layers than there are still
    /// clears everything but keeps the current count.
    ///
    /// # Errors
    /// If `new_layer_count` is above `MAX_LAYERS`, nothing is changed.
    pub fn resize(&mut self, new_layer_count: usize) -> Result<()> {
        if new_layer_count > MAX_LAYERS {
            return Err(Error::invalid_argument(format!(
                "counting filter holds at most {MAX_LAYERS} layers, got {new_layer_count}"
            )));
        }
        let (log2_size, hash_count) = (self.log2_size(), self.hash_count());
        self.layers.clear();
        let bits = &mut self.bits;
        self.layers.grow_to(new_layer_count, |_| {
            F::with_params(log2_size, hash_count, bits.next_word())
        })?;
        debug!(layers = self.layers.len(), "resized counting filter");
        Ok(())
    }

    /// Resizes every layer to `2^log2_size` bits, dropping all keys
    ///
    /// # Errors
    /// If the filter rejects `log2_size`. Layer 0 is resized first, so a
    /// rejection leaves every layer unchanged as long as the filter accepts or
    /// rejects sizes independently of its contents.
    pub fn resize_layer_parameters(&mut self, log2_size: u8) -> Result<()> {
        self.layers[0].resize(log2_size)?;
        for layer in self.layers.iter_mut().skip(1) {
            layer.resize(log2_size)?;
        }
        debug!(log2_size, "resized counting filter layers");
        Ok(())
    }

    /// Number of layers
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Base-2 logarithm of the bits per layer
    #[must_use]
    pub fn log2_size(&self) -> u8 {
        self.layers[0].log2_size()
    }

    /// Probes per key in each layer
    #[must_use]
    pub fn hash_count(&self) -> u32 {
        self.layers[0].hash_count()
    }

    /// Bits per layer
    #[must_use]
    pub fn filter_size(&self) -> u64 {
        self.layers[0].size_bits()
    }

    /// The layers, shallowest first
    #[must_use]
    pub fn layers(&self) -> &LayerStack<F> {
        &self.layers
    }
}

impl<F: MembershipFilter, R: RngCore + SeedableRng> CountingLayerFilter<F, R> {
    /// Reseeds the source of promotion decisions, existing layers are kept
    pub fn reseed(&mut self, seed: u64) {
        self.bits.reseed(seed);
    }
}
