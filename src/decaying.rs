
use rand::RngCore;
use tracing::debug;

use crate::{CardinalityEstimator, Error, HyperTwoBits, LayerStack, Result, ThreadSeeded};

/// Stack of cardinality estimators fed with geometrically thinned copies of
/// one stream.
///
/// Layer 0 sees every key. For each insertion one random word is drawn and
/// the key is also added to layers `1..min(trailing_ones, layer_count)`, so
/// layer `i >= 1` sees a `2^-(i+1)` share of the stream and every layer past
/// the first sees half as many keys as the one before it.
/// Comparing layers gives cardinality views at decreasing sampling densities
/// without rescanning the stream.
///
/// ```rust
/// use layered_sketch::DecayingLayerSketch;
/// let mut sketch: DecayingLayerSketch = DecayingLayerSketch::new(4, &10).unwrap();
/// for i in 0..10_000_u64 {
///     sketch.insert(&i);
/// }
/// let estimates = sketch.estimates();
/// assert_eq!(estimates.len(), 4);
/// assert!(estimates[0] >= estimates[3]);
/// ```
#[derive(Debug, Clone)]
pub struct DecayingLayerSketch<E = HyperTwoBits, R = ThreadSeeded> {
    layers: LayerStack<E>,
    rng: R,
}

impl<E, R> DecayingLayerSketch<E, R> {
    /// Number of layers
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Estimator at `depth`
    #[must_use]
    pub fn layer(&self, depth: usize) -> Option<&E> {
        self.layers.get(depth)
    }

    /// The estimators, layer 0 first
    #[must_use]
    pub fn layers(&self) -> &LayerStack<E> {
        &self.layers
    }
}

impl<E: CardinalityEstimator> DecayingLayerSketch<E, ThreadSeeded> {
    /// Creates a sketch with `layer_count` estimators built from `config`.
    /// Promotion decisions come from the inserting thread's own generator.
    ///
    /// # Errors
    /// If `layer_count < 2` or the estimator rejects `config`.
    pub fn new(layer_count: usize, config: &E::Config) -> Result<Self> {
        Self::with_rng(layer_count, config, ThreadSeeded)
    }
}

impl<E: CardinalityEstimator, R: RngCore> DecayingLayerSketch<E, R> {
    /// Like [`DecayingLayerSketch::new`] with an explicit random source
    ///
    /// # Errors
    /// If `layer_count < 2` or the estimator rejects `config`.
    pub fn with_rng(layer_count: usize, config: &E::Config, rng: R) -> Result<Self> {
        if layer_count < 2 {
            return Err(Error::invalid_argument(format!(
                "decaying sketch needs at least 2 layers, got {layer_count}"
            )));
        }
        let layers = LayerStack::try_from_fn(layer_count, |_| E::with_config(config))?;
        Ok(Self { layers, rng })
    }

    /// Inserts a value, hashing it with the default key hasher
    #[inline]
    pub fn insert<V: std::hash::Hash + ?Sized>(&mut self, value: &V) {
        self.insert_hash(crate::keys::hash_key(value));
    }

    /// Adds `key` to layer 0 and to a random, geometrically distributed
    /// number of the following layers
    #[inline]
    pub fn insert_hash(&mut self, key: u64) {
        self.layers[0].insert_hash(key);
        let end = (self.rng.next_u64().trailing_ones() as usize).min(self.layers.len());
        for depth in 1..end {
            self.layers[depth].insert_hash(key);
        }
    }

    /// Merges `other` layer by layer.
    ///
    /// # Errors
    /// If the layer counts differ or the estimators can not be merged. Neither
    /// sketch is changed in that case.
    pub fn merge<R2>(&mut self, other: &DecayingLayerSketch<E, R2>) -> Result<()> {
        if self.layer_count() != other.layer_count() {
            return Err(Error::invalid_argument(format!(
                "can not merge sketches with {} and {} layers",
                self.layer_count(),
                other.layer_count()
            )));
        }
        if !self
            .layers
            .iter()
            .zip(other.layers.iter())
            .all(|(a, b)| a.is_compatible(b))
        {
            return Err(Error::invalid_argument(
                "can not merge sketches built with different estimator configurations",
            ));
        }
        self.layers.merge_layers(&other.layers);
        debug!(layers = self.layer_count(), "merged decaying sketch");
        Ok(())
    }

    /// Returns a merged copy, leaving both inputs untouched
    ///
    /// # Errors
    /// Same as [`merge`](Self::merge).
    pub fn merged<R2>(&self, other: &DecayingLayerSketch<E, R2>) -> Result<Self>
    where
        E: Clone,
        R: Clone,
    {
        let mut out = self.clone();
        out.merge(other)?;
        Ok(out)
    }

    /// Each layer's cardinality estimate, layer 0 first
    #[must_use]
    pub fn estimates(&self) -> Vec<u64> {
        self.layers.iter().map(CardinalityEstimator::count).collect()
    }
}
