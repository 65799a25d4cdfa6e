use crate::Result;

/// A binary membership filter that can serve as one layer of a
/// [`CountingLayerFilter`](crate::CountingLayerFilter).
///
/// Implementations must never report a false negative.
pub trait MembershipFilter: Sized {
    /// Builds an empty filter with `2^log2_size` bits, `hash_count` probes per
    /// key and probe positions derived from `seed`.
    ///
    /// # Errors
    /// If the parameters are outside the range the filter supports.
    fn with_params(log2_size: u8, hash_count: u32, seed: u64) -> Result<Self>;
    /// Adds a key
    fn insert_hash(&mut self, key: u64);
    /// Returns `false` only if `key` was never added
    fn may_contain(&self, key: u64) -> bool;
    /// Removes all keys, keeping the parameters
    fn clear(&mut self);
    /// Changes the filter size to `2^log2_size` bits, dropping all keys.
    ///
    /// Whether a size is accepted must depend on `log2_size` alone, so that
    /// filters built with the same parameters agree on it.
    ///
    /// # Errors
    /// If `log2_size` is outside the supported range, the filter is left untouched.
    fn resize(&mut self, log2_size: u8) -> Result<()>;
    /// Base-2 logarithm of the number of bits
    fn log2_size(&self) -> u8;
    /// Number of probes per key
    fn hash_count(&self) -> u32;
    /// Number of bits
    fn size_bits(&self) -> u64 {
        1 << self.log2_size()
    }
}

/// A mergeable cardinality estimator that can serve as one layer of a
/// [`DecayingLayerSketch`](crate::DecayingLayerSketch).
///
/// `merge` must be associative and commutative, so merging two estimators
/// approximates one that saw both streams.
pub trait CardinalityEstimator: Sized {
    /// Construction arguments, forwarded unchanged to every layer
    type Config: Clone;
    /// Builds an empty estimator.
    ///
    /// # Errors
    /// If the configuration is invalid.
    fn with_config(config: &Self::Config) -> Result<Self>;
    /// Adds a key
    fn insert_hash(&mut self, key: u64);
    /// Folds `other` into `self`
    fn merge(&mut self, other: &Self);
    /// Estimated number of distinct keys
    fn count(&self) -> u64;
    /// Whether `other` was built with a configuration `self` can merge with
    fn is_compatible(&self, _other: &Self) -> bool {
        true
    }
}

/// An ordered stack of homogeneous sub-sketches.
///
/// Layer 0 is the shallowest. The stack owns every layer, and every layer is
/// built with the same structural parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerStack<T> {
    layers: Vec<T>,
}

impl<T> LayerStack<T> {
    /// Builds `len` layers, calling `build` once per layer index
    ///
    /// # Errors
    /// Propagates the first error returned by `build`.
    pub fn try_from_fn(len: usize, mut build: impl FnMut(usize) -> Result<T>) -> Result<Self> {
        let mut layers = Vec::with_capacity(len);
        for i in 0..len {
            layers.push(build(i)?);
        }
        Ok(Self { layers })
    }

    /// Number of layers
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// `true` if the stack holds no layers, which the owning sketches never allow
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The shallowest layer
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.layers.first()
    }

    /// Layer at `depth`
    #[must_use]
    pub fn get(&self, depth: usize) -> Option<&T> {
        self.layers.get(depth)
    }

    /// Mutable layer at `depth`
    pub fn get_mut(&mut self, depth: usize) -> Option<&mut T> {
        self.layers.get_mut(depth)
    }

    /// Layers from shallowest to deepest
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.layers.iter()
    }

    /// Mutable layers from shallowest to deepest
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.layers.iter_mut()
    }

    /// All layers as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.layers
    }

    /// Appends layers built by `build` until the stack holds `len` layers.
    /// Never removes layers.
    ///
    /// # Errors
    /// Propagates the first error returned by `build`, layers built before it
    /// are kept.
    pub fn grow_to(&mut self, len: usize, mut build: impl FnMut(usize) -> Result<T>) -> Result<()> {
        self.layers.reserve(len.saturating_sub(self.layers.len()));
        while self.layers.len() < len {
            let layer = build(self.layers.len())?;
            self.layers.push(layer);
        }
        Ok(())
    }
}

impl<T: MembershipFilter> LayerStack<T> {
    /// Number of consecutive layers, starting at layer 0, that may contain `key`
    #[inline]
    pub fn depth_of(&self, key: u64) -> usize {
        self.depth_from(0, key)
    }

    /// Index of the first layer at or after `start` that does not contain `key`,
    /// or `len()` if all of them do
    #[inline]
    pub fn depth_from(&self, start: usize, key: u64) -> usize {
        self.layers[start..]
            .iter()
            .position(|layer| !layer.may_contain(key))
            .map_or(self.layers.len(), |offset| start + offset)
    }

    /// Clears every layer in place
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }
}

impl<T: CardinalityEstimator> LayerStack<T> {
    /// Merges `other` layer by layer. Callers check that the lengths match.
    pub(crate) fn merge_layers(&mut self, other: &Self) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.layers.iter_mut().zip(other.layers.iter()) {
            a.merge(b);
        }
    }
}

impl<T> std::ops::Index<usize> for LayerStack<T> {
    type Output = T;

    #[inline]
    fn index(&self, depth: usize) -> &T {
        &self.layers[depth]
    }
}

impl<T> std::ops::IndexMut<usize> for LayerStack<T> {
    #[inline]
    fn index_mut(&mut self, depth: usize) -> &mut T {
        &mut self.layers[depth]
    }
}

impl<'a, T> IntoIterator for &'a LayerStack<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BloomFilter;

    fn stack(len: usize) -> LayerStack<BloomFilter> {
        LayerStack::try_from_fn(len, |i| BloomFilter::with_params(12, 2, i as u64)).unwrap()
    }

    #[test]
    fn depth_counts_leading_layers() {
        let mut s = stack(4);
        assert_eq!(s.depth_of(7), 0);
        s[0].insert_hash(7);
        s[1].insert_hash(7);
        // a gap stops the scan even if deeper layers hold the key
        s[3].insert_hash(7);
        assert_eq!(s.depth_of(7), 2);
        assert_eq!(s.depth_from(1, 7), 2);
        s[2].insert_hash(7);
        assert_eq!(s.depth_of(7), 4);
    }

    #[test]
    fn grow_never_shrinks() {
        let mut s = stack(3);
        s.grow_to(2, |i| BloomFilter::with_params(12, 2, i as u64)).unwrap();
        assert_eq!(s.len(), 3);
        s.grow_to(5, |i| BloomFilter::with_params(12, 2, i as u64)).unwrap();
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn build_errors_propagate() {
        let r = LayerStack::try_from_fn(3, |i| BloomFilter::with_params(if i == 2 { 0 } else { 12 }, 2, 0));
        assert!(r.is_err());
    }
}
