//! Approximate counting structures built as layered stacks of simpler sketches.
//!
//! Both structures push an inserted key into deeper layers with geometrically
//! decreasing probability, so how deep a key reaches encodes an approximate
//! count:
//!
//! - [`CountingLayerFilter`] stacks plain membership filters into an
//!   approximate multiplicity counter whose memory grows with the logarithm of
//!   the largest count.
//! - [`DecayingLayerSketch`] stacks mergeable cardinality estimators. Layer 0
//!   sees every key and layer `i >= 1` a `2^-(i+1)` share of them.
//!
//! Keys are 64 bit hashes. The `insert` helpers hash arbitrary values with
//! `ahash`, use the `insert_hash` variants to bring your own hash.
//!
//! ```rust
//! use layered_sketch::{CountingLayerFilter, DecayingLayerSketch};
//!
//! let mut cbf: CountingLayerFilter = CountingLayerFilter::new(6, 16, 2, 7).unwrap();
//! cbf.insert(&"foo");
//! assert_eq!(cbf.estimate(&"foo"), 1);
//!
//! let mut sketch: DecayingLayerSketch = DecayingLayerSketch::new(3, &10).unwrap();
//! sketch.insert(&"foo");
//! assert_eq!(sketch.layer_count(), 3);
//! ```

#![deny(clippy::pedantic, missing_docs)]
/// Bloom filter layers
pub mod bloom;
/// Layered counting filter
mod counting;
/// Layered decaying cardinality sketch
mod decaying;
mod error;
/// `HyperTwoBits` estimator layers
pub mod htb;
/// Hashing values into 64 bit keys
pub mod keys;
/// Commonly used types
pub mod prelude;
mod random;
mod stack;

pub use bloom::BloomFilter;
pub use counting::{CountingLayerFilter, MAX_LAYERS};
pub use decaying::DecayingLayerSketch;
pub use error::{Error, Result};
pub use htb::HyperTwoBits;
pub use random::{BitBudgetCache, ThreadSeeded};
pub use stack::{CardinalityEstimator, LayerStack, MembershipFilter};
