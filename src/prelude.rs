pub use crate::keys::{hash_key, hash_key_with, AHasherBuilder, AHasherDefaultBuilder};
#[cfg(feature = "siphash")]
pub use crate::keys::SipHasher13DefaultBuilder;
pub use crate::{
    BloomFilter, CardinalityEstimator, CountingLayerFilter, DecayingLayerSketch, Error,
    HyperTwoBits, LayerStack, MembershipFilter, Result, ThreadSeeded,
};
